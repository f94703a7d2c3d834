//! Text syntax for the filter dialog
//!
//! ```text
//! expr      := term ( OR term )*
//! term      := factor ( AND factor )*
//! factor    := '(' expr ')' | condition
//! condition := column op [value | '(' value (',' value)* ')']
//! ```
//!
//! Columns may be double-quoted, values single-quoted. Values are typed from
//! the column's declared type so they bind cleanly.

use super::{FilterCondition, FilterGroup, FilterValue, Logic, Operator};
use crate::db::types::{ColumnDef, DataType, TypeCategory};
use crate::error::{FilterError, FilterResult};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Comma,
    /// Bare word: column, keyword or unquoted value
    Word(String),
    /// `"..."` identifier
    Ident(String),
    /// `'...'` literal
    Literal(String),
    /// Symbolic operator
    Symbol(&'static str),
}

const SYMBOLS: [&str; 11] = ["<>", "!=", "<=", ">=", "@>", "<@", "&&", "=", "<", ">", "?"];

fn tokenize(input: &str) -> FilterResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '"' | '\'' => {
                let (text, end) = read_quoted(&chars, i, c)?;
                tokens.push(if c == '"' {
                    Token::Ident(text)
                } else {
                    Token::Literal(text)
                });
                i = end;
            }
            _ => {
                let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
                if let Some(sym) = SYMBOLS.iter().find(|s| rest.starts_with(**s)) {
                    tokens.push(Token::Symbol(*sym));
                    i += sym.chars().count();
                    continue;
                }
                let start = i;
                while i < chars.len() && !is_word_break(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
        }
    }
    Ok(tokens)
}

fn is_word_break(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | ',' | '"' | '\'' | '=' | '<' | '>' | '!' | '?')
}

/// Read a quoted run starting at `start`; a doubled quote is an escaped quote.
fn read_quoted(chars: &[char], start: usize, quote: char) -> FilterResult<(String, usize)> {
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                out.push(quote);
                i += 2;
                continue;
            }
            return Ok((out, i + 1));
        }
        out.push(chars[i]);
        i += 1;
    }
    Err(FilterError::Parse(format!("unterminated {} quote", quote)))
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    columns: &'a [ColumnDef],
}

/// Parse filter text against the columns of the target relation.
///
/// An empty input yields an empty group. With no known columns every column
/// is accepted as an untyped (text-like) column.
pub fn parse_filter(input: &str, columns: &[ColumnDef]) -> FilterResult<FilterGroup> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Ok(FilterGroup::default());
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        columns,
    };
    let group = parser.parse_expr()?;
    if let Some(tok) = parser.peek() {
        return Err(FilterError::Parse(format!("unexpected {:?}", tok)));
    }
    Ok(group)
}

/// Either a single condition or a nested group
enum Node {
    Leaf(FilterCondition),
    Group(FilterGroup),
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn expect_keyword(&mut self, keyword: &str) -> FilterResult<()> {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(FilterError::Parse(format!("expected {}", keyword)))
        }
    }

    fn parse_expr(&mut self) -> FilterResult<FilterGroup> {
        let mut nodes = vec![self.parse_term()?];
        while self.peek_keyword("or") {
            self.pos += 1;
            nodes.push(self.parse_term()?);
        }
        if nodes.len() == 1 {
            return Ok(match nodes.remove(0) {
                Node::Leaf(c) => FilterGroup::default().with_condition(c),
                Node::Group(g) => g,
            });
        }
        Ok(collect(Logic::Or, nodes))
    }

    fn parse_term(&mut self) -> FilterResult<Node> {
        let mut nodes = vec![self.parse_factor()?];
        while self.peek_keyword("and") {
            self.pos += 1;
            nodes.push(self.parse_factor()?);
        }
        if nodes.len() == 1 {
            return Ok(nodes.remove(0));
        }
        Ok(Node::Group(collect(Logic::And, nodes)))
    }

    fn parse_factor(&mut self) -> FilterResult<Node> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let group = self.parse_expr()?;
            if self.next() != Some(Token::RParen) {
                return Err(FilterError::Parse("missing )".into()));
            }
            return Ok(Node::Group(group));
        }
        self.parse_condition().map(Node::Leaf)
    }

    fn parse_condition(&mut self) -> FilterResult<FilterCondition> {
        let column = match self.next() {
            Some(Token::Word(w)) | Some(Token::Ident(w)) => w,
            other => {
                return Err(FilterError::Parse(format!(
                    "expected column, found {:?}",
                    other
                )));
            }
        };
        let (column, data_type) = self.resolve_column(column)?;
        let operator = self.parse_operator()?;

        let value = if !operator.requires_value() {
            None
        } else if operator.takes_list()
            || (data_type.category() == TypeCategory::Array
                && self.peek() == Some(&Token::LParen))
        {
            Some(self.parse_list(&data_type)?)
        } else {
            let raw = self.parse_scalar()?;
            Some(typed_value(&raw, &data_type, operator)?)
        };

        Ok(FilterCondition {
            column,
            operator,
            value,
            declared_type: data_type,
        })
    }

    fn parse_operator(&mut self) -> FilterResult<Operator> {
        let tok = self
            .next()
            .ok_or_else(|| FilterError::Parse("expected operator".into()))?;
        let op = match tok {
            Token::Symbol(sym) => match sym {
                "=" => Operator::Eq,
                "<>" | "!=" => Operator::NotEq,
                "<" => Operator::Lt,
                "<=" => Operator::LtEq,
                ">" => Operator::Gt,
                ">=" => Operator::GtEq,
                "@>" => Operator::Contains,
                "<@" => Operator::ContainedBy,
                "?" => Operator::HasKey,
                "&&" => Operator::ArrayOverlap,
                _ => return Err(FilterError::Parse(format!("unknown operator {}", sym))),
            },
            Token::Word(w) => match w.to_ascii_lowercase().as_str() {
                "like" => Operator::Like,
                "ilike" => Operator::ILike,
                "in" => Operator::In,
                "not" => {
                    self.expect_keyword("in")?;
                    Operator::NotIn
                }
                "is" => {
                    let negated = self.peek_keyword("not");
                    if negated {
                        self.pos += 1;
                    }
                    self.expect_keyword("null")?;
                    if negated {
                        Operator::IsNotNull
                    } else {
                        Operator::IsNull
                    }
                }
                _ => return Err(FilterError::Parse(format!("unknown operator {}", w))),
            },
            other => return Err(FilterError::Parse(format!("expected operator, found {:?}", other))),
        };
        Ok(op)
    }

    fn parse_scalar(&mut self) -> FilterResult<String> {
        match self.next() {
            Some(Token::Word(w)) | Some(Token::Literal(w)) => Ok(w),
            other => Err(FilterError::Parse(format!("expected value, found {:?}", other))),
        }
    }

    /// `( v1, v2, ... )`, each element typed like the column (or its element type)
    fn parse_list(&mut self, data_type: &DataType) -> FilterResult<FilterValue> {
        if self.next() != Some(Token::LParen) {
            return Err(FilterError::Parse("expected ( to start a list".into()));
        }
        let element_type = match data_type {
            DataType::Array(inner) => inner.as_ref().clone(),
            other => other.clone(),
        };
        let mut items = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(FilterValue::List(items));
        }
        loop {
            let raw = self.parse_scalar()?;
            items.push(typed_value(&raw, &element_type, Operator::Eq)?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                _ => return Err(FilterError::Parse("expected , or ) in list".into())),
            }
        }
        Ok(FilterValue::List(items))
    }

    /// Match a column by exact name, then case-insensitively
    fn resolve_column(&self, name: String) -> FilterResult<(String, DataType)> {
        if self.columns.is_empty() {
            return Ok((name, DataType::Unknown("unknown".to_string())));
        }
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(&name)))
            .map(|c| (c.name.clone(), c.data_type.clone()))
            .ok_or(FilterError::UnknownColumn(name))
    }
}

fn collect(logic: Logic, nodes: Vec<Node>) -> FilterGroup {
    let mut group = FilterGroup::new(logic);
    for node in nodes {
        match node {
            Node::Leaf(c) => group.conditions.push(c),
            Node::Group(g) => group.subgroups.push(g),
        }
    }
    group
}

/// Convert raw text into a value of the column's type
fn typed_value(raw: &str, data_type: &DataType, operator: Operator) -> FilterResult<FilterValue> {
    let bad = |what: &str| FilterError::Parse(format!("'{}' is not a valid {}", raw, what));
    match data_type.category() {
        TypeCategory::Numeric => {
            if let Ok(v) = raw.parse::<i64>() {
                Ok(FilterValue::Int(v))
            } else {
                raw.parse::<f64>()
                    .map(FilterValue::Float)
                    .map_err(|_| bad("number"))
            }
        }
        TypeCategory::Jsonb if operator == Operator::HasKey => Ok(FilterValue::Text(raw.into())),
        TypeCategory::Jsonb => serde_json::from_str(raw)
            .map(FilterValue::Json)
            .map_err(|_| bad("JSON value")),
        TypeCategory::Array => {
            // '{a,b}' literal form
            let inner = raw
                .strip_prefix('{')
                .and_then(|r| r.strip_suffix('}'))
                .ok_or_else(|| bad("array literal"))?;
            let element_type = match data_type {
                DataType::Array(inner) => inner.as_ref().clone(),
                other => other.clone(),
            };
            inner
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| typed_value(s, &element_type, Operator::Eq))
                .collect::<FilterResult<Vec<_>>>()
                .map(FilterValue::List)
        }
        TypeCategory::Other if *data_type == DataType::Boolean => {
            match raw.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "1" => Ok(FilterValue::Bool(true)),
                "false" | "f" | "no" | "0" => Ok(FilterValue::Bool(false)),
                _ => Err(bad("boolean")),
            }
        }
        _ => Ok(FilterValue::Text(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", DataType::Integer),
            ColumnDef::new("name", DataType::Text),
            ColumnDef::new("active", DataType::Boolean),
            ColumnDef::new("doc", DataType::Jsonb),
            ColumnDef::new("tags", DataType::Array(Box::new(DataType::Text))),
            ColumnDef::new("Score", DataType::Double),
        ]
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_filter("   ", &columns()).unwrap().is_empty());
    }

    #[test]
    fn test_single_condition_is_typed() {
        let group = parse_filter("id > 30", &columns()).unwrap();
        assert_eq!(group.conditions.len(), 1);
        let c = &group.conditions[0];
        assert_eq!(c.operator, Operator::Gt);
        assert_eq!(c.value, Some(FilterValue::Int(30)));
        assert_eq!(c.declared_type, DataType::Integer);
    }

    #[test]
    fn test_and_or_precedence() {
        let group = parse_filter("id = 1 or name like 'a%' and active = true", &columns()).unwrap();
        assert_eq!(group.logic, Logic::Or);
        assert_eq!(group.conditions.len(), 1);
        assert_eq!(group.subgroups.len(), 1);
        assert_eq!(group.subgroups[0].logic, Logic::And);
        assert_eq!(
            group.subgroups[0].conditions[1].value,
            Some(FilterValue::Bool(true))
        );
    }

    #[test]
    fn test_parentheses_nest() {
        let group = parse_filter("(id = 1 or id = 2) and name is not null", &columns()).unwrap();
        assert_eq!(group.logic, Logic::And);
        assert_eq!(group.conditions[0].operator, Operator::IsNotNull);
        assert_eq!(group.subgroups[0].logic, Logic::Or);
        assert_eq!(group.subgroups[0].conditions.len(), 2);
    }

    #[test]
    fn test_in_list() {
        let group = parse_filter("id not in (1, 2, 3)", &columns()).unwrap();
        assert_eq!(group.conditions[0].operator, Operator::NotIn);
        assert_eq!(
            group.conditions[0].value,
            Some(FilterValue::List(vec![1.into(), 2.into(), 3.into()]))
        );
    }

    #[test]
    fn test_jsonb_values() {
        let group = parse_filter(r#"doc @> '{"a": 1}' and doc ? 'k'"#, &columns()).unwrap();
        assert_eq!(
            group.conditions[0].value,
            Some(FilterValue::Json(serde_json::json!({"a": 1})))
        );
        assert_eq!(group.conditions[1].value, Some(FilterValue::Text("k".into())));
    }

    #[test]
    fn test_array_overlap_forms() {
        let a = parse_filter("tags && (x, y)", &columns()).unwrap();
        let b = parse_filter("tags && '{x,y}'", &columns()).unwrap();
        assert_eq!(a.conditions[0].value, b.conditions[0].value);
    }

    #[test]
    fn test_quoted_text_and_identifier() {
        let group = parse_filter(r#""name" = 'O''Brien'"#, &columns()).unwrap();
        assert_eq!(
            group.conditions[0].value,
            Some(FilterValue::Text("O'Brien".into()))
        );
    }

    #[test]
    fn test_case_insensitive_column_fallback() {
        let group = parse_filter("score >= 1.5", &columns()).unwrap();
        assert_eq!(group.conditions[0].column, "Score");
        assert_eq!(group.conditions[0].value, Some(FilterValue::Float(1.5)));
    }

    #[test]
    fn test_unknown_column() {
        assert_eq!(
            parse_filter("nope = 1", &columns()),
            Err(FilterError::UnknownColumn("nope".into()))
        );
    }

    #[test]
    fn test_bad_number() {
        assert!(matches!(
            parse_filter("id = abc", &columns()),
            Err(FilterError::Parse(_))
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(parse_filter("id = 1 )", &columns()).is_err());
        assert!(parse_filter("id = ", &columns()).is_err());
    }

    #[test]
    fn test_no_columns_accepts_anything() {
        let group = parse_filter("whatever = 5", &[]).unwrap();
        assert_eq!(group.conditions[0].value, Some(FilterValue::Text("5".into())));
    }
}
