//! Declarative table filters
//!
//! A [`Filter`] names a target relation and holds a recursive AND/OR tree of
//! conditions. [`compile`] turns the tree into a parameterized WHERE clause;
//! [`Filter::validate`] rejects structurally or type-wise invalid filters
//! before any query is issued.

pub mod compile;
pub mod parse;

pub use compile::{CompiledFilter, compile, quote_ident};
pub use parse::parse_filter;

use crate::db::types::{DataType, TypeCategory};
use crate::error::{FilterError, FilterResult};
use std::fmt;

/// How a group joins its members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub fn as_sql(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Logic::And => Logic::Or,
            Logic::Or => Logic::And,
        }
    }
}

/// Comparison operators a condition can use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    ILike,
    IsNull,
    IsNotNull,
    /// `@>`
    Contains,
    /// `<@`
    ContainedBy,
    /// `?`
    HasKey,
    /// `&&`
    ArrayOverlap,
    /// `= ANY($n)` with an array parameter
    In,
    /// `<> ALL($n)` with an array parameter
    NotIn,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Lt,
        Operator::LtEq,
        Operator::Gt,
        Operator::GtEq,
        Operator::Like,
        Operator::ILike,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::Contains,
        Operator::ContainedBy,
        Operator::HasKey,
        Operator::ArrayOverlap,
        Operator::In,
        Operator::NotIn,
    ];

    /// Label used in messages and the filter dialog
    pub fn label(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Contains => "@>",
            Operator::ContainedBy => "<@",
            Operator::HasKey => "?",
            Operator::ArrayOverlap => "&&",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }

    /// Everything except the two null checks consumes a parameter
    pub fn requires_value(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// IN / NOT IN take a list bound as one array parameter
    pub fn takes_list(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Whether this operator may be applied to a column of the given category
    pub fn allowed_for(self, category: TypeCategory) -> bool {
        use Operator::*;
        match self {
            Eq | NotEq | IsNull | IsNotNull | In | NotIn => true,
            Lt | LtEq | Gt | GtEq => {
                matches!(category, TypeCategory::Numeric | TypeCategory::Temporal)
            }
            Like | ILike => category == TypeCategory::Text,
            HasKey => category == TypeCategory::Jsonb,
            Contains | ContainedBy => {
                matches!(category, TypeCategory::Jsonb | TypeCategory::Array)
            }
            ArrayOverlap => category == TypeCategory::Array,
        }
    }

    /// Operators offered for a column type
    pub fn available_for(data_type: &DataType) -> Vec<Operator> {
        let category = data_type.category();
        Operator::ALL
            .into_iter()
            .filter(|op| op.allowed_for(category))
            .collect()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A value bound out-of-band as a positional parameter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Placeholder for a missing value; never survives validation
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Json(serde_json::Value),
    List(Vec<FilterValue>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Null => f.write_str("NULL"),
            FilterValue::Int(v) => write!(f, "{}", v),
            FilterValue::Float(v) => write!(f, "{}", v),
            FilterValue::Text(v) => f.write_str(v),
            FilterValue::Bool(v) => write!(f, "{}", v),
            FilterValue::Json(v) => write!(f, "{}", v),
            FilterValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(v.into())
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<serde_json::Value> for FilterValue {
    fn from(v: serde_json::Value) -> Self {
        FilterValue::Json(v)
    }
}

/// One leaf comparison
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub column: String,
    pub operator: Operator,
    pub value: Option<FilterValue>,
    /// Column type, used to decide operator legality
    pub declared_type: DataType,
}

impl FilterCondition {
    /// Condition with an undeclared (text-like) column type
    pub fn new(column: impl Into<String>, operator: Operator, value: Option<FilterValue>) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
            declared_type: DataType::Unknown("unknown".to_string()),
        }
    }

    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.declared_type = data_type;
        self
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) if self.operator.requires_value() => {
                write!(f, "{} {} {}", self.column, self.operator, value)
            }
            _ => write!(f, "{} {}", self.column, self.operator),
        }
    }
}

/// A recursive AND/OR group of conditions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterGroup {
    pub conditions: Vec<FilterCondition>,
    pub subgroups: Vec<FilterGroup>,
    pub logic: Logic,
}

impl FilterGroup {
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            ..Self::default()
        }
    }

    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.subgroups.push(group);
        self
    }

    /// True when the group renders to nothing
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.subgroups.iter().all(FilterGroup::is_empty)
    }

    /// Conditions in placeholder order (own conditions first, then subgroups depth-first)
    pub fn walk_conditions(&self) -> Vec<&FilterCondition> {
        let mut out: Vec<&FilterCondition> = self.conditions.iter().collect();
        for group in &self.subgroups {
            out.extend(group.walk_conditions());
        }
        out
    }
}

impl fmt::Display for FilterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
        parts.extend(
            self.subgroups
                .iter()
                .filter(|g| !g.is_empty())
                .map(|g| format!("({})", g)),
        );
        let sep = format!(" {} ", self.logic.as_sql().to_lowercase());
        f.write_str(&parts.join(&sep))
    }
}

/// A filter applied to one relation
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub schema: String,
    pub table: String,
    pub root: FilterGroup,
}

impl Filter {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, root: FilterGroup) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            root,
        }
    }

    /// Structural and type checks, run before any query is issued.
    pub fn validate(&self) -> FilterResult<()> {
        if self.table.trim().is_empty() {
            return Err(FilterError::MissingTable);
        }
        for (idx, condition) in self.root.walk_conditions().into_iter().enumerate() {
            validate_condition(idx + 1, condition)?;
        }
        Ok(())
    }

    pub fn compile(&self, start_index: usize) -> CompiledFilter {
        compile(&self.root, start_index)
    }
}

fn validate_condition(position: usize, condition: &FilterCondition) -> FilterResult<()> {
    if condition.column.trim().is_empty() {
        return Err(FilterError::EmptyColumn(position));
    }
    let operator = condition.operator;
    if operator.requires_value() {
        match &condition.value {
            None | Some(FilterValue::Null) => {
                return Err(FilterError::MissingValue {
                    column: condition.column.clone(),
                    operator: operator.label().to_string(),
                });
            }
            Some(FilterValue::List(items)) if items.is_empty() => {
                return Err(FilterError::EmptyList {
                    column: condition.column.clone(),
                    operator: operator.label().to_string(),
                });
            }
            Some(_) => {}
        }
    }
    if !operator.allowed_for(condition.declared_type.category()) {
        return Err(FilterError::OperatorNotAllowed {
            column: condition.column.clone(),
            operator: operator.label().to_string(),
            data_type: condition.declared_type.display_name(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(column: &str, op: Operator, value: Option<FilterValue>) -> FilterCondition {
        FilterCondition::new(column, op, value)
    }

    fn filter(root: FilterGroup) -> Filter {
        Filter::new("public", "users", root)
    }

    #[test]
    fn test_empty_column_fails_validation() {
        let f = filter(FilterGroup::default().with_condition(cond(
            "",
            Operator::Eq,
            Some(1.into()),
        )));
        assert_eq!(f.validate(), Err(FilterError::EmptyColumn(1)));
    }

    #[test]
    fn test_missing_value_fails_validation() {
        let f = filter(FilterGroup::default().with_condition(cond("age", Operator::Eq, None)));
        assert!(matches!(
            f.validate(),
            Err(FilterError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_null_checks_need_no_value() {
        let f = filter(
            FilterGroup::default()
                .with_condition(cond("a", Operator::IsNull, None))
                .with_condition(cond("b", Operator::IsNotNull, None)),
        );
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_missing_table_fails_validation() {
        let f = Filter::new("public", " ", FilterGroup::default());
        assert_eq!(f.validate(), Err(FilterError::MissingTable));
    }

    #[test]
    fn test_empty_in_list_fails_validation() {
        let f = filter(FilterGroup::default().with_condition(cond(
            "id",
            Operator::In,
            Some(FilterValue::List(vec![])),
        )));
        assert!(matches!(f.validate(), Err(FilterError::EmptyList { .. })));
    }

    #[test]
    fn test_nested_condition_positions_are_global() {
        let inner = FilterGroup::new(Logic::Or).with_condition(cond("", Operator::Eq, Some(2.into())));
        let f = filter(
            FilterGroup::default()
                .with_condition(cond("a", Operator::Eq, Some(1.into())))
                .with_group(inner),
        );
        assert_eq!(f.validate(), Err(FilterError::EmptyColumn(2)));
    }

    #[test]
    fn test_operator_legality_by_type() {
        let like_on_int = cond("age", Operator::Like, Some("1%".into())).with_type(DataType::Integer);
        assert!(matches!(
            filter(FilterGroup::default().with_condition(like_on_int)).validate(),
            Err(FilterError::OperatorNotAllowed { .. })
        ));

        let gt_on_int = cond("age", Operator::Gt, Some(30.into())).with_type(DataType::Integer);
        assert!(filter(FilterGroup::default().with_condition(gt_on_int)).validate().is_ok());

        let has_key = cond("doc", Operator::HasKey, Some("k".into())).with_type(DataType::Jsonb);
        assert!(filter(FilterGroup::default().with_condition(has_key)).validate().is_ok());

        let overlap_on_json =
            cond("doc", Operator::ArrayOverlap, Some("k".into())).with_type(DataType::Jsonb);
        assert!(filter(FilterGroup::default().with_condition(overlap_on_json))
            .validate()
            .is_err());
    }

    #[test]
    fn test_equality_allowed_everywhere() {
        for data_type in [
            DataType::Integer,
            DataType::Text,
            DataType::Jsonb,
            DataType::Uuid,
            DataType::Boolean,
            DataType::Date,
            DataType::Array(Box::new(DataType::Text)),
        ] {
            let ops = Operator::available_for(&data_type);
            assert!(ops.contains(&Operator::Eq));
            assert!(ops.contains(&Operator::IsNull));
            assert!(ops.contains(&Operator::IsNotNull));
        }
    }

    #[test]
    fn test_uuid_gets_no_comparisons() {
        let ops = Operator::available_for(&DataType::Uuid);
        assert!(!ops.contains(&Operator::Lt));
        assert!(!ops.contains(&Operator::Like));
    }

    #[test]
    fn test_group_display() {
        let group = FilterGroup::default()
            .with_condition(cond("a", Operator::Eq, Some(1.into())))
            .with_group(
                FilterGroup::new(Logic::Or)
                    .with_condition(cond("b", Operator::IsNull, None))
                    .with_condition(cond("c", Operator::Gt, Some(2.into()))),
            );
        assert_eq!(group.to_string(), "a = 1 and (b IS NULL or c > 2)");
    }
}
