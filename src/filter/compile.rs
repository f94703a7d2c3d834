//! Filter tree to parameterized WHERE clause

use super::{FilterCondition, FilterGroup, FilterValue, Operator};

/// Output of [`compile`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledFilter {
    /// `WHERE ...`, or empty when the group renders to nothing
    pub clause: String,
    /// Positional arguments, `args[i]` binds to `$(start + i)`
    pub args: Vec<FilterValue>,
    /// First placeholder index not used by this clause
    pub next_index: usize,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }
}

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Compile a filter group starting at placeholder `$start_index`.
///
/// Placeholders are numbered left to right, depth first, across the whole
/// tree. Values never appear in the clause text.
pub fn compile(group: &FilterGroup, start_index: usize) -> CompiledFilter {
    let mut args = Vec::new();
    let mut next = start_index;
    let body = render_group(group, &mut next, &mut args);
    let clause = if body.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", body)
    };
    CompiledFilter {
        clause,
        args,
        next_index: next,
    }
}

fn render_group(group: &FilterGroup, next: &mut usize, args: &mut Vec<FilterValue>) -> String {
    let mut parts = Vec::with_capacity(group.conditions.len() + group.subgroups.len());
    for condition in &group.conditions {
        parts.push(render_condition(condition, next, args));
    }
    for sub in &group.subgroups {
        let rendered = render_group(sub, next, args);
        if !rendered.is_empty() {
            parts.push(format!("({})", rendered));
        }
    }
    parts.join(&format!(" {} ", group.logic.as_sql()))
}

fn render_condition(
    condition: &FilterCondition,
    next: &mut usize,
    args: &mut Vec<FilterValue>,
) -> String {
    let column = quote_ident(&condition.column);
    let operator = condition.operator;
    if !operator.requires_value() {
        return format!("{} {}", column, operator.label());
    }

    let placeholder = format!("${}", *next);
    *next += 1;
    args.push(condition.value.clone().unwrap_or(FilterValue::Null));

    match operator {
        Operator::In => format!("{} = ANY({})", column, placeholder),
        Operator::NotIn => format!("{} <> ALL({})", column, placeholder),
        _ => format!("{} {} {}", column, operator.label(), placeholder),
    }
}
