//! Lowering conditions onto one index
//!
//! Conditions are matched against the index's field list:
//!
//! ```text
//! fields: [city, age]
//!
//! city == 'Oslo' AND age == 30   → EQ (Oslo, 30)
//! city == 'Oslo'                 → EQ (Oslo)            prefix match
//! city == 'Oslo' AND age > 30    → EQ (Oslo) AND GT (Oslo, 30)
//! city >= 'M' AND city < 'P'     → GE (M) AND LT (P)
//! age > 30                       → unsupported: city is not fixed
//! city == 'A' AND city == 'B'     → EQ (A) AND EQ (B)     matches nothing
//! ```
//!
//! Every field before the last constrained one must be fixed by equality.

use crate::index::{IndexOperator, SearchKey};
use crate::query::ast::{Condition, Operator};
use crate::query::error::{QueryError, QueryResult};
use crate::query::parser::parse_conditions;
use crate::value::Value;

/// Lower a conjunction of conditions into an operator tree
pub fn lower(conditions: &[Condition], fields: &[String]) -> QueryResult<IndexOperator> {
    if conditions.is_empty() {
        return Err(QueryError::Parse("no conditions".to_string()));
    }

    let mut positioned = Vec::with_capacity(conditions.len());
    for condition in conditions {
        if condition.op == Operator::Ne {
            return Err(QueryError::Unsupported(format!(
                "'{}' cannot be answered by an index",
                condition
            )));
        }

        let position = fields
            .iter()
            .position(|f| f == &condition.field)
            .ok_or_else(|| QueryError::UnknownField(condition.field.clone()))?;

        positioned.push((position, condition));
    }

    // `positioned` is non-empty here
    let last = positioned.iter().map(|(p, _)| *p).max().unwrap_or(0);

    if positioned
        .iter()
        .any(|(p, c)| *p < last && c.op != Operator::Eq)
    {
        return Err(QueryError::Unsupported(format!(
            "only '{}' may carry a range condition",
            fields[last]
        )));
    }

    // Fields before the last one are each fixed by their first equality
    let mut prefix = Vec::with_capacity(last + 1);
    for (position, field) in fields.iter().enumerate().take(last) {
        let value = first_equality(&positioned, position).ok_or_else(|| {
            QueryError::Unsupported(format!(
                "field '{}' needs an equality condition before '{}' can be queried",
                field, fields[last]
            ))
        })?;
        prefix.push(value.clone());
    }

    // A differing equality on a prefix field is its own EQ; the conjunction is empty
    let conflicts: Vec<IndexOperator> = positioned
        .iter()
        .filter(|(p, c)| *p < last && c.value != prefix[*p])
        .map(|(p, c)| {
            let mut key = prefix[..*p].to_vec();
            key.push(c.value.clone());
            IndexOperator::Eq(SearchKey::new(key))
        })
        .collect();

    let mut operator = last_field(&positioned, last, prefix)?;
    for conflict in conflicts {
        operator = operator.and(conflict);
    }

    Ok(operator)
}

/// Operator for the conditions on the last constrained field
fn last_field(
    positioned: &[(usize, &Condition)],
    last: usize,
    mut prefix: Vec<Value>,
) -> QueryResult<IndexOperator> {
    let on_last: Vec<&Condition> = positioned
        .iter()
        .filter(|(p, _)| *p == last)
        .map(|(_, c)| *c)
        .collect();

    // All equal to one value: one exact tuple
    if let Some(value) = first_equality(positioned, last) {
        if on_last.iter().all(|c| c.op == Operator::Eq && &c.value == value) {
            prefix.push(value.clone());
            return Ok(IndexOperator::Eq(SearchKey::new(prefix)));
        }
    }

    let mut leaves = on_last.iter().map(|condition| {
        let mut key = prefix.clone();
        key.push(condition.value.clone());
        leaf(condition.op, SearchKey::new(key))
    });

    let first = leaves
        .next()
        .ok_or_else(|| QueryError::Parse("no conditions".to_string()))?;
    let operator = leaves.fold(first, IndexOperator::and);

    if prefix.is_empty() {
        Ok(operator)
    } else {
        Ok(IndexOperator::Eq(SearchKey::new(prefix)).and(operator))
    }
}

/// Parse and lower in one step
pub fn compile(input: &str, fields: &[String]) -> QueryResult<IndexOperator> {
    let conditions = parse_conditions(input)?;
    lower(&conditions, fields)
}

/// Value of the first equality condition on `position`
fn first_equality<'c>(positioned: &[(usize, &'c Condition)], position: usize) -> Option<&'c Value> {
    positioned
        .iter()
        .find(|(p, c)| *p == position && c.op == Operator::Eq)
        .map(|(_, c)| &c.value)
}

fn leaf(op: Operator, key: SearchKey) -> IndexOperator {
    match op {
        Operator::Eq => IndexOperator::Eq(key),
        Operator::Gt => IndexOperator::Gt(key),
        Operator::Gte => IndexOperator::Ge(key),
        Operator::Lt => IndexOperator::Lt(key),
        // Ne is rejected before lowering
        Operator::Lte | Operator::Ne => IndexOperator::Le(key),
    }
}
