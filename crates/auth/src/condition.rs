//! Evaluation of policy conditions against the merged request context.

use regex::Regex;
use serde_json::Value;

use iam_core::{Condition, IamError, IamResult, NumericOp};

/// Evaluate one condition. `value` is the context attribute the condition is
/// keyed on; a missing attribute never satisfies a condition.
pub fn evaluate(condition: &Condition, value: Option<&Value>, subject: &str) -> IamResult<bool> {
    let Some(value) = value else {
        return Ok(false);
    };

    let ok = match condition {
        Condition::StringEqualCondition { equals } => value.as_str() == Some(equals.as_str()),
        Condition::StringMatchCondition { matches } => {
            let re = Regex::new(&format!("^(?:{matches})$"))
                .map_err(|e| IamError::invalid(format!("condition pattern {matches:?}: {e}")))?;
            value.as_str().is_some_and(|s| re.is_match(s))
        }
        Condition::EqualsSubjectCondition {} => value.as_str() == Some(subject),
        Condition::BooleanCondition { value: expected } => value.as_bool() == Some(*expected),
        Condition::NumericCondition { operator, value: rhs } => match value.as_f64() {
            Some(lhs) => compare(*operator, lhs, *rhs),
            None => false,
        },
        Condition::ContainsCondition { value: needle } => value
            .as_array()
            .is_some_and(|items| items.iter().any(|item| item == needle)),
    };

    Ok(ok)
}

fn compare(op: NumericOp, lhs: f64, rhs: f64) -> bool {
    match op {
        NumericOp::Eq => lhs == rhs,
        NumericOp::Lt => lhs < rhs,
        NumericOp::Lte => lhs <= rhs,
        NumericOp::Gt => lhs > rhs,
        NumericOp::Gte => lhs >= rhs,
    }
}
