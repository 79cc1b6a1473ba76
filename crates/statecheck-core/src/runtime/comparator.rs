// crates/statecheck-core/src/runtime/comparator.rs
// ============================================================================
// Module: Statecheck Comparator Logic
// Description: Comparator evaluation for field_compare predicates.
// Purpose: Compare an extracted field against an expected operand.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! Comparators return `None` when the comparison is undefined for the operand
//! types (for example ordering a string). The evaluator turns an undefined
//! comparison into an evaluation error rather than a silent pass or fail.
//! Numeric ordering is integer-only; decimal operands are undefined.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde_json::Number;
use serde_json::Value;

use crate::core::Comparator;

// ============================================================================
// SECTION: Comparator Evaluation
// ============================================================================

/// Evaluates `actual <comparator> expected`.
#[must_use]
pub fn compare(comparator: Comparator, actual: &Value, expected: &Value) -> Option<bool> {
    match comparator {
        Comparator::Equals => Some(actual == expected),
        Comparator::NotEquals => Some(actual != expected),
        Comparator::GreaterThan
        | Comparator::GreaterThanOrEqual
        | Comparator::LessThan
        | Comparator::LessThanOrEqual => compare_numbers(comparator, actual, expected),
        Comparator::Contains => compare_contains(actual, expected),
        Comparator::InSet => compare_in_set(actual, expected),
    }
}

/// Compares numeric JSON values. Numeric strings such as `"3"` are accepted.
fn compare_numbers(comparator: Comparator, left: &Value, right: &Value) -> Option<bool> {
    let ordering = numeric_cmp(&as_number(left)?, &as_number(right)?)?;
    match comparator {
        Comparator::GreaterThan => Some(ordering.is_gt()),
        Comparator::GreaterThanOrEqual => Some(ordering.is_ge()),
        Comparator::LessThan => Some(ordering.is_lt()),
        Comparator::LessThanOrEqual => Some(ordering.is_le()),
        _ => None,
    }
}

/// Evaluates containment semantics for JSON values.
fn compare_contains(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::String(haystack), Value::String(needle)) => Some(haystack.contains(needle.as_str())),
        (Value::Array(haystack), Value::Array(needle)) => {
            Some(needle.iter().all(|item| haystack.contains(item)))
        }
        (Value::Array(haystack), needle) => Some(haystack.contains(needle)),
        _ => None,
    }
}

/// Evaluates set membership for JSON values.
fn compare_in_set(value: &Value, expected: &Value) -> Option<bool> {
    match expected {
        Value::Array(values) => Some(values.contains(value)),
        _ => None,
    }
}

/// Reads a JSON number, parsing integer strings.
fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(number) => Some(number.clone()),
        Value::String(text) => text.trim().parse::<i64>().ok().map(Number::from),
        _ => None,
    }
}

/// Compares two JSON numbers using integer-only semantics.
fn numeric_cmp(left: &Number, right: &Number) -> Option<Ordering> {
    let left = integer_value(left)?;
    let right = integer_value(right)?;
    match (left, right) {
        (IntegerValue::Signed(left), IntegerValue::Signed(right)) => Some(left.cmp(&right)),
        (IntegerValue::Unsigned(left), IntegerValue::Unsigned(right)) => Some(left.cmp(&right)),
        (IntegerValue::Signed(left), IntegerValue::Unsigned(right)) => {
            u64::try_from(left).map_or(Some(Ordering::Less), |left| Some(left.cmp(&right)))
        }
        (IntegerValue::Unsigned(left), IntegerValue::Signed(right)) => {
            u64::try_from(right).map_or(Some(Ordering::Greater), |right| Some(left.cmp(&right)))
        }
    }
}

/// Integer representation of JSON numbers for deterministic comparison.
enum IntegerValue {
    /// Fits in `i64`.
    Signed(i64),
    /// Above `i64::MAX`.
    Unsigned(u64),
}

/// Extracts integer values and rejects decimals.
fn integer_value(value: &Number) -> Option<IntegerValue> {
    if let Some(value) = value.as_i64() {
        return Some(IntegerValue::Signed(value));
    }
    value.as_u64().map(IntegerValue::Unsigned)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;

    use super::*;

    #[test]
    fn ordering_is_integer_only() {
        assert_eq!(compare(Comparator::GreaterThanOrEqual, &json!(3), &json!(2)), Some(true));
        assert_eq!(compare(Comparator::LessThan, &json!(-1), &json!(u64::MAX)), Some(true));
        assert_eq!(compare(Comparator::GreaterThan, &json!(1.5), &json!(1)), None);
        assert_eq!(compare(Comparator::GreaterThan, &json!("abc"), &json!(1)), None);
    }

    #[test]
    fn numeric_strings_compare_as_integers() {
        assert_eq!(compare(Comparator::GreaterThanOrEqual, &json!("3"), &json!(3)), Some(true));
    }

    #[test]
    fn containment_and_membership() {
        assert_eq!(compare(Comparator::Contains, &json!("grafana.local"), &json!("local")), Some(true));
        assert_eq!(compare(Comparator::Contains, &json!(["a", "b"]), &json!("b")), Some(true));
        assert_eq!(compare(Comparator::InSet, &json!("nginx"), &json!(["nginx", "public"])), Some(true));
        assert_eq!(compare(Comparator::InSet, &json!("nginx"), &json!("nginx")), None);
    }
}
