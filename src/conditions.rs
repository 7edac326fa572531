//! Declarative guard conditions: a small, closed expression language over
//! the workflow context.
//!
//! Conditions are either a single field comparison (dotted-path lookup into
//! the context JSON) or a boolean composition of nested conditions. The
//! operator set is a closed enum evaluated by exhaustive match; unknown
//! operator strings deserialize to [`ComparisonOperator::Equals`], a
//! deliberate lenient fallback so malformed caller configuration degrades
//! to an equality check instead of rejecting the transition outright.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Field comparison kinds supported by declarative guards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    #[default]
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    In,
}

impl ComparisonOperator {
    /// Parse an operator tag, falling back to `Equals` for anything
    /// unrecognized.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "contains" => Self::Contains,
            "in" => Self::In,
            _ => Self::Equals,
        }
    }

    /// Apply this operator to a looked-up context value and the expected
    /// value from the condition.
    pub fn compare(&self, actual: &Value, expected: &Value) -> bool {
        match self {
            Self::Equals => json_equals(actual, expected),
            Self::NotEquals => !json_equals(actual, expected),
            Self::GreaterThan => compare_ordered(actual, expected)
                .map(|ord| ord == std::cmp::Ordering::Greater)
                .unwrap_or(false),
            Self::LessThan => compare_ordered(actual, expected)
                .map(|ord| ord == std::cmp::Ordering::Less)
                .unwrap_or(false),
            Self::Contains => match (actual, expected) {
                (Value::String(haystack), Value::String(needle)) => {
                    haystack.contains(needle.as_str())
                }
                (Value::Array(items), _) => items.iter().any(|item| json_equals(item, expected)),
                _ => false,
            },
            Self::In => match (expected, actual) {
                (Value::Array(items), _) => items.iter().any(|item| json_equals(item, actual)),
                (Value::String(haystack), Value::String(needle)) => {
                    haystack.contains(needle.as_str())
                }
                // Scalar membership target degrades to equality
                _ => json_equals(actual, expected),
            },
        }
    }
}

impl<'de> Deserialize<'de> for ComparisonOperator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals => write!(f, "equals"),
            Self::NotEquals => write!(f, "not_equals"),
            Self::GreaterThan => write!(f, "greater_than"),
            Self::LessThan => write!(f, "less_than"),
            Self::Contains => write!(f, "contains"),
            Self::In => write!(f, "in"),
        }
    }
}

/// A declarative guard condition evaluated against the workflow context.
///
/// Serialized form mirrors the caller-facing shapes:
/// `{"field": "...", "operator": "...", "value": ...}`,
/// `{"all": [...]}` and `{"any": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// Conjunction: every nested condition must pass.
    All { all: Vec<Condition> },
    /// Disjunction: at least one nested condition must pass.
    Any { any: Vec<Condition> },
    /// Single field comparison via dotted-path lookup.
    Compare {
        field: String,
        #[serde(default)]
        operator: ComparisonOperator,
        #[serde(default)]
        value: Value,
    },
}

impl Condition {
    /// Shorthand for a field comparison.
    pub fn compare(
        field: impl Into<String>,
        operator: ComparisonOperator,
        value: Value,
    ) -> Self {
        Self::Compare {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Shorthand for "field must hold a truthy value".
    pub fn truthy(field: impl Into<String>) -> Self {
        Self::compare(field, ComparisonOperator::Equals, Value::Null)
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::All { all: conditions }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::Any { any: conditions }
    }

    /// Evaluate against a context object.
    ///
    /// A comparison whose expected value is JSON null passes iff the field
    /// currently holds a truthy value; a comparison against a missing
    /// field fails.
    pub fn evaluate(&self, context: &Value) -> bool {
        match self {
            Self::All { all } => all.iter().all(|c| c.evaluate(context)),
            Self::Any { any } => any.iter().any(|c| c.evaluate(context)),
            Self::Compare {
                field,
                operator,
                value,
            } => {
                let actual = lookup_path(context, field);
                if value.is_null() {
                    return is_truthy(actual);
                }
                match actual {
                    Some(actual) => operator.compare(actual, value),
                    None => false,
                }
            }
        }
    }
}

/// Resolve a dotted path ("branch_data.name", "items.0.amount") inside a
/// JSON value. Numeric segments index into arrays.
pub fn lookup_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// JavaScript-flavored truthiness: null, false, 0, "" and absence are
/// falsy; everything else is truthy.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Equality with numeric coercion so 3 and 3.0 compare equal.
fn json_equals(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_ordered(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn ctx() -> Value {
        json!({
            "branch_data": { "name": "Gulshan", "code": 42 },
            "expense_items": [ { "amount": 100 }, { "amount": 250 } ],
            "approval_comments": "",
            "status": "review",
            "tags": ["urgent", "finance"]
        })
    }

    #[test]
    fn test_dotted_path_lookup() {
        let context = ctx();
        assert_eq!(
            lookup_path(&context, "branch_data.name"),
            Some(&json!("Gulshan"))
        );
        assert_eq!(
            lookup_path(&context, "expense_items.1.amount"),
            Some(&json!(250))
        );
        assert_eq!(lookup_path(&context, "branch_data.missing"), None);
    }

    #[test]
    fn test_null_expected_means_truthy_field() {
        let mut context = ctx();
        let guard = Condition::truthy("approval_comments");

        // Empty string is falsy
        assert!(!guard.evaluate(&context));

        context["approval_comments"] = json!("looks good");
        assert!(guard.evaluate(&context));
    }

    #[test]
    fn test_missing_field_fails_comparison() {
        let guard = Condition::compare("nonexistent", ComparisonOperator::Equals, json!("x"));
        assert!(!guard.evaluate(&ctx()));
    }

    #[test]
    fn test_comparison_operators() {
        let context = ctx();
        assert!(Condition::compare("status", ComparisonOperator::Equals, json!("review"))
            .evaluate(&context));
        assert!(Condition::compare("status", ComparisonOperator::NotEquals, json!("draft"))
            .evaluate(&context));
        assert!(
            Condition::compare("branch_data.code", ComparisonOperator::GreaterThan, json!(10))
                .evaluate(&context)
        );
        assert!(
            Condition::compare("branch_data.code", ComparisonOperator::LessThan, json!(100))
                .evaluate(&context)
        );
        assert!(Condition::compare("tags", ComparisonOperator::Contains, json!("urgent"))
            .evaluate(&context));
        assert!(Condition::compare(
            "status",
            ComparisonOperator::In,
            json!(["draft", "review"])
        )
        .evaluate(&context));
    }

    #[test]
    fn test_boolean_composition() {
        let context = ctx();
        let guard = Condition::all(vec![
            Condition::compare("status", ComparisonOperator::Equals, json!("review")),
            Condition::any(vec![
                Condition::compare("branch_data.code", ComparisonOperator::Equals, json!(42)),
                Condition::truthy("approval_comments"),
            ]),
        ]);
        assert!(guard.evaluate(&context));
    }

    #[test]
    fn test_unknown_operator_falls_back_to_equals() {
        let parsed: Condition = serde_json::from_value(json!({
            "field": "status",
            "operator": "fuzzy_matches",
            "value": "review"
        }))
        .unwrap();
        assert!(parsed.evaluate(&ctx()));
    }

    #[test]
    fn test_serde_round_trip_shapes() {
        let parsed: Condition = serde_json::from_value(json!({
            "all": [
                { "field": "status", "value": "review" },
                { "any": [ { "field": "tags", "operator": "contains", "value": "urgent" } ] }
            ]
        }))
        .unwrap();
        assert!(parsed.evaluate(&ctx()));
    }

    proptest! {
        #[test]
        fn prop_greater_than_matches_integer_ordering(a in -1000i64..1000, b in -1000i64..1000) {
            let context = json!({ "x": a });
            let guard = Condition::compare("x", ComparisonOperator::GreaterThan, json!(b));
            prop_assert_eq!(guard.evaluate(&context), a > b);
        }

        #[test]
        fn prop_equals_is_reflexive_on_strings(s in ".{0,24}") {
            let context = json!({ "x": s.clone() });
            let guard = Condition::compare("x", ComparisonOperator::Equals, json!(s));
            prop_assert!(guard.evaluate(&context));
        }

        #[test]
        fn prop_not_equals_negates_equals(a in -50i64..50, b in -50i64..50) {
            let context = json!({ "x": a });
            let eq = Condition::compare("x", ComparisonOperator::Equals, json!(b)).evaluate(&context);
            let ne = Condition::compare("x", ComparisonOperator::NotEquals, json!(b)).evaluate(&context);
            prop_assert_ne!(eq, ne);
        }
    }
}
