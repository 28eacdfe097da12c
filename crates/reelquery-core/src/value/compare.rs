use crate::value::{TextMode, Value};
use std::cmp::Ordering;

// Fold text for case-insensitive comparison.
fn fold(text: &str, mode: TextMode) -> std::borrow::Cow<'_, str> {
    match mode {
        TextMode::Cs => std::borrow::Cow::Borrowed(text),
        TextMode::Ci => std::borrow::Cow::Owned(text.to_lowercase()),
    }
}

/// Equality under the given text mode.
///
/// Returns `None` when the pair is not comparable (either side null, or the
/// value families differ). Callers treat `None` as a non-match.
#[must_use]
pub(crate) fn compare_eq(lhs: &Value, rhs: &Value, mode: TextMode) -> Option<bool> {
    match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Bool(a), Value::Bool(b)) => Some(a == b),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a == b),
        (Value::List(a), Value::List(b)) => {
            if a.len() != b.len() {
                return Some(false);
            }
            for (x, y) in a.iter().zip(b) {
                if compare_eq(x, y, mode) != Some(true) {
                    return Some(false);
                }
            }
            Some(true)
        }
        (Value::Text(_) | Value::Enum(_), Value::Text(_) | Value::Enum(_)) => {
            let (a, b) = (lhs.as_text()?, rhs.as_text()?);
            Some(fold(a, mode) == fold(b, mode))
        }
        _ => compare_order(lhs, rhs, mode).map(Ordering::is_eq),
    }
}

/// Ordering under the given text mode.
///
/// Integers and floats compare numerically with each other. Lists, records,
/// nulls and mixed families are unordered.
#[must_use]
pub(crate) fn compare_order(lhs: &Value, rhs: &Value, mode: TextMode) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            lhs.as_f64()?.partial_cmp(&rhs.as_f64()?)
        }
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) | (Value::Enum(a), Value::Enum(b)) => {
            Some(fold(a, mode).cmp(&fold(b, mode)))
        }
        _ => None,
    }
}
