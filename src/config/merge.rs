//! Field-by-field merging of configuration tiers.
//!
//! Maps merge key by key; every other value (arrays included) is replaced
//! wholesale by the higher tier.

use serde_json::Value;

/// Merge `overlay` onto `base`, overlay winning.
///
/// A null in the overlay means "not specified" and keeps the base value.
///
/// ```
/// use serde_json::json;
/// use squad_tasks::config::deep_merge;
///
/// let base = json!({"overdue": {"attention_days": 3, "urgent_days": 7}});
/// let overlay = json!({"overdue": {"urgent_days": 10}});
/// assert_eq!(
///     deep_merge(base, overlay),
///     json!({"overdue": {"attention_days": 3, "urgent_days": 10}})
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let next = match merged.remove(&key) {
                    Some(previous) => deep_merge(previous, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold `deep_merge` over tiers given lowest priority first.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}
