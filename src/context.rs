//! Context values: arbitrary key-value pairs describing application state,
//! used for conditional UI and extension activation.

use std::collections::BTreeMap;

use serde_json::Value;

/// The context map. Ordered so snapshots compare and log deterministically.
pub type Context = BTreeMap<String, Value>;

/// Applies a partial update to a context, returning the merged result.
///
/// Keys present in `updates` replace the existing value; a key mapped to
/// `null` removes it.
pub fn apply_context_update(base: &Context, updates: &Context) -> Context {
    let mut merged = base.clone();
    for (key, value) in updates {
        match value {
            Value::Null => {
                merged.remove(key);
            }
            value => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}
