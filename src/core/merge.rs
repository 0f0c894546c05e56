//! # Configuration Merge
//!
//! Recursive merge of configuration layers:
//! - Mappings: deep-merge by key, new keys are appended in overlay order
//! - Lists: concatenate (overlay items after base items)
//! - Scalars: override (overlay wins)
//!
//! A `null` overlay contributes nothing: a key whose items are all commented
//! out in a later layer keeps the value of the earlier layers. Otherwise a
//! list or mapping meeting a value of another shape is a conflict and is
//! reported instead of silently replaced.

use crate::models::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Cannot merge {overlay} into {base} for configuration key '{key}'.")]
pub struct MergeConflict {
    pub key: String,
    pub base: &'static str,
    pub overlay: &'static str,
}

/// Merges `overlay` into `base` in place.
pub fn dict_merge(base: &mut Map, overlay: Map) -> Result<(), MergeConflict> {
    merge_map(base, overlay, "")
}

fn merge_map(base: &mut Map, overlay: Map, prefix: &str) -> Result<(), MergeConflict> {
    for (key, overlay_value) in overlay {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match base.get_mut(&key) {
            Some(base_value) => merge_value(base_value, overlay_value, &path)?,
            None => {
                base.insert(key, overlay_value);
            }
        }
    }
    Ok(())
}

fn merge_value(base: &mut Value, overlay: Value, path: &str) -> Result<(), MergeConflict> {
    match (base, overlay) {
        (_, Value::Null) => Ok(()),
        (Value::Map(base_map), Value::Map(overlay_map)) => merge_map(base_map, overlay_map, path),
        (Value::List(base_items), Value::List(overlay_items)) => {
            base_items.extend(overlay_items);
            Ok(())
        }
        (base, overlay) => {
            // An unset value may be filled with anything.
            if (base.is_scalar() && overlay.is_scalar()) || matches!(base, Value::Null) {
                *base = overlay;
                Ok(())
            } else {
                Err(MergeConflict {
                    key: path.to_string(),
                    base: base.kind(),
                    overlay: overlay.kind(),
                })
            }
        }
    }
}
