//! Recursive JSON merge used to compose configuration and command schemas.
//!
//! The merge is asymmetric: nested objects are merged key by key, anything
//! else is overwritten by the source. There is no conflict detection; when
//! two contributions set the same scalar, the later merge wins.

use serde_json::Value;

/// Deep-merge `src` into `dst` in place.
///
/// For every key in an object `src`, recurse if `dst` already holds an
/// object at that key, otherwise insert (or overwrite) a clone of the source
/// value. If either side is not an object, `dst` becomes a clone of `src`.
pub fn merge(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (key, src_value) in src_map {
                match dst_map.get_mut(key) {
                    Some(existing) if existing.is_object() => merge(existing, src_value),
                    _ => {
                        dst_map.insert(key.clone(), src_value.clone());
                    }
                }
            }
        }
        (dst, src) => *dst = src.clone(),
    }
}
