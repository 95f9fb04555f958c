//! Raw tree merging.
//!
//! Merging is how includes, `target_defaults` and condition branches are
//! combined with the node they apply to. The incoming map is always the
//! more recent one:
//!
//! - maps merge recursively
//! - lists append
//! - scalars and booleans are replaced
//!
//! A trailing character on a key overrides the default for that key:
//! `key=` replaces, `key+` prepends, `key?` sets only when absent. The
//! suffix is consumed by the merge. List items are copied verbatim, so the
//! suffixes inside a target stay in place until the target itself is merged
//! over its defaults.
//!
//! Configuration override blocks keep their suffixes: they apply to the
//! resolved settings of a target, not to the raw tree, so the resolver
//! honors them when it layers the block.

use serde_json::Value as Raw;

use crate::core::settings::{split_key, MergePolicy};
use crate::sources::RawMap;

/// Key holding a target's per-configuration override blocks.
pub const CONFIGURATIONS: &str = "configurations";

/// Merge `src` into `dst`.
///
/// Fails when a list meets a non-list (or a map meets a non-map) on the
/// same key.
pub fn merge_into(dst: &mut RawMap, src: &RawMap) -> Result<(), String> {
    for (key, incoming) in src {
        let (base, policy) = split_key(key);
        let verbatim = base == CONFIGURATIONS;
        let incoming = if verbatim {
            incoming.clone()
        } else {
            consume_suffixes(incoming)?
        };

        let Some(existing) = dst.get_mut(base) else {
            dst.insert(base.to_string(), incoming);
            continue;
        };

        match policy {
            MergePolicy::Replace => *existing = incoming,
            MergePolicy::IfAbsent => {}
            MergePolicy::Prepend => match (existing, incoming) {
                (Raw::Array(existing), Raw::Array(mut front)) => {
                    front.append(existing);
                    *existing = front;
                }
                _ => return Err(collision(base, "prepend to")),
            },
            MergePolicy::Merge => match (existing, incoming) {
                (Raw::Object(existing), Raw::Object(more)) if verbatim => {
                    merge_verbatim(existing, &more)?
                }
                (Raw::Object(existing), Raw::Object(more)) => merge_into(existing, &more)?,
                (Raw::Array(existing), Raw::Array(more)) => existing.extend(more),
                (existing, incoming) => {
                    if is_container(existing) || is_container(&incoming) {
                        return Err(collision(base, "merge"));
                    }
                    *existing = incoming;
                }
            },
        }
    }
    Ok(())
}

/// Merge `src` into `dst` with every key taken as written.
///
/// `key=` and `key` stay distinct entries; maps merge recursively, lists
/// append and scalars are replaced.
pub fn merge_verbatim(dst: &mut RawMap, src: &RawMap) -> Result<(), String> {
    for (key, incoming) in src {
        let Some(existing) = dst.get_mut(key) else {
            dst.insert(key.clone(), incoming.clone());
            continue;
        };
        match (existing, incoming) {
            (Raw::Object(existing), Raw::Object(more)) => merge_verbatim(existing, more)?,
            (Raw::Array(existing), Raw::Array(more)) => existing.extend(more.iter().cloned()),
            (existing, incoming) => {
                if is_container(existing) || is_container(incoming) {
                    return Err(collision(key, "merge"));
                }
                *existing = incoming.clone();
            }
        }
    }
    Ok(())
}

/// Copy a value, consuming merge suffixes inside nested maps.
fn consume_suffixes(value: &Raw) -> Result<Raw, String> {
    match value {
        Raw::Object(map) => {
            let mut out = RawMap::new();
            merge_into(&mut out, map)?;
            Ok(Raw::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn is_container(value: &Raw) -> bool {
    matches!(value, Raw::Array(_) | Raw::Object(_))
}

fn collision(key: &str, verb: &str) -> String {
    format!("cannot {} `{}`: existing and incoming values differ in type", verb, key)
}
