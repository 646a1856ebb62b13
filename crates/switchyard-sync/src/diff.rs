//! Structural comparison of command payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Fields the platform assigns or re-derives on its side
const SERVER_FIELDS: [&str; 6] = ["id", "application_id", "version", "guild_id", "default_permission", "dm_permission"];

/// Flags whose `false` value is equivalent to absence
const DEFAULT_FALSE_FIELDS: [&str; 3] = ["required", "autocomplete", "nsfw"];

const SUBCOMMAND_GROUP_TYPE: u64 = 2;

/// Result of comparing a manifest against a snapshot of one scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDiff {
    /// Local ids absent from the snapshot
    pub new: Vec<String>,
    /// Ids present on both sides with a structural difference
    pub updated: Vec<String>,
    /// Snapshot ids no longer declared locally
    pub deleted: Vec<String>,
    pub is_synced: bool,
}

impl SyncDiff {
    /// Compare `local` entries, in manifest order, against persisted rows.
    pub fn compute(local: &[(String, Value)], persisted: &HashMap<String, Value>) -> Self {
        let mut new = Vec::new();
        let mut updated = Vec::new();

        for (id, schema) in local {
            match persisted.get(id) {
                None => new.push(id.clone()),
                Some(previous) if !changed_fields(previous, schema).is_empty() => updated.push(id.clone()),
                Some(_) => {}
            }
        }

        let local_ids: HashSet<&str> = local.iter().map(|(id, _)| id.as_str()).collect();
        let mut deleted: Vec<String> = persisted
            .keys()
            .filter(|id| !local_ids.contains(id.as_str()))
            .cloned()
            .collect();
        deleted.sort_unstable();

        let is_synced = new.is_empty() && updated.is_empty() && deleted.is_empty();
        Self {
            new,
            updated,
            deleted,
            is_synced,
        }
    }

    /// Ids a targeted push has to write
    pub fn to_push(&self) -> impl Iterator<Item = &String> {
        self.new.iter().chain(self.updated.iter())
    }
}

/// Canonical form of a command payload.
///
/// Drops server-assigned fields, nulls, empty values, `false` defaults and
/// the `type` tag of subcommand groups, which the platform omits on
/// round-trip.
pub fn normalize(value: &Value) -> Value {
    clean(value, false).unwrap_or(Value::Null)
}

fn clean(value: &Value, is_option: bool) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let items: Vec<Value> = items.iter().filter_map(|item| clean(item, is_option)).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(map) => {
            let mut cleaned = Map::new();
            for (key, field) in map {
                if SERVER_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                if DEFAULT_FALSE_FIELDS.contains(&key.as_str()) && field == &Value::Bool(false) {
                    continue;
                }
                if is_option && key == "type" && field.as_u64() == Some(SUBCOMMAND_GROUP_TYPE) {
                    continue;
                }
                if let Some(field) = clean(field, key == "options") {
                    cleaned.insert(key.clone(), field);
                }
            }
            (!cleaned.is_empty()).then_some(Value::Object(cleaned))
        }
        other => Some(other.clone()),
    }
}

/// Paths at which the normalized forms of `before` and `after` differ
pub fn changed_fields(before: &Value, after: &Value) -> Vec<String> {
    let mut changes = Vec::new();
    compare(&normalize(before), &normalize(after), String::new(), &mut changes);
    changes
}

fn compare(before: &Value, after: &Value, path: String, changes: &mut Vec<String>) {
    match (before, after) {
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort_unstable();
            keys.dedup();
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => compare(x, y, child, changes),
                    _ => changes.push(child),
                }
            }
        }
        (Value::Array(a), Value::Array(b)) if a.len() == b.len() => {
            for (index, (x, y)) in a.iter().zip(b).enumerate() {
                compare(x, y, format!("{}[{}]", path, index), changes);
            }
        }
        (a, b) if a == b => {}
        _ => changes.push(if path.is_empty() { "$".to_string() } else { path }),
    }
}

/// Local id of a payload as returned by the platform.
///
/// Returns `None` for command types this workspace does not declare.
pub fn remote_id(schema: &Value) -> Option<String> {
    let name = schema.get("name")?.as_str()?;
    let prefix = match schema.get("type").and_then(Value::as_u64).unwrap_or(1) {
        1 => "ChatInput",
        2 => "UserContextMenu",
        3 => "MessageContextMenu",
        4 => "PrimaryEntryPoint",
        _ => return None,
    };
    Some(format!("{}/{}", prefix, name))
}
