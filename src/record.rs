use crate::registry::CollectionDef;
use chrono::{SecondsFormat, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use std::collections::HashSet;

/// A single entity instance: an untyped bag of named JSON fields.
pub type Record = serde_json::Map<String, Value>;

const ID_SUFFIX_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// String form used by filters and sorts. Absent and null fields compare as
/// the empty string; everything else uses its JSON display form.
pub fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn id_of(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Generates `<prefix>_<random10>`, re-rolling until the id is not taken.
pub fn generate_id(prefix: &str, taken: &HashSet<&str>) -> String {
    loop {
        let candidate = format!("{}_{}", prefix, random_suffix());
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
    }
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Applies the collection's write rules in order: aliases, defaults, then the
/// field allow-list. `id` and the created stamp are not in any allow-list, so
/// caller-supplied values for them are always dropped here.
pub fn normalize(def: &CollectionDef, mut payload: Record, mode: WriteMode) -> Record {
    for (from, to) in def.aliases {
        if payload.contains_key(*from) && !payload.contains_key(*to) {
            if let Some(value) = payload.remove(*from) {
                payload.insert((*to).to_string(), value);
            }
        }
    }
    for (field, fill) in def.defaults {
        let supplied_blank = payload.get(*field).map(|v| stringify(Some(v)).is_empty());
        let apply = match mode {
            // On create a missing field is also filled; on update only a
            // supplied-but-blank value is, so patches never inject the field.
            WriteMode::Create => supplied_blank.unwrap_or(true),
            WriteMode::Update => supplied_blank.unwrap_or(false),
        };
        if apply {
            payload.insert((*field).to_string(), Value::String((*fill).to_string()));
        }
    }
    payload.retain(|key, _| def.allowed.contains(&key.as_str()));
    payload
}
