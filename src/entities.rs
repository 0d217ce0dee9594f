use crate::query;
use crate::record::{self, id_of, Record, WriteMode};
use crate::registry::CollectionDef;
use crate::storage::Store;
use crate::AppError;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The one reusable abstraction in the system: uniform list/create/update/
/// delete and query operations against any registered collection, shielding
/// the HTTP layer from storage details.
#[derive(Clone)]
pub struct Entities {
    store: Arc<dyn Store>,
}

impl Entities {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All records of the collection with equality filters and the optional
    /// `sort` key applied, in that order.
    pub fn list(&self, def: &CollectionDef, params: &HashMap<String, String>) -> Result<Vec<Record>, AppError> {
        let records = self.store.all(def)?;
        Ok(query::apply(records, params))
    }

    /// Normalizes and allow-lists the payload, stamps a fresh unique id and
    /// the creation timestamp, and persists before returning.
    pub fn create(&self, def: &CollectionDef, payload: Record) -> Result<Record, AppError> {
        let mut created = record::normalize(def, payload, WriteMode::Create);
        let existing = self.store.all(def)?;
        let taken: HashSet<&str> = existing.iter().filter_map(id_of).collect();
        let id = record::generate_id(def.prefix, &taken);
        created.insert("id".to_string(), Value::String(id.clone()));
        created.insert(def.created_field.to_string(), Value::String(record::timestamp()));
        self.store.put(def, &id, &created)?;
        Ok(created)
    }

    /// Shallow-merges the normalized payload over the stored record. Fields
    /// absent from the payload are preserved; the id and creation stamp are
    /// immutable. The merge runs inside the store's atomic `modify`, so two
    /// overlapping updates to the same record both land.
    pub fn update(&self, def: &CollectionDef, id: &str, payload: Record) -> Result<Record, AppError> {
        let patch = record::normalize(def, payload, WriteMode::Update);
        let updated = self.store.modify(def, id, &mut |existing| {
            for (field, value) in &patch {
                existing.insert(field.clone(), value.clone());
            }
        })?;
        updated.ok_or_else(|| AppError::NotFound(format!("{}/{}", def.key, id)))
    }

    pub fn delete(&self, def: &CollectionDef, id: &str) -> Result<(), AppError> {
        if self.store.remove(def, id)? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("{}/{}", def.key, id)))
        }
    }

    /// Upsert-by-id for one-time seed imports. Rows carrying a known id merge
    /// like `update`, rows with a fresh id are inserted as supplied, and rows
    /// without an id are created with a generated one. Returns the number of
    /// rows applied.
    pub fn bulk_upsert(&self, def: &CollectionDef, rows: Vec<Record>) -> Result<usize, AppError> {
        let existing = self.store.all(def)?;
        let mut by_id: HashMap<String, Record> = existing
            .iter()
            .filter_map(|r| id_of(r).map(|id| (id.to_string(), r.clone())))
            .collect();
        let mut taken: HashSet<String> = by_id.keys().cloned().collect();

        let mut batch: Vec<Record> = Vec::with_capacity(rows.len());
        for row in rows {
            let supplied_id = id_of(&row).map(str::to_string);
            match supplied_id {
                Some(id) => {
                    if let Some(current) = by_id.get(&id) {
                        let mut merged = current.clone();
                        for (field, value) in record::normalize(def, row, WriteMode::Update) {
                            merged.insert(field, value);
                        }
                        by_id.insert(id.clone(), merged.clone());
                        batch.push(merged);
                    } else {
                        let mut fresh = record::normalize(def, row, WriteMode::Create);
                        fresh.insert("id".to_string(), Value::String(id.clone()));
                        fresh.insert(def.created_field.to_string(), Value::String(record::timestamp()));
                        taken.insert(id.clone());
                        by_id.insert(id, fresh.clone());
                        batch.push(fresh);
                    }
                }
                None => {
                    let mut fresh = record::normalize(def, row, WriteMode::Create);
                    let borrowed: HashSet<&str> = taken.iter().map(String::as_str).collect();
                    let id = record::generate_id(def.prefix, &borrowed);
                    fresh.insert("id".to_string(), Value::String(id.clone()));
                    fresh.insert(def.created_field.to_string(), Value::String(record::timestamp()));
                    taken.insert(id.clone());
                    by_id.insert(id, fresh.clone());
                    batch.push(fresh);
                }
            }
        }
        let count = batch.len();
        self.store.put_many(def, &batch)?;
        Ok(count)
    }
}
