use crate::record::Record;
use crate::registry::{CollectionDef, COLLECTIONS};
use crate::storage::Store;
use crate::AppError;
use redb::{Database, ReadableTable, TableDefinition};
use std::fs;
use std::path::Path;

/// Table-backed variant: one redb table per collection keyed by id, values
/// stored as JSON text. Each operation runs in its own transaction, matching
/// the per-statement atomicity the original deployment leaned on.
pub struct RedbStore {
    db: Database,
}

fn table_def(def: &CollectionDef) -> TableDefinition<'static, &'static str, &'static str> {
    TableDefinition::new(def.name)
}

impl RedbStore {
    /// Creates or opens the database under `dir` and ensures a table exists
    /// for every registered collection.
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir)?;
        let db_path = dir.join("haulbase.redb");
        if db_path.exists() {
            crate::info!("Opening existing db at {:?}, it might take a while in case previous process was killed", db_path);
        }
        let db = Database::create(db_path)?;
        let tx = db.begin_write()?;
        for def in COLLECTIONS {
            tx.open_table(table_def(def))?;
        }
        tx.commit()?;
        Ok(Self { db })
    }
}

impl Store for RedbStore {
    fn all(&self, def: &CollectionDef) -> Result<Vec<Record>, AppError> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(table_def(def))?;
        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_str(value.value())?);
        }
        Ok(records)
    }

    fn get(&self, def: &CollectionDef, id: &str) -> Result<Option<Record>, AppError> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(table_def(def))?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
            None => Ok(None),
        }
    }

    fn put(&self, def: &CollectionDef, id: &str, record: &Record) -> Result<(), AppError> {
        let json = serde_json::to_string(record)?;
        let tx = self.db.begin_write()?;
        {
            let mut table = tx.open_table(table_def(def))?;
            table.insert(id, json.as_str())?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, def: &CollectionDef, id: &str) -> Result<bool, AppError> {
        let tx = self.db.begin_write()?;
        let removed = {
            let mut table = tx.open_table(table_def(def))?;
            // Bound to a local so the guard returned by remove is dropped
            // before the table is.
            let existed = table.remove(id)?.is_some();
            existed
        };
        tx.commit()?;
        Ok(removed)
    }

    fn modify(
        &self,
        def: &CollectionDef,
        id: &str,
        apply: &mut dyn FnMut(&mut Record),
    ) -> Result<Option<Record>, AppError> {
        let tx = self.db.begin_write()?;
        let updated = {
            let mut table = tx.open_table(table_def(def))?;
            let current = match table.get(id)? {
                Some(guard) => Some(serde_json::from_str::<Record>(guard.value())?),
                None => None,
            };
            match current {
                Some(mut record) => {
                    apply(&mut record);
                    let json = serde_json::to_string(&record)?;
                    table.insert(id, json.as_str())?;
                    Some(record)
                }
                None => None,
            }
        };
        tx.commit()?;
        Ok(updated)
    }

    fn put_many(&self, def: &CollectionDef, batch: &[Record]) -> Result<(), AppError> {
        let tx = self.db.begin_write()?;
        {
            let mut table = tx.open_table(table_def(def))?;
            for record in batch {
                let id = crate::record::id_of(record)
                    .ok_or_else(|| AppError::BadRequest("record without id in batch".to_string()))?
                    .to_string();
                let json = serde_json::to_string(record)?;
                table.insert(id.as_str(), json.as_str())?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use serde_json::json;
    use std::env;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        env::temp_dir().join("haulbase").join("test").join(format!("{}_{}", name, rand::random::<u64>()))
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn it_should_roundtrip_records() {
        let store = RedbStore::open(&temp_dir("roundtrip")).unwrap();
        let def = registry::must("runs");
        let rec = record(json!({"id": "run_aaaaaaaaaa", "customer": "Acme", "rate": 120.5}));
        store.put(def, "run_aaaaaaaaaa", &rec).unwrap();

        assert_eq!(store.get(def, "run_aaaaaaaaaa").unwrap(), Some(rec.clone()));
        assert_eq!(store.all(def).unwrap(), vec![rec]);
        assert!(store.remove(def, "run_aaaaaaaaaa").unwrap());
        assert!(!store.remove(def, "run_aaaaaaaaaa").unwrap());
        assert!(store.all(def).unwrap().is_empty());
    }

    #[test]
    fn it_should_keep_collections_isolated() {
        let store = RedbStore::open(&temp_dir("isolated")).unwrap();
        let runs = registry::must("runs");
        let shifts = registry::must("shifts");
        store.put(runs, "run_bbbbbbbbbb", &record(json!({"id": "run_bbbbbbbbbb"}))).unwrap();
        assert!(store.all(shifts).unwrap().is_empty());
        assert_eq!(store.all(runs).unwrap().len(), 1);
    }

    #[test]
    fn it_should_apply_a_batch_in_one_transaction() {
        let store = RedbStore::open(&temp_dir("batch")).unwrap();
        let def = registry::must("customers_pa");
        let batch = vec![
            record(json!({"id": "cst_1", "name": "Acme"})),
            record(json!({"id": "cst_2", "name": "Globex"})),
        ];
        store.put_many(def, &batch).unwrap();
        assert_eq!(store.all(def).unwrap().len(), 2);
    }

    #[test]
    fn it_should_modify_in_place_and_report_missing_ids() {
        let store = RedbStore::open(&temp_dir("modify")).unwrap();
        let def = registry::must("drivers");
        store.put(def, "drv_eeeeeeeeee", &record(json!({"id": "drv_eeeeeeeeee", "name": "Evan"}))).unwrap();

        let updated = store
            .modify(def, "drv_eeeeeeeeee", &mut |r| {
                r.insert("phone".to_string(), json!("555-2222"));
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.get("phone"), Some(&json!("555-2222")));
        assert_eq!(store.get(def, "drv_eeeeeeeeee").unwrap(), Some(updated));

        assert!(store.modify(def, "drv_missing123", &mut |_| {}).unwrap().is_none());
    }

    #[test]
    fn it_should_persist_across_reopen() {
        let dir = temp_dir("reopen");
        let def = registry::must("drivers");
        {
            let store = RedbStore::open(&dir).unwrap();
            store.put(def, "drv_cccccccccc", &record(json!({"id": "drv_cccccccccc", "name": "Cara"}))).unwrap();
        }
        let reopened = RedbStore::open(&dir).unwrap();
        assert_eq!(reopened.all(def).unwrap().len(), 1);
    }
}
