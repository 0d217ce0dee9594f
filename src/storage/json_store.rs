use crate::record::{id_of, Record};
use crate::registry::{CollectionDef, COLLECTIONS};
use crate::storage::Store;
use crate::AppError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One JSON document on disk with a top-level array per collection. The whole
/// document lives in memory behind a mutex; writers hold the lock across the
/// mutation and the save, so overlapping writes cannot lose updates.
pub struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

type Document = BTreeMap<String, Vec<Record>>;

impl JsonFileStore {
    /// Opens the document at `path`, creating it (and any missing collection
    /// arrays) when absent.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let mut doc: Document = if path.exists() {
            crate::info!("Opening data file at {:?}", path);
            serde_json::from_slice(&fs::read(path)?)?
        } else {
            crate::info!("Creating new data file at {:?}", path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            Document::new()
        };
        for def in COLLECTIONS {
            doc.entry(def.name.to_string()).or_default();
        }
        let store = Self { path: path.to_path_buf(), doc: Mutex::new(doc) };
        {
            let guard = store.doc.lock()?;
            store.save(&guard)?;
        }
        Ok(store)
    }

    /// Serializes the full document to a sibling temp file and renames it over
    /// the target, so readers never observe a torn write.
    fn save(&self, doc: &Document) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn all(&self, def: &CollectionDef) -> Result<Vec<Record>, AppError> {
        let doc = self.doc.lock()?;
        Ok(doc.get(def.name).cloned().unwrap_or_default())
    }

    fn get(&self, def: &CollectionDef, id: &str) -> Result<Option<Record>, AppError> {
        let doc = self.doc.lock()?;
        let records = doc.get(def.name);
        Ok(records.and_then(|rs| rs.iter().find(|r| id_of(r) == Some(id)).cloned()))
    }

    fn put(&self, def: &CollectionDef, id: &str, record: &Record) -> Result<(), AppError> {
        let mut doc = self.doc.lock()?;
        let records = doc.entry(def.name.to_string()).or_default();
        match records.iter_mut().find(|r| id_of(r) == Some(id)) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.save(&doc)
    }

    fn remove(&self, def: &CollectionDef, id: &str) -> Result<bool, AppError> {
        let mut doc = self.doc.lock()?;
        let records = doc.entry(def.name.to_string()).or_default();
        let before = records.len();
        records.retain(|r| id_of(r) != Some(id));
        let removed = records.len() != before;
        if removed {
            self.save(&doc)?;
        }
        Ok(removed)
    }

    fn modify(
        &self,
        def: &CollectionDef,
        id: &str,
        apply: &mut dyn FnMut(&mut Record),
    ) -> Result<Option<Record>, AppError> {
        let mut doc = self.doc.lock()?;
        let records = doc.entry(def.name.to_string()).or_default();
        let updated = match records.iter_mut().find(|r| id_of(r) == Some(id)) {
            Some(existing) => {
                apply(existing);
                existing.clone()
            }
            None => return Ok(None),
        };
        self.save(&doc)?;
        Ok(Some(updated))
    }

    fn put_many(&self, def: &CollectionDef, batch: &[Record]) -> Result<(), AppError> {
        let mut doc = self.doc.lock()?;
        let records = doc.entry(def.name.to_string()).or_default();
        for record in batch {
            let id = id_of(record).ok_or_else(|| AppError::BadRequest("record without id in batch".to_string()))?;
            match records.iter_mut().find(|r| id_of(r) == Some(id)) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
        }
        self.save(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use serde_json::json;
    use std::env;

    fn temp_path(name: &str) -> PathBuf {
        let dir = env::temp_dir().join("haulbase").join("test");
        fs::create_dir_all(&dir).unwrap();
        dir.join(format!("{}_{}.json", name, rand::random::<u64>()))
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn it_should_roundtrip_records() {
        let store = JsonFileStore::open(&temp_path("roundtrip")).unwrap();
        let def = registry::must("drivers");
        let rec = record(json!({"id": "drv_aaaaaaaaaa", "name": "Alice"}));
        store.put(def, "drv_aaaaaaaaaa", &rec).unwrap();

        assert_eq!(store.get(def, "drv_aaaaaaaaaa").unwrap(), Some(rec.clone()));
        assert_eq!(store.all(def).unwrap(), vec![rec]);
        assert!(store.remove(def, "drv_aaaaaaaaaa").unwrap());
        assert!(!store.remove(def, "drv_aaaaaaaaaa").unwrap());
        assert!(store.all(def).unwrap().is_empty());
    }

    #[test]
    fn it_should_persist_across_reopen() {
        let path = temp_path("reopen");
        let def = registry::must("drivers");
        {
            let store = JsonFileStore::open(&path).unwrap();
            store.put(def, "drv_bbbbbbbbbb", &record(json!({"id": "drv_bbbbbbbbbb", "name": "Bob"}))).unwrap();
        }
        let reopened = JsonFileStore::open(&path).unwrap();
        let all = reopened.all(def).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get("name"), Some(&json!("Bob")));
    }

    #[test]
    fn it_should_initialize_every_collection_array() {
        let store = JsonFileStore::open(&temp_path("init")).unwrap();
        for def in COLLECTIONS {
            assert!(store.all(def).unwrap().is_empty());
        }
    }

    #[test]
    fn it_should_replace_on_put_with_existing_id() {
        let store = JsonFileStore::open(&temp_path("replace")).unwrap();
        let def = registry::must("drivers");
        store.put(def, "drv_cccccccccc", &record(json!({"id": "drv_cccccccccc", "name": "Carl"}))).unwrap();
        store.put(def, "drv_cccccccccc", &record(json!({"id": "drv_cccccccccc", "name": "Carol"}))).unwrap();
        let all = store.all(def).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get("name"), Some(&json!("Carol")));
    }

    #[test]
    fn it_should_modify_in_place_and_report_missing_ids() {
        let store = JsonFileStore::open(&temp_path("modify")).unwrap();
        let def = registry::must("drivers");
        store.put(def, "drv_dddddddddd", &record(json!({"id": "drv_dddddddddd", "name": "Dana"}))).unwrap();

        let updated = store
            .modify(def, "drv_dddddddddd", &mut |r| {
                r.insert("phone".to_string(), json!("555-1111"));
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.get("phone"), Some(&json!("555-1111")));
        assert_eq!(store.get(def, "drv_dddddddddd").unwrap(), Some(updated));

        assert!(store.modify(def, "drv_missing123", &mut |_| {}).unwrap().is_none());
    }

    #[test]
    fn it_should_upsert_batches_in_one_save() {
        let store = JsonFileStore::open(&temp_path("batch")).unwrap();
        let def = registry::must("customers_il");
        let batch = vec![
            record(json!({"id": "cst_1", "name": "Acme"})),
            record(json!({"id": "cst_2", "name": "Globex"})),
        ];
        store.put_many(def, &batch).unwrap();
        assert_eq!(store.all(def).unwrap().len(), 2);
    }
}
