use crate::record::{id_of, Record};
use crate::registry::CollectionDef;
use crate::settings::{StoreBackend, StoreSettings};
use crate::AppError;
use std::path::Path;
use std::sync::Arc;
use std::{env, fs};

pub mod json_store;
pub mod redb_store;

pub use json_store::JsonFileStore;
pub use redb_store::RedbStore;

/// Durable storage of records, one implementation per deployment variant.
/// Every mutation persists before returning; a failed write surfaces as an
/// error and leaves no partial state behind beyond what the medium allows.
pub trait Store: Send + Sync {
    /// Snapshot of the whole collection. Callers own the Vec; mutating it
    /// never touches stored state.
    fn all(&self, def: &CollectionDef) -> Result<Vec<Record>, AppError>;

    fn get(&self, def: &CollectionDef, id: &str) -> Result<Option<Record>, AppError>;

    /// Inserts or replaces the record under `id` and persists.
    fn put(&self, def: &CollectionDef, id: &str, record: &Record) -> Result<(), AppError>;

    /// Removes the record, persisting the change. Returns whether it existed.
    fn remove(&self, def: &CollectionDef, id: &str) -> Result<bool, AppError>;

    /// Atomic read-modify-write: `apply` runs on the stored record while the
    /// backend holds its write exclusivity (document lock, write transaction),
    /// so two overlapping modifications cannot lose each other's fields.
    /// Returns the updated record, or None when the id is absent.
    fn modify(&self, def: &CollectionDef, id: &str, apply: &mut dyn FnMut(&mut Record))
        -> Result<Option<Record>, AppError>;

    /// Batch insert-or-replace. Implementations persist the batch with the
    /// atomicity their medium natively provides; there is no compensation.
    fn put_many(&self, def: &CollectionDef, records: &[Record]) -> Result<(), AppError> {
        for record in records {
            let id = id_of(record).ok_or_else(|| AppError::BadRequest("record without id in batch".to_string()))?;
            self.put(def, id, record)?;
        }
        Ok(())
    }
}

/// Opens the store selected by configuration.
pub fn open(settings: &StoreSettings) -> Result<Arc<dyn Store>, AppError> {
    match settings.backend {
        StoreBackend::Json => Ok(Arc::new(JsonFileStore::open(Path::new(&settings.data_file))?)),
        StoreBackend::Redb => Ok(Arc::new(RedbStore::open(Path::new(&settings.db_dir))?)),
    }
}

/// Fresh file-backed store under the system temp dir, for tests.
pub fn temp_json(name: &str) -> Arc<dyn Store> {
    let dir = env::temp_dir().join("haulbase").join("test");
    if !dir.exists() {
        fs::create_dir_all(dir.clone()).expect("Failed to create test dir");
    }
    let path = dir.join(format!("{}_{}.json", name, rand::random::<u64>()));
    Arc::new(JsonFileStore::open(&path).expect("Failed to create test json store"))
}

/// Fresh redb-backed store under the system temp dir, for tests.
pub fn temp_redb(name: &str) -> Arc<dyn Store> {
    let dir = env::temp_dir().join("haulbase").join("test").join(format!("{}_{}", name, rand::random::<u64>()));
    Arc::new(RedbStore::open(&dir).expect("Failed to create test redb store"))
}
