//! haulbase is the REST backend of a small-business fleet/logistics app:
//! driver shifts, dispatch runs, fuel logs, customer directories, pricing and
//! invoicing. Records are untyped JSON bags scoped per collection; a static
//! registry fixes each collection's allow-list and normalization rules, and a
//! single generic CRUD/query component serves them all over either a JSON
//! document on disk or redb tables.

pub mod entities;
pub mod error;
pub mod logger;
pub mod query;
pub mod record;
pub mod registry;
pub mod rest;
pub mod routes;
pub mod settings;
pub mod storage;

pub use entities::Entities;
pub use error::AppError;
pub use record::Record;
pub use rest::{build_router, serve, AppJson, ErrorBody, RequestState};
pub use settings::{AppConfig, HttpSettings, StoreBackend, StoreSettings};
pub use storage::Store;
