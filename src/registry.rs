//! Static registry of the collections the backend serves. Each entry fixes the
//! storage name, the generated-id prefix, the writable field allow-list and the
//! narrow per-collection normalization rules (aliases and defaults).

/// Shape contract for one collection. All fields are static configuration,
/// consulted on every CRUD operation and never mutated at runtime.
pub struct CollectionDef {
    /// Logical key, also the `/api/<key>` route segment.
    pub key: &'static str,
    /// Storage name: top-level array in the JSON document, table name in redb.
    pub name: &'static str,
    /// Prefix of generated primary keys, e.g. `drv` -> `drv_x7k29qp0a1`.
    pub prefix: &'static str,
    /// Payload keys not listed here are silently dropped on write.
    pub allowed: &'static [&'static str],
    /// `(incoming, canonical)` renames, applied only when the canonical field
    /// was not supplied itself.
    pub aliases: &'static [(&'static str, &'static str)],
    /// `(field, value)` fills for missing/blank fields.
    pub defaults: &'static [(&'static str, &'static str)],
    /// Field stamped once at creation and immutable afterwards.
    pub created_field: &'static str,
}

pub const COLLECTIONS: &[CollectionDef] = &[
    CollectionDef {
        key: "drivers",
        name: "drivers",
        prefix: "drv",
        allowed: &["name", "phone", "email", "state", "license_number", "truck", "pay_rate", "notes"],
        aliases: &[],
        defaults: &[],
        created_field: "created_date",
    },
    CollectionDef {
        key: "shifts",
        name: "shifts",
        prefix: "shf",
        allowed: &["driver_name", "shift_date", "clock_in", "clock_out", "status", "notes"],
        aliases: &[("date", "shift_date")],
        defaults: &[("status", "active")],
        created_field: "created_date",
    },
    CollectionDef {
        key: "runs",
        name: "runs",
        prefix: "run",
        allowed: &[
            "run_date",
            "driver_name",
            "customer",
            "pickup_location",
            "dropoff_location",
            "load_type",
            "rate",
            "miles",
            "fuel_gallons",
            "fuel_cost",
            "status",
            "notes",
        ],
        aliases: &[("date", "run_date")],
        defaults: &[],
        created_field: "created_date",
    },
    CollectionDef {
        key: "schedules",
        name: "schedules",
        prefix: "sch",
        allowed: &["date", "driver_name", "shift_start", "shift_end", "notes"],
        aliases: &[],
        defaults: &[],
        created_field: "created_date",
    },
    CollectionDef {
        key: "customLoadTypes",
        name: "customLoadTypes",
        prefix: "clt",
        allowed: &["name", "rate", "description"],
        aliases: &[],
        defaults: &[],
        created_field: "created_date",
    },
    CollectionDef {
        key: "customers_il",
        name: "customers_il",
        prefix: "cst",
        allowed: &["name", "address", "city", "state", "zip", "phone", "contact", "email", "pricing", "notes"],
        aliases: &[],
        defaults: &[],
        created_field: "created_date",
    },
    CollectionDef {
        key: "customers_pa",
        name: "customers_pa",
        prefix: "cst",
        allowed: &["name", "address", "city", "state", "zip", "phone", "contact", "email", "pricing", "notes"],
        aliases: &[],
        defaults: &[],
        created_field: "created_date",
    },
    CollectionDef {
        key: "fuelLogs",
        name: "fuelLogs",
        prefix: "ful",
        allowed: &["driver_name", "date", "gallons", "price_per_gallon", "total", "odometer", "location", "notes"],
        aliases: &[],
        defaults: &[],
        created_field: "created_date",
    },
    CollectionDef {
        key: "invoices",
        name: "invoices",
        prefix: "inv",
        allowed: &["customer", "invoice_date", "due_date", "line_items", "subtotal", "total", "status", "notes"],
        aliases: &[],
        defaults: &[],
        created_field: "created_date",
    },
];

/// Fallible lookup for client-supplied collection names.
pub fn find(key: &str) -> Option<&'static CollectionDef> {
    COLLECTIONS.iter().find(|def| def.key == key)
}

/// Lookup for internal callers. An unregistered key is a configuration error,
/// not a runtime condition.
pub fn must(key: &str) -> &'static CollectionDef {
    match find(key) {
        Some(def) => def,
        None => panic!("collection {} is not registered", key),
    }
}
