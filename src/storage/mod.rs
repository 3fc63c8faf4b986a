mod repository;

pub use repository::*;

/// SQL migration for accounts and the entry log
pub const MIGRATION_001_LEDGER: &str = include_str!("migrations/001_ledger.sql");

/// SQL migration for orders
pub const MIGRATION_002_ORDERS: &str = include_str!("migrations/002_orders.sql");

/// SQL migration for the product catalog
pub const MIGRATION_003_PRODUCTS: &str = include_str!("migrations/003_products.sql");
