// Concrete implementations of the domain ports: the catalog-backed and
// in-memory inventories, and the HTTP and null analytics sinks.

mod analytics;
mod inventory;

pub use analytics::*;
pub use inventory::*;
