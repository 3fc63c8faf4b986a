mod account;
mod audit;
mod entry;
mod money;
mod order;
mod ports;
mod product;

pub use account::*;
pub use audit::*;
pub use entry::*;
pub use money::*;
pub use order::*;
pub use ports::*;
pub use product::*;
