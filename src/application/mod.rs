mod error;
mod ledger;
mod services;
mod settlement;
mod transfers;

pub use error::*;
pub use ledger::*;
pub use services::*;
pub use settlement::*;
pub use transfers::*;
