//! HTTP handlers for the Inventaris API

mod destinations;
mod health;
mod items;
mod ledger;
mod profit;
mod transfers;

pub use destinations::*;
pub use health::*;
pub use items::*;
pub use ledger::*;
pub use profit::*;
pub use transfers::*;
