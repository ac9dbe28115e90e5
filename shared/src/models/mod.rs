//! Domain models for the Inventaris platform

mod item;
mod ledger;
mod transfer;

pub use item::*;
pub use ledger::*;
pub use transfer::*;
