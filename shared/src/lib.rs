//! Shared types and domain rules for the Inventaris platform
//!
//! This crate holds everything that must behave identically on the server and
//! in the browser (via WASM): the inventory models, the stock ledger
//! projection, the transfer state machine and the profit-sharing calculator.

pub mod error;
pub mod ledger;
pub mod models;
pub mod profit;
pub mod transfer;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
