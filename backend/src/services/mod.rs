//! Business logic services for the Inventaris platform

pub mod destinations;
pub mod items;
pub mod ledger;
pub mod transfers;


pub use destinations::DestinationService;
pub use items::ItemService;
pub use ledger::LedgerService;
pub use transfers::TransferService;
