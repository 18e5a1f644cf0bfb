//! Core business logic abstractions

pub mod aum;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod flow;
pub mod ledger;
pub mod log;
pub mod price;

// Re-export main types for cleaner imports
pub use aum::{AumError, AumSnapshot, AumSource};
pub use flow::{FlowError, FlowLedger, FlowRecord, QuarterEstimate};
pub use ledger::{Keyed, Ledger, LedgerBackend};
pub use price::{PriceFeed, PriceObservation, PriceSeriesStore};
