//! Sales domain: point-of-sale records with revenue attribution.

pub mod sale;

pub use sale::{RecordSale, Sale, SaleCommand, SaleEvent, SaleView};
