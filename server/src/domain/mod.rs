//! Domain logic
//!
//! - `facts` - Validation, query building and result materialization for fact analytics

pub mod facts;

pub use facts::FactsService;
