//! # Repository Layer
//!
//! One module per aggregate. Pool-holding structs serve reads and
//! standalone writes; `*_tx` free functions serve the coordinator's
//! transaction.

pub mod batch;
pub mod invoice;
pub mod ledger;
pub mod product;
pub mod queue;
pub mod sale;
pub mod service;
