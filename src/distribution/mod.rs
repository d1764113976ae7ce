//! Proportional distribution
//!
//! - [`split`]: pure integer split of a balance across the recipient table
//! - [`orchestrator`]: submits and tracks the custodial contract's
//!   distribution transactions

pub mod orchestrator;
pub mod split;

pub use orchestrator::{BatchReport, Distributor};
pub use split::{apply_remainder_policy, compute_split, RemainderPolicy, ShareTable};
