//! Collectrank: debt-collection prioritization library
//!
//! Reconciles and cleans monthly debt-portfolio extracts, then ranks debtors
//! by predicted payment probability and flags records whose feature profile
//! looks anomalous.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
