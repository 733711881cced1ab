//! # Rowtruth Testkit
//!
//! Test utilities for Rowtruth: schema and change-set builders that mirror
//! the repository layer's writer flow, and an in-memory replica for driving
//! reconciliation passes end to end.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builders;
mod replica;

pub use builders::{append_insert_rows, column_ids, make_insert_rows, one_of_each_type};
pub use replica::InMemoryReplica;
