//! DynamoDB storage backend.
//!
//! Single-table layout: every entity lives in one table, keyed by composite
//! `pk`/`sk` with four secondary indexes for the type and owner lookups.

mod conversions;
mod error;
pub mod keys;
mod repository;

pub use repository::DynamoDbRepository;
