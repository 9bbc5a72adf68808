//! Core domain types and storage abstractions for the ledgerdesk portal.
//!
//! This crate is backend-agnostic: it defines the entities stored in the
//! single keyed table (inquiries, ledgers, the service master), the
//! repository and blob-store traits that backends implement, and the error
//! taxonomy shared by all of them. It has no HTTP or AWS dependencies.

pub mod batch;
pub mod blob;
pub mod identity;
pub mod inquiry;
pub mod ledger;
pub mod service;
pub mod storage;
