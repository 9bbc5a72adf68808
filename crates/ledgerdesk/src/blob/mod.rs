//! Blob-store backends for uploads and service-master spreadsheets.

#[cfg(feature = "s3")]
pub mod s3;

#[cfg(any(feature = "memblob", test))]
pub mod inmemory;
