//! In-memory storage backend (for testing and local development).

mod repository;

pub use repository::InMemoryRepository;
