//! `watchclub-storage`: the persistence contract and its two backends.
//!
//! | Backend          | Lifetime        | Concurrency                         |
//! |------------------|-----------------|-------------------------------------|
//! | [`MemoryStorage`] | process         | one `RwLock` over every entity map  |
//! | [`SqliteStorage`] | file on disk    | one connection behind a `Mutex`     |
//!
//! Pick a backend at startup with [`open_storage`].

pub mod codec;
pub mod db;
pub mod error;
pub mod factory;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::{Result, StorageError};
pub use factory::open_storage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use store::Storage;
