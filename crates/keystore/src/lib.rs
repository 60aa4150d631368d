//! Credential stores.
//!
//! The trading adapter only reads keys; `configure_api_keys` writes them.

pub mod file;
pub mod memory;

pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;
