//! Profile storage adapters.

mod file_profile_storage;
mod in_memory_profile_storage;

pub use file_profile_storage::FileProfileStorage;
pub use in_memory_profile_storage::InMemoryProfileStorage;
