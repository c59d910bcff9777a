mod file;
mod in_memory;

pub use file::FileBackend;
pub use in_memory::InMemoryBackend;
