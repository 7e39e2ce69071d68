pub mod file_store;
pub mod memory_store;
pub mod partition_file;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use partition_file::PartitionFile;
