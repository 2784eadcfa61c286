// Heap files and their scans.

pub mod error;
pub mod heap_file;
pub mod iterator;

pub use error::HeapFileError;
pub use heap_file::HeapFile;
pub use iterator::HeapFileIterator;
