mod extendible;

pub use extendible::{ExtendibleHashTable, MAX_GLOBAL_DEPTH};
