pub mod fs;

pub use fs::{find_files, join_paths};
