pub mod copy;
pub mod local;
pub mod types;

pub use copy::{copy_file_atomic, copy_file_atomic_async};
pub use local::LocalFs;
pub use types::*;
