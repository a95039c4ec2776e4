//! Archive path resolution.

mod resolver;

pub use resolver::{PathResolver, relative_archive_path};
