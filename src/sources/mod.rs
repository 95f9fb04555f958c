//! Unit sources.
//!
//! Sources are responsible for producing the text of description units
//! (from disk or from memory) and for parsing it into the generic tree the
//! loader works on.

pub mod format;
pub mod memory;
pub mod path;
pub mod source;

pub use format::{RawMap, UnitFormat};
pub use memory::MemorySource;
pub use path::FsSource;
pub use source::UnitSource;
