//! Designspace XML reading and writing.

mod reader;
mod tree;
mod writer;

pub use reader::read;
pub use writer::write;
