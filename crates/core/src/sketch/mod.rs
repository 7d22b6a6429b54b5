//! The Sketch text format.

mod lexer;
mod parser;
mod writer;

pub use parser::parse;
pub use writer::{WriterOptions, write};
