//! DSSketch command line library.

pub mod cli;
pub mod convert;
pub mod io;
pub mod labels;
pub mod parallel;
