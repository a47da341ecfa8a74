//! Data sources and their samples.

mod csv;
mod sample;
mod source;
mod utils;
mod voc;

pub use self::csv::*;
pub use sample::*;
pub use source::*;
pub use utils::*;
pub use voc::*;
