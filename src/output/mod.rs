//! Output framing for debugger processes
//!
//! - `matcher` - Boundary classification of accumulated output
//! - `decode` - Incremental UTF-8 decoding of raw pipe chunks

mod decode;
mod matcher;

pub use decode::Utf8Decoder;
pub use matcher::{Boundary, BoundaryMatcher};
