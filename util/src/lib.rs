#![deny(missing_docs)]
//! Small, dependency-light utilities shared across the `sipscope` workspace:
//! a cheaply-clonable reference-counted string and a byte scanner used by
//! the wire-format parsers (SIP, SDP, HEP).

mod arcstr;
mod scanner;

pub use arcstr::*;
pub use scanner::*;
