//! DMX512 output

pub mod universe;

pub use universe::{DmxError, DmxUniverse, DMX_SLOTS};
