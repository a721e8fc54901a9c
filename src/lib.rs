//! Parallel graph and sparse-matrix ingestion.
//!
//! Reads edge lists, MatrixMarket files and the native binary format into
//! in-memory COO structures through a memory-mapped two-pass parallel
//! parser, and writes them back as binary, delimited text or split CSV.

mod shared_slice;

#[cfg(test)]
pub(crate) mod test_common;

pub mod coo;
pub mod cursor;
pub mod error;
pub mod mapped_file;
pub mod partition;
pub mod scalar;
pub mod utils;

pub use coo::{Coo, CooFlags, CsrView};
pub use error::{Error, Result};
pub use mapped_file::{FileFormat, MappedFile};
