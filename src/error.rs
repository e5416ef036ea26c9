//! Error management.

use crate::types::VId;
use derive_more::Display;

#[derive(Debug, Display, PartialEq)]
pub enum Error {
    #[display(fmt = "input vertex pairs are not sorted")]
    UnsortedPairs,
    #[display(fmt = "{} input vertex pairs are not owned by the calling processes", _0)]
    InvalidVertexPairs(usize),
    #[display(fmt = "unimplemented: {}", _0)]
    Unimplemented(&'static str),
    #[display(fmt = "failed to allocate {} elements", _0)]
    AllocationFailed(usize),
    #[display(fmt = "mismatched collective call on rank {}", _0)]
    CollectiveMismatch(usize),
    #[display(fmt = "invalid process grid {}x{}", _0, _1)]
    InvalidGrid(usize, usize),
    #[display(fmt = "vertex {} is out of range", _0)]
    InvalidVertex(VId),
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Allocates a vector of `len` copies of `value`, reporting exhaustion instead of aborting.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut buf = try_with_capacity(len)?;
    buf.resize(len, value);
    Ok(buf)
}

/// An empty vector able to hold `len` elements without reallocating.
pub(crate) fn try_with_capacity<T>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailed(len))?;
    Ok(buf)
}
