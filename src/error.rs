//! Error types for allocating map operations.

use allocated::AllocErrorWithLayout;
use thiserror::Error;

/// Result type alias used by every map operation that may allocate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Failure of an operation that needed more memory.
///
/// Absence of a key is never reported through this type; lookups return
/// [`end()`](crate::RbTreeMap::end), `None` or a zero count instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// More elements were requested than the map can address.
    #[error("capacity overflow: a map of this element type holds at most {max} elements")]
    CapacityOverflow {
        /// The value of `max_size()` for the map that overflowed.
        max: usize,
    },

    /// The allocator refused the request.
    #[error("{0}")]
    AllocError(AllocErrorWithLayout),
}

impl Error {
    /// Diverges through the global allocation error handler, or panics on
    /// capacity overflow.
    #[track_caller]
    pub fn handle_alloc_error(self) -> ! {
        match self {
            Self::AllocError(e) => e.handle_alloc_error(),
            Self::CapacityOverflow { max } => {
                panic!("capacity overflow: cannot hold more than {max} elements")
            }
        }
    }
}

impl From<AllocErrorWithLayout> for Error {
    fn from(e: AllocErrorWithLayout) -> Self {
        Self::AllocError(e)
    }
}
