use thiserror::Error;

/// Failures reported by [`Heap`](crate::Heap) operations
///
/// All failures are local: the arena is left exactly as it was before the
/// failing call.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum HeapError {
    /// The request, header included, can never fit in the arena
    ///
    /// Raised when `requested + HEADER_SIZE >= capacity` (or the addition
    /// overflows), before any free-list search takes place.
    #[error("requested {requested} bytes plus header overhead exceeds arena capacity {capacity}")]
    CapacityExceeded {
        /// Requested payload size in bytes
        requested: u32,
        /// Total arena capacity in bytes
        capacity: u32,
    },

    /// No single free block is currently large enough for the request
    #[error("no free block can hold {requested} bytes")]
    OutOfMemory {
        /// Requested payload size in bytes
        requested: u32,
    },

    /// The offset does not point at the payload of a live block
    ///
    /// Covers offsets outside the arena, offsets into the middle of a block,
    /// and blocks whose header was absorbed by coalescing.
    #[error("offset {offset} does not point at a live allocation")]
    InvalidOffset {
        /// The payload offset passed by the caller
        offset: u32,
    },

    /// The block at this offset is already free (double release)
    #[error("block at offset {offset} is already free")]
    AlreadyFree {
        /// The payload offset passed by the caller
        offset: u32,
    },
}
