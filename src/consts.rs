/// Default arena capacity in bytes, used by [`Heap::new`](crate::Heap::new)
pub const DEFAULT_CAPACITY: u32 = 1024;

/// Encoded size of a block header in bytes
///
/// Four little-endian `u32` words: tag, payload size, prev link, next link. A
/// block's payload `size` never includes its own header.
pub const HEADER_SIZE: u32 = 16;

/// Minimum leftover payload (in bytes) worth splitting off into a new free block
///
/// If granting a request out of a free block would leave fewer than this many
/// usable bytes behind, the whole block is granted instead and no remainder
/// block is created.
pub const SPLIT_THRESHOLD: u32 = 5;

// Upper half of the tag word. Every live header carries it; release rejects
// offsets whose tag doesn't match.
pub(crate) const MAGIC: u32 = 0xB10C;

// Encoded form of an absent free-list link
pub(crate) const NO_LINK: u32 = u32::MAX;

const _: () = assert!(DEFAULT_CAPACITY > HEADER_SIZE);
