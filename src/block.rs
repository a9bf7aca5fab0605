use crate::consts::{HEADER_SIZE, MAGIC, NO_LINK};
use crate::error::HeapError;

/// Allocation state of a block
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// The block is in the free list and available for allocation
    Free,
    /// The block is handed out; its free-list links are stale and unused
    Allocated,
}

/// Decoded form of the 16-byte header prefixed to every block
///
/// The encoded layout is four little-endian `u32` words: a tag word (magic in
/// the upper half, status in the lower), the payload size, and the prev/next
/// free-list links. Links are only meaningful while the block is `Free`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct BlockHeader {
    pub status: Status,
    pub size: u32,
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

impl BlockHeader {
    /* Constructors */
    pub fn new_free(size: u32) -> Self {
        BlockHeader {
            status: Status::Free,
            size,
            prev: None,
            next: None,
        }
    }

    /// Decodes the header stored at `offset`
    ///
    /// Validates that the header lies within the arena, carries the magic tag,
    /// has a well-formed status and that its payload does not overrun the
    /// arena. Everything else (notably link sanity) is the caller's invariant.
    pub fn read(arena: &[u8], offset: u32) -> Result<Self, HeapError> {
        let bytes = header_bytes(arena, offset)?;

        let tag = word(bytes, 0);
        if tag >> 16 != MAGIC {
            return Err(HeapError::InvalidOffset { offset });
        }
        let status = match tag & 0xFFFF {
            0 => Status::Allocated,
            1 => Status::Free,
            _ => return Err(HeapError::InvalidOffset { offset }),
        };

        let size = word(bytes, 1);
        let end = (offset + HEADER_SIZE).checked_add(size);
        if end.is_none() || end > Some(arena.len() as u32) {
            return Err(HeapError::InvalidOffset { offset });
        }

        Ok(BlockHeader {
            status,
            size,
            prev: decode_link(word(bytes, 2)),
            next: decode_link(word(bytes, 3)),
        })
    }

    /// Encodes this header at `offset`, overwriting whatever was there
    pub fn write(&self, arena: &mut [u8], offset: u32) -> Result<(), HeapError> {
        debug_assert!(offset + HEADER_SIZE + self.size <= arena.len() as u32);

        let bytes = header_bytes_mut(arena, offset)?;
        let status = match self.status {
            Status::Allocated => 0,
            Status::Free => 1,
        };

        put_word(bytes, 0, MAGIC << 16 | status);
        put_word(bytes, 1, self.size);
        put_word(bytes, 2, encode_link(self.prev));
        put_word(bytes, 3, encode_link(self.next));

        Ok(())
    }

    /* Miscellaneous */
    /// Total bytes this block occupies in the arena, header included
    pub fn span(&self) -> u32 {
        HEADER_SIZE + self.size
    }
}

/// Erases the tag word of a header absorbed by coalescing
///
/// A later release of the absorbed block then fails validation instead of
/// finding a stale header inside another block's payload.
pub(crate) fn scrub(arena: &mut [u8], offset: u32) -> Result<(), HeapError> {
    let bytes = header_bytes_mut(arena, offset)?;
    bytes[..4].fill(0);
    Ok(())
}

/// Offset of a block's payload, given its header offset
pub(crate) fn payload_offset(header: u32) -> u32 {
    header + HEADER_SIZE
}

/// Offset of a block's header, given its payload offset
pub(crate) fn header_offset(payload: u32) -> Option<u32> {
    payload.checked_sub(HEADER_SIZE)
}

fn header_bytes(arena: &[u8], offset: u32) -> Result<&[u8; HEADER_SIZE as usize], HeapError> {
    let start = offset as usize;
    start
        .checked_add(HEADER_SIZE as usize)
        .and_then(|end| arena.get(start..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(HeapError::InvalidOffset { offset })
}

fn header_bytes_mut(
    arena: &mut [u8],
    offset: u32,
) -> Result<&mut [u8; HEADER_SIZE as usize], HeapError> {
    let start = offset as usize;
    start
        .checked_add(HEADER_SIZE as usize)
        .and_then(|end| arena.get_mut(start..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(HeapError::InvalidOffset { offset })
}

fn word(bytes: &[u8; HEADER_SIZE as usize], i: usize) -> u32 {
    let at = 4 * i;
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn put_word(bytes: &mut [u8; HEADER_SIZE as usize], i: usize, value: u32) {
    bytes[4 * i..4 * i + 4].copy_from_slice(&value.to_le_bytes());
}

fn decode_link(raw: u32) -> Option<u32> {
    if raw == NO_LINK {
        None
    } else {
        Some(raw)
    }
}

fn encode_link(link: Option<u32>) -> u32 {
    link.unwrap_or(NO_LINK)
}
