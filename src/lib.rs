//! A first-fit free-list allocator over a fixed-capacity arena
//!
//! This crate simulates dynamic memory allocation inside one fixed-size byte
//! buffer. Every region of the arena, allocated or free, is prefixed with a
//! 16-byte header; the free regions are additionally threaded into an
//! address-ordered doubly linked list. Allocation is a linear first-fit scan
//! of that list with split-on-allocate, and release reinserts the block in
//! address order and coalesces it with physically adjacent free neighbors.
//!
//! The allocator never hands out pointers. Blocks are identified by `u32`
//! byte offsets into the arena, and every header access decodes the bytes at
//! a bounds-checked offset, so the whole crate is safe code and a bad offset
//! is a reported error instead of undefined behavior.
//!
//! # Example
//!
//! ```
//! use firstfit::Heap;
//!
//! let mut heap = Heap::new();
//!
//! let a = heap.allocate(24)?;
//! let b = heap.allocate(100)?;
//!
//! heap.payload_mut(a)?.fill(0xAB);
//!
//! heap.release(a)?;
//! heap.release(b)?;
//!
//! // everything was reclaimed and coalesced back into a single free block
//! assert_eq!(heap.free_blocks().count(), 1);
//! # Ok::<(), firstfit::HeapError>(())
//! ```
//!
//! # Limitations
//!
//! - There is no registry of live allocations: an allocated block is only
//!   reachable through the payload offset handed to the caller, and the
//!   inspector ([`Heap::free_blocks`], [`Heap::dump`]) enumerates free blocks
//!   only.
//! - The arena never grows, and the only alignment guarantee is the header
//!   size itself.
//! - `Heap` is a plain owned value; share it behind a lock if you need
//!   concurrent callers.

#![deny(missing_docs)]

use core::fmt;

use tracing::{debug, trace};

use crate::block::BlockHeader;

mod block;
mod consts;
mod error;
mod free_list;

pub use crate::block::Status;
pub use crate::consts::{DEFAULT_CAPACITY, HEADER_SIZE, SPLIT_THRESHOLD};
pub use crate::error::HeapError;
pub use crate::free_list::{FreeBlockInfo, FreeBlocks};

/// A fixed-capacity arena with first-fit allocation over a free-block list
///
/// All allocator state lives in this value: the backing bytes, the free-list
/// anchor and the lazy-initialization flag. Dropping the `Heap` drops every
/// allocation with it.
pub struct Heap {
    pub(crate) arena: Box<[u8]>,
    /// Header offset of the lowest-addressed free block
    pub(crate) head: Option<u32>,
    initialized: bool,
}

impl Heap {
    /* Constructors */
    /// Constructs a heap with [`DEFAULT_CAPACITY`] bytes of backing storage
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Constructs a heap backed by `capacity` bytes
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not larger than [`HEADER_SIZE`]; such an arena
    /// could not hold a single block.
    pub fn with_capacity(capacity: u32) -> Self {
        assert!(
            capacity > HEADER_SIZE,
            "capacity must exceed the {HEADER_SIZE}-byte block header"
        );

        Heap {
            arena: vec![0; capacity as usize].into_boxed_slice(),
            head: None,
            initialized: false,
        }
    }

    /* Public API */
    /// Total capacity of the arena in bytes, headers included
    pub fn capacity(&self) -> u32 {
        self.arena.len() as u32
    }

    /// Allocates `size` bytes and returns the payload offset
    ///
    /// The first free block (in address order) whose payload can hold `size`
    /// bytes plus the header overhead is selected. If granting the request
    /// would leave at least [`SPLIT_THRESHOLD`] usable bytes behind, the tail
    /// of the block is split off as a new free block; otherwise the whole
    /// block is granted, so the usable payload may exceed `size`.
    ///
    /// # Errors
    ///
    /// [`HeapError::CapacityExceeded`] if `size` plus the header overhead
    /// reaches the arena capacity, [`HeapError::OutOfMemory`] if no single
    /// free block is currently large enough. Neither failure mutates the
    /// arena.
    pub fn allocate(&mut self, size: u32) -> Result<u32, HeapError> {
        self.ensure_init()?;

        let capacity = self.capacity();
        let needed = match size.checked_add(HEADER_SIZE) {
            Some(needed) if needed < capacity => needed,
            _ => {
                debug!(size, capacity, "request can never fit in the arena");
                return Err(HeapError::CapacityExceeded {
                    requested: size,
                    capacity,
                });
            }
        };

        // first fit: skip blocks that are not free or too small
        let mut cursor = self.head;
        let (offset, header) = loop {
            let current = match cursor {
                Some(current) => current,
                None => {
                    debug!(size, "no free block is large enough");
                    return Err(HeapError::OutOfMemory { requested: size });
                }
            };
            let header = BlockHeader::read(&self.arena, current)?;
            if header.status == Status::Free && header.size >= needed {
                break (current, header);
            }
            cursor = header.next;
        };

        if header.size - needed < SPLIT_THRESHOLD {
            // grant the whole block; splitting would leave an unusable sliver
            self.unlink(offset, &header)?;
            BlockHeader {
                status: Status::Allocated,
                size: header.size,
                prev: None,
                next: None,
            }
            .write(&mut self.arena, offset)?;
        } else {
            // carve the tail off into a new free block that takes over this
            // block's position in the list
            let remainder = offset + HEADER_SIZE + size;
            BlockHeader {
                status: Status::Free,
                size: header.size - size - HEADER_SIZE,
                prev: header.prev,
                next: header.next,
            }
            .write(&mut self.arena, remainder)?;
            self.splice(remainder, header.prev, header.next)?;

            BlockHeader {
                status: Status::Allocated,
                size,
                prev: None,
                next: None,
            }
            .write(&mut self.arena, offset)?;
        }

        let payload = block::payload_offset(offset);
        trace!(offset = payload, size, "allocated");
        Ok(payload)
    }

    /// Returns the block at payload offset `offset` to the free pool
    ///
    /// The block is reinserted into the free list in address order and merged
    /// with its next, then its previous, physical neighbor when those are
    /// free, so no two adjacent free blocks survive the call.
    ///
    /// # Errors
    ///
    /// [`HeapError::InvalidOffset`] if `offset` was never returned by
    /// [`Heap::allocate`] (including offsets whose block has since been
    /// absorbed by coalescing), [`HeapError::AlreadyFree`] if the block was
    /// already released.
    pub fn release(&mut self, offset: u32) -> Result<(), HeapError> {
        let (at, mut header) = self.live_header(offset)?;

        // find the free blocks bracketing this one in address order
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(current) = cursor {
            if current >= at {
                break;
            }
            prev = Some(current);
            cursor = BlockHeader::read(&self.arena, current)?.next;
        }

        header.status = Status::Free;
        header.prev = prev;
        header.next = cursor;
        header.write(&mut self.arena, at)?;
        self.splice(at, prev, cursor)?;
        trace!(offset = at, size = header.size, "released");

        // forward first, so the backward merge sees the combined block
        self.merge_forward(at)?;
        self.merge_backward(at)?;

        Ok(())
    }

    /// Borrows the payload of a live allocation
    ///
    /// The slice covers the granted payload, which may be larger than the
    /// requested size when the whole block was granted without splitting.
    ///
    /// # Errors
    ///
    /// Same validation as [`Heap::release`].
    pub fn payload(&self, offset: u32) -> Result<&[u8], HeapError> {
        let (at, header) = self.live_header(offset)?;
        let start = block::payload_offset(at) as usize;

        Ok(&self.arena[start..start + header.size as usize])
    }

    /// Mutably borrows the payload of a live allocation
    ///
    /// # Errors
    ///
    /// Same validation as [`Heap::release`].
    pub fn payload_mut(&mut self, offset: u32) -> Result<&mut [u8], HeapError> {
        let (at, header) = self.live_header(offset)?;
        let start = block::payload_offset(at) as usize;

        Ok(&mut self.arena[start..start + header.size as usize])
    }

    /// Iterates over the free blocks in address order
    pub fn free_blocks(&self) -> FreeBlocks<'_> {
        FreeBlocks::new(self)
    }

    /// Renders the free-block report as a string
    ///
    /// One line per free block with its offset, size and status. Allocated
    /// blocks do not appear; see the crate-level limitations.
    pub fn dump(&self) -> String {
        self.to_string()
    }

    /* Private API */
    /// Formats the arena as a single spanning free block, at most once
    fn ensure_init(&mut self) -> Result<(), HeapError> {
        if self.initialized {
            return Ok(());
        }

        BlockHeader::new_free(self.capacity() - HEADER_SIZE).write(&mut self.arena, 0)?;
        self.head = Some(0);
        self.initialized = true;
        debug!(
            capacity = self.capacity(),
            "arena formatted as a single free block"
        );

        Ok(())
    }

    /// Validates a caller-supplied payload offset against a live allocation
    fn live_header(&self, offset: u32) -> Result<(u32, BlockHeader), HeapError> {
        if !self.initialized {
            return Err(HeapError::InvalidOffset { offset });
        }

        let at = block::header_offset(offset).ok_or(HeapError::InvalidOffset { offset })?;
        let header = BlockHeader::read(&self.arena, at)
            .map_err(|_| HeapError::InvalidOffset { offset })?;

        match header.status {
            Status::Allocated => Ok((at, header)),
            Status::Free => Err(HeapError::AlreadyFree { offset }),
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

impl fmt::Display for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "heap: {} bytes total, {}-byte headers",
            self.capacity(),
            HEADER_SIZE
        )?;
        for info in self.free_blocks() {
            writeln!(
                f,
                "  block at offset {:>6}: size {:>6}  {:?}",
                info.offset, info.size, info.status
            )?;
        }

        Ok(())
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("capacity", &self.capacity())
            .field("head", &self.head)
            .field("initialized", &self.initialized)
            .field("free_blocks", &self.free_blocks())
            .finish()
    }
}
