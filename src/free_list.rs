use core::fmt;

use tracing::trace;

use crate::block::{self, BlockHeader, Status};
use crate::consts::HEADER_SIZE;
use crate::error::HeapError;
use crate::Heap;

/// One entry of the free-list report produced by [`Heap::free_blocks`]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FreeBlockInfo {
    /// Header offset of the block within the arena
    pub offset: u32,
    /// Payload capacity of the block in bytes
    pub size: u32,
    /// Always [`Status::Free`]; carried so the report mirrors the header
    pub status: Status,
}

/// Address-ordered iterator over the free list
///
/// Allocated blocks are not enumerable: there is no registry of live
/// allocations, only the holder of a payload offset can reach one.
pub struct FreeBlocks<'a> {
    heap: &'a Heap,
    cursor: Option<u32>,
}

impl<'a> FreeBlocks<'a> {
    pub(crate) fn new(heap: &'a Heap) -> Self {
        FreeBlocks {
            heap,
            cursor: heap.head,
        }
    }
}

impl Iterator for FreeBlocks<'_> {
    type Item = FreeBlockInfo;

    fn next(&mut self) -> Option<FreeBlockInfo> {
        let offset = self.cursor?;
        // a decode failure means the arena is corrupt; the traversal is
        // diagnostic, so stop rather than report garbage
        let header = BlockHeader::read(&self.heap.arena, offset).ok()?;
        self.cursor = header.next;

        Some(FreeBlockInfo {
            offset,
            size: header.size,
            status: header.status,
        })
    }
}

impl fmt::Debug for FreeBlocks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(FreeBlocks::new(self.heap)).finish()
    }
}

impl Heap {
    /* Free-list maintenance */
    /// Removes a block from the free list, fixing the anchor and the
    /// neighbors' links
    pub(crate) fn unlink(&mut self, offset: u32, header: &BlockHeader) -> Result<(), HeapError> {
        debug_assert_eq!(header.status, Status::Free);

        match header.prev {
            Some(prev) => self.set_next(prev, header.next)?,
            None => self.head = header.next,
        }
        if let Some(next) = header.next {
            self.set_prev(next, header.prev)?;
        }

        Ok(())
    }

    /// Splices a freed block between `prev` and `next`, which must be the
    /// free blocks bracketing `offset` in address order
    ///
    /// Handles all three insertion cases: `prev == None` makes the block the
    /// new head, `next == None` makes it the tail, and both `None` covers the
    /// previously-empty list.
    pub(crate) fn splice(
        &mut self,
        offset: u32,
        prev: Option<u32>,
        next: Option<u32>,
    ) -> Result<(), HeapError> {
        match prev {
            Some(prev) => self.set_next(prev, Some(offset))?,
            None => self.head = Some(offset),
        }
        if let Some(next) = next {
            self.set_prev(next, Some(offset))?;
        }

        Ok(())
    }

    /* Coalescing */
    /// Absorbs the next free block if it is physically adjacent
    ///
    /// The absorbed block's header is scrubbed and its successor relinked to
    /// the surviving block.
    pub(crate) fn merge_forward(&mut self, offset: u32) -> Result<(), HeapError> {
        let mut header = BlockHeader::read(&self.arena, offset)?;
        debug_assert_eq!(header.status, Status::Free);

        let next = match header.next {
            Some(next) if next == offset + header.span() => next,
            _ => return Ok(()),
        };
        let next_header = BlockHeader::read(&self.arena, next)?;
        if next_header.status != Status::Free {
            return Ok(());
        }

        header.size += HEADER_SIZE + next_header.size;
        header.next = next_header.next;
        header.write(&mut self.arena, offset)?;
        if let Some(after) = next_header.next {
            self.set_prev(after, Some(offset))?;
        }
        block::scrub(&mut self.arena, next)?;

        trace!(offset, size = header.size, "merged with next block");
        Ok(())
    }

    /// Absorbs this block into the previous free block if physically adjacent
    ///
    /// Symmetric to [`Heap::merge_forward`], except the predecessor is the
    /// surviving block.
    pub(crate) fn merge_backward(&mut self, offset: u32) -> Result<(), HeapError> {
        let header = BlockHeader::read(&self.arena, offset)?;
        debug_assert_eq!(header.status, Status::Free);

        let prev = match header.prev {
            Some(prev) => prev,
            None => return Ok(()),
        };
        let mut prev_header = BlockHeader::read(&self.arena, prev)?;
        if prev_header.status != Status::Free || prev + prev_header.span() != offset {
            return Ok(());
        }

        prev_header.size += HEADER_SIZE + header.size;
        prev_header.next = header.next;
        prev_header.write(&mut self.arena, prev)?;
        if let Some(after) = header.next {
            self.set_prev(after, Some(prev))?;
        }
        block::scrub(&mut self.arena, offset)?;

        trace!(offset = prev, size = prev_header.size, "merged with previous block");
        Ok(())
    }

    /* Link setters */
    fn set_prev(&mut self, offset: u32, prev: Option<u32>) -> Result<(), HeapError> {
        let mut header = BlockHeader::read(&self.arena, offset)?;
        header.prev = prev;
        header.write(&mut self.arena, offset)
    }

    fn set_next(&mut self, offset: u32, next: Option<u32>) -> Result<(), HeapError> {
        let mut header = BlockHeader::read(&self.arena, offset)?;
        header.next = next;
        header.write(&mut self.arena, offset)
    }
}
