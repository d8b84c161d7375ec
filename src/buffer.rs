//! Growable byte buffers and the fixed-slot buffer registry
//!
//! A [`Buffer`] stands in for one file's contents: a zero-indexed byte
//! region whose `size` is the capacity it was ever explicitly grown to,
//! not a used-length watermark. Reads and writes past `size` clip instead
//! of failing, which is what lets the storage adapter emulate files with
//! implicit trailing zeros.
//!
//! The [`BufferRegistry`] maps small integer ids to optionally-present
//! buffers. Slot `2*n` holds the main file of logical database `n` and
//! slot `2*n + 1` its journal.

use crate::config::Limits;
use crate::error::{Result, SlotFsError};

/// Growable byte region with explicit capacity.
#[derive(Debug, Default)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Buffer { bytes: Vec::new() }
    }

    /// Current capacity in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Ensure capacity is at least `target` bytes.
    ///
    /// No-op when already sufficient. Existing bytes are preserved and new
    /// bytes are zeroed. On allocation failure the capacity is unchanged
    /// and [`SlotFsError::OutOfMemory`] is returned; the caller surfaces
    /// that to the SQL engine instead of silently truncating.
    pub fn grow(&mut self, target: usize) -> Result<()> {
        if self.bytes.len() >= target {
            return Ok(());
        }
        let additional = target - self.bytes.len();
        self.bytes
            .try_reserve(additional)
            .map_err(|_| SlotFsError::OutOfMemory { requested: target })?;
        self.bytes.resize(target, 0);
        Ok(())
    }

    /// Copy bytes starting at `offset` into `out`, clipping at capacity.
    ///
    /// Returns the byte count actually copied, which may be less than
    /// `out.len()` and is 0 when `offset >= size`. A short read is a
    /// normal outcome, not an error, and never grows the buffer.
    pub fn read(&self, out: &mut [u8], offset: usize) -> usize {
        if offset >= self.bytes.len() {
            return 0;
        }
        let len = out.len().min(self.bytes.len() - offset);
        out[..len].copy_from_slice(&self.bytes[offset..offset + len]);
        len
    }

    /// Write all of `src` at `offset`, growing first.
    ///
    /// All-or-nothing: the write is gated by the grow step, so a partial
    /// write never occurs. Returns the byte count written.
    pub fn write(&mut self, src: &[u8], offset: usize) -> Result<usize> {
        self.grow(offset + src.len())?;
        self.bytes[offset..offset + src.len()].copy_from_slice(src);
        Ok(src.len())
    }
}

/// Fixed-capacity table of optionally-present buffers, indexed by id.
#[derive(Debug)]
pub struct BufferRegistry {
    slots: Vec<Option<Buffer>>,
}

impl BufferRegistry {
    /// Create a registry with `limits.buffer_slots` empty slots.
    pub fn new(limits: &Limits) -> Self {
        BufferRegistry {
            slots: (0..limits.buffer_slots).map(|_| None).collect(),
        }
    }

    /// Total slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Pure range check; never allocates.
    pub fn valid(&self, id: usize) -> bool {
        id < self.slots.len()
    }

    /// Borrow the buffer at `id`, materializing it on first reference.
    pub fn get_or_create(&mut self, id: usize) -> Result<&mut Buffer> {
        if !self.valid(id) {
            return Err(SlotFsError::InvalidBufferId(id));
        }
        Ok(self.slots[id].get_or_insert_with(Buffer::new))
    }

    /// Borrow the buffer at `id` without materializing it.
    pub fn get(&self, id: usize) -> Option<&Buffer> {
        self.slots.get(id)?.as_ref()
    }

    /// True only if a buffer has actually been materialized at `id`.
    ///
    /// Distinct from [`valid`](Self::valid): a valid id may be unused.
    pub fn in_use(&self, id: usize) -> bool {
        self.slots.get(id).is_some_and(Option::is_some)
    }

    /// Release and clear the slot at `id`.
    ///
    /// Safe no-op on an unused or invalid id.
    pub fn delete(&mut self, id: usize) {
        if let Some(slot) = self.slots.get_mut(id) {
            if slot.take().is_some() {
                tracing::debug!(id, "deleted registry buffer");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_is_monotonic_and_preserving() {
        let mut buf = Buffer::new();
        buf.write(b"hello", 0).unwrap();
        assert_eq!(buf.size(), 5);

        buf.grow(16).unwrap();
        assert_eq!(buf.size(), 16);

        // Growing to a smaller target is a no-op.
        buf.grow(4).unwrap();
        assert_eq!(buf.size(), 16);

        let mut out = [0u8; 5];
        assert_eq!(buf.read(&mut out, 0), 5);
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn test_read_clips_at_capacity() {
        let mut buf = Buffer::new();
        buf.write(b"abcd", 0).unwrap();

        let mut out = [0xAAu8; 8];
        assert_eq!(buf.read(&mut out, 2), 2);
        assert_eq!(&out[..2], b"cd");

        // Reads at or past the end return 0 and never grow storage.
        assert_eq!(buf.read(&mut out, 4), 0);
        assert_eq!(buf.read(&mut out, 100), 0);
        assert_eq!(buf.size(), 4);
    }

    #[test]
    fn test_write_grows_and_zero_fills_gap() {
        let mut buf = Buffer::new();
        buf.write(b"XY", 6).unwrap();
        assert_eq!(buf.size(), 8);

        let mut out = [0xFFu8; 8];
        assert_eq!(buf.read(&mut out, 0), 8);
        assert_eq!(&out, b"\0\0\0\0\0\0XY");
    }

    #[test]
    fn test_registry_rejects_out_of_range_ids() {
        let mut reg = BufferRegistry::new(&Limits::COMPACT);
        assert_eq!(reg.capacity(), 8);
        assert!(reg.valid(7));
        assert!(!reg.valid(8));
        assert!(matches!(
            reg.get_or_create(8),
            Err(SlotFsError::InvalidBufferId(8))
        ));
    }

    #[test]
    fn test_registry_lazy_materialization() {
        let mut reg = BufferRegistry::new(&Limits::COMPACT);
        assert!(!reg.in_use(3));
        assert!(reg.get(3).is_none());

        reg.get_or_create(3).unwrap();
        assert!(reg.in_use(3));
        assert!(!reg.in_use(2));
    }

    #[test]
    fn test_registry_write_then_short_read() {
        // CAP_B = 8; write "AB" at id 3, read 4 bytes back: 2 real + 2 zero.
        let mut reg = BufferRegistry::new(&Limits::COMPACT);
        let buf = reg.get_or_create(3).unwrap();
        buf.write(b"AB", 0).unwrap();

        let mut out = [0xFFu8; 4];
        let n = reg.get(3).unwrap().read(&mut out, 0);
        assert_eq!(n, 2);
        out[n..].fill(0);
        assert_eq!(&out, b"AB\0\0");
    }

    #[test]
    fn test_registry_delete_is_idempotent() {
        let mut reg = BufferRegistry::new(&Limits::COMPACT);
        reg.get_or_create(1).unwrap().write(b"x", 0).unwrap();
        assert!(reg.in_use(1));

        reg.delete(1);
        assert!(!reg.in_use(1));

        // Unused and invalid ids are both safe no-ops.
        reg.delete(1);
        reg.delete(999);
    }

    #[test]
    fn test_deleted_slot_recreates_empty() {
        let mut reg = BufferRegistry::new(&Limits::COMPACT);
        reg.get_or_create(2).unwrap().write(b"data", 0).unwrap();
        reg.delete(2);

        let buf = reg.get_or_create(2).unwrap();
        assert_eq!(buf.size(), 0);
    }
}
