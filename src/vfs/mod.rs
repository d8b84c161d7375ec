//! Virtual storage adapters
//!
//! The SQL engine expects a filesystem; these adapters give it one backed
//! by slot-registry buffers ([`memory`]) or by host-relayed I/O callbacks
//! ([`host`]). Both implement the same [`Vfs`]/[`VfsFile`] contract and
//! are selected at construction time, so they share one contract test
//! suite. [`ffi`] registers a memory adapter with a linked SQLite library.

pub mod ffi;
pub mod host;
pub mod memory;

pub use host::{HostIo, HostVfs};
pub use memory::MemoryVfs;

use crate::error::Result;
use crate::path::EntryPath;

/// What the engine is asking about a path in [`Vfs::access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Has a file been materialized at this path?
    Exists,
    /// May the path be read?
    Read,
    /// May the path be read and written?
    ReadWrite,
}

/// The engine's five lock levels.
///
/// Both adapters grant every request: operation is single-threaded by
/// construction, but the contract slots still have to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockLevel {
    None,
    Shared,
    Reserved,
    Pending,
    Exclusive,
}

impl LockLevel {
    /// Map the engine's integer lock level, clamping unknown values to
    /// `Exclusive`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => LockLevel::None,
            1 => LockLevel::Shared,
            2 => LockLevel::Reserved,
            3 => LockLevel::Pending,
            _ => LockLevel::Exclusive,
        }
    }
}

/// Open-time hints from the engine.
///
/// Carried through for contract fidelity; neither adapter changes its
/// behavior on them, exactly as the storage layer has always ignored the
/// engine's open bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub create: bool,
    pub read_write: bool,
    pub delete_on_close: bool,
}

/// The engine's pluggable storage contract.
///
/// `open(None, ..)` requests a temporary/anonymous file whose storage is
/// private to the returned handle and released when the handle drops.
/// Opening a named path resolves it through the path codec to a buffer
/// registry slot (or a host resource) that outlives the handle.
pub trait Vfs {
    type File: VfsFile;

    /// Name of this adapter (e.g. `"memory"`, `"host"`).
    fn name(&self) -> &'static str;

    /// Open a file handle. Fails with `CannotOpen` only when backing
    /// storage cannot be allocated or resolved.
    fn open(&self, path: Option<&EntryPath>, flags: OpenFlags) -> Result<Self::File>;

    /// Delete the storage behind `path`. Deleting a path that was never
    /// written is a no-op.
    fn delete(&self, path: &EntryPath) -> Result<()>;

    /// Answer an access query: `Exists` reports whether storage has been
    /// materialized at the path; any other mode reports whether the path
    /// is merely in range.
    fn access(&self, path: &EntryPath, mode: AccessMode) -> Result<bool>;

    /// Re-encode `path` as a full name. The path space is a fixed-width
    /// token, so this is the identity.
    fn full_pathname(&self, path: &EntryPath) -> Result<EntryPath> {
        Ok(*path)
    }

    /// Fill `out` with pseudo-random bytes.
    fn randomness(&self, out: &mut [u8]);

    /// Current time as a Julian day number.
    fn current_time(&self) -> f64;
}

/// An open file handle. Closing is dropping: temporary handles release
/// their private storage, registry-backed handles leave the buffer in
/// the registry for the life of the logical database.
pub trait VfsFile {
    /// Read `out.len()` bytes at `offset`. On a short read the tail of
    /// `out` is zero-filled and the short count is returned; the caller
    /// treats the missing range as implicit trailing zeros, not an error.
    fn read(&mut self, out: &mut [u8], offset: u64) -> Result<usize>;

    /// Write all of `data` at `offset`. Anything short of a full write is
    /// an error (`WriteFailed`, or `OutOfMemory` when growth failed).
    fn write(&mut self, data: &[u8], offset: u64) -> Result<()>;

    /// Truncate to `size` bytes. A no-op for in-memory storage; forwarded
    /// to the host for relayed storage.
    fn truncate(&mut self, size: u64) -> Result<()>;

    /// Flush to durable storage. Always a no-op: no durable medium is
    /// assumed reachable synchronously.
    fn sync(&mut self) -> Result<()>;

    /// Current file size in bytes (the backing buffer's capacity).
    fn file_size(&self) -> Result<u64>;

    /// Take a lock. Always granted.
    fn lock(&mut self, level: LockLevel) -> Result<()>;

    /// Drop back to a lock level. Always granted.
    fn unlock(&mut self, level: LockLevel) -> Result<()>;

    /// Whether any handle holds a reserved lock. Always false here.
    fn check_reserved_lock(&self) -> Result<bool>;

    /// Minimum write granularity of the underlying storage. Memory has
    /// none; 0 lets the engine use its default.
    fn sector_size(&self) -> u32 {
        0
    }

    /// Device capability flags; nothing special to declare.
    fn device_characteristics(&self) -> u32 {
        0
    }
}
