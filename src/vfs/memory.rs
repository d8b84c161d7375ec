//! In-memory storage adapter
//!
//! Every named file resolves to a buffer registry slot; the registry is
//! shared behind `Arc<Mutex<..>>` so the binding layer, the FFI shim and
//! any number of open handles see the same storage. Temporary files get a
//! private buffer owned by the handle alone.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::buffer::{Buffer, BufferRegistry};
use crate::config::Limits;
use crate::error::{Result, SlotFsError};
use crate::path::EntryPath;

use super::{AccessMode, LockLevel, OpenFlags, Vfs, VfsFile};

/// Storage adapter backed by a shared [`BufferRegistry`].
#[derive(Clone)]
pub struct MemoryVfs {
    buffers: Arc<Mutex<BufferRegistry>>,
    rng: Arc<Mutex<SmallRng>>,
    /// Julian day injected by the binding layer; there is no wall clock
    /// to fall back on in this environment.
    clock: Arc<Mutex<f64>>,
}

impl MemoryVfs {
    /// Create an adapter owning a fresh registry sized by `limits`.
    pub fn new(limits: &Limits) -> Self {
        Self::with_registry(Arc::new(Mutex::new(BufferRegistry::new(limits))))
    }

    /// Create an adapter over an existing shared registry.
    pub fn with_registry(buffers: Arc<Mutex<BufferRegistry>>) -> Self {
        MemoryVfs {
            buffers,
            rng: Arc::new(Mutex::new(SmallRng::seed_from_u64(0))),
            clock: Arc::new(Mutex::new(0.0)),
        }
    }

    /// The shared buffer registry behind this adapter.
    pub fn registry(&self) -> &Arc<Mutex<BufferRegistry>> {
        &self.buffers
    }

    /// Reseed the randomness source. Seeding belongs to the binding
    /// layer; without it the stream is deterministic.
    pub fn seed_randomness(&self, seed: u64) {
        *self.rng.lock() = SmallRng::seed_from_u64(seed);
    }

    /// Inject the Julian day reported by [`Vfs::current_time`].
    pub fn set_current_time(&self, julian_day: f64) {
        *self.clock.lock() = julian_day;
    }
}

enum Backing {
    /// Slot in the shared registry; persists after the handle closes.
    Registry {
        buffers: Arc<Mutex<BufferRegistry>>,
        id: usize,
    },
    /// Private buffer for a temporary file; dropped with the handle.
    Temp(Buffer),
}

/// Open handle produced by [`MemoryVfs`].
pub struct MemoryFile {
    backing: Backing,
    lock_level: LockLevel,
}

impl MemoryFile {
    fn with_buffer<R>(&mut self, op: impl FnOnce(&mut Buffer) -> Result<R>) -> Result<R> {
        match &mut self.backing {
            Backing::Temp(buf) => op(buf),
            Backing::Registry { buffers, id } => {
                let mut registry = buffers.lock();
                op(registry.get_or_create(*id)?)
            }
        }
    }
}

impl Vfs for MemoryVfs {
    type File = MemoryFile;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&self, path: Option<&EntryPath>, _flags: OpenFlags) -> Result<MemoryFile> {
        let backing = match path {
            None => {
                tracing::debug!("opened temporary buffer file");
                Backing::Temp(Buffer::new())
            }
            Some(path) => {
                let id = path.buffer_id();
                // Materialize now so a bad id fails at open, not first I/O.
                self.buffers
                    .lock()
                    .get_or_create(id)
                    .map_err(|_| SlotFsError::CannotOpen)?;
                tracing::debug!(id, "opened registry buffer file");
                Backing::Registry {
                    buffers: Arc::clone(&self.buffers),
                    id,
                }
            }
        };
        Ok(MemoryFile {
            backing,
            lock_level: LockLevel::None,
        })
    }

    fn delete(&self, path: &EntryPath) -> Result<()> {
        self.buffers.lock().delete(path.buffer_id());
        Ok(())
    }

    fn access(&self, path: &EntryPath, mode: AccessMode) -> Result<bool> {
        let buffers = self.buffers.lock();
        let id = path.buffer_id();
        Ok(match mode {
            AccessMode::Exists => buffers.in_use(id),
            AccessMode::Read | AccessMode::ReadWrite => buffers.valid(id),
        })
    }

    fn randomness(&self, out: &mut [u8]) {
        self.rng.lock().fill_bytes(out);
    }

    fn current_time(&self) -> f64 {
        *self.clock.lock()
    }
}

impl VfsFile for MemoryFile {
    fn read(&mut self, out: &mut [u8], offset: u64) -> Result<usize> {
        let n = self.with_buffer(|buf| Ok(buf.read(out, offset as usize)))?;
        if n < out.len() {
            // Short read: the engine expects the missing range to behave
            // like implicit trailing zeros.
            out[n..].fill(0);
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8], offset: u64) -> Result<()> {
        let written = self.with_buffer(|buf| buf.write(data, offset as usize))?;
        if written != data.len() {
            return Err(SlotFsError::WriteFailed {
                requested: data.len(),
                written,
            });
        }
        Ok(())
    }

    fn truncate(&mut self, _size: u64) -> Result<()> {
        // Nothing to release; capacity is not a used-length.
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn file_size(&self) -> Result<u64> {
        let size = match &self.backing {
            Backing::Temp(buf) => buf.size(),
            Backing::Registry { buffers, id } => {
                buffers.lock().get(*id).map_or(0, Buffer::size)
            }
        };
        Ok(size as u64)
    }

    fn lock(&mut self, level: LockLevel) -> Result<()> {
        if level > self.lock_level {
            self.lock_level = level;
        }
        Ok(())
    }

    fn unlock(&mut self, level: LockLevel) -> Result<()> {
        if level < self.lock_level {
            self.lock_level = level;
        }
        Ok(())
    }

    fn check_reserved_lock(&self) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vfs() -> MemoryVfs {
        MemoryVfs::new(&Limits::COMPACT)
    }

    #[test]
    fn test_open_materializes_registry_slot() {
        let vfs = vfs();
        let path = EntryPath::main(2);
        assert!(!vfs.access(&path, AccessMode::Exists).unwrap());

        let _file = vfs.open(Some(&path), OpenFlags::default()).unwrap();
        assert!(vfs.access(&path, AccessMode::Exists).unwrap());
        assert!(vfs.registry().lock().in_use(4));
    }

    #[test]
    fn test_open_rejects_out_of_range_entry() {
        let vfs = vfs();
        // COMPACT has 8 buffer slots, so entry 4 maps to buffer 8.
        let path = EntryPath::main(4);
        assert!(matches!(
            vfs.open(Some(&path), OpenFlags::default()),
            Err(SlotFsError::CannotOpen)
        ));
    }

    #[test]
    fn test_registry_file_persists_across_handles() {
        let vfs = vfs();
        let path = EntryPath::main(1);
        {
            let mut file = vfs.open(Some(&path), OpenFlags::default()).unwrap();
            file.write(b"persist", 0).unwrap();
        }
        // Closing was a no-op for registry storage.
        let mut file = vfs.open(Some(&path), OpenFlags::default()).unwrap();
        let mut out = [0u8; 7];
        assert_eq!(file.read(&mut out, 0).unwrap(), 7);
        assert_eq!(&out, b"persist");
    }

    #[test]
    fn test_temp_file_is_private_and_dies_with_handle() {
        let vfs = vfs();
        {
            let mut file = vfs.open(None, OpenFlags::default()).unwrap();
            file.write(b"scratch", 0).unwrap();
            assert_eq!(file.file_size().unwrap(), 7);
        }
        // No registry slot was touched.
        let registry = vfs.registry().lock();
        for id in 0..registry.capacity() {
            assert!(!registry.in_use(id));
        }
    }

    #[test]
    fn test_short_read_zero_fills() {
        let vfs = vfs();
        let path = EntryPath::main(0);
        let mut file = vfs.open(Some(&path), OpenFlags::default()).unwrap();
        file.write(b"AB", 0).unwrap();

        let mut out = [0xFFu8; 4];
        assert_eq!(file.read(&mut out, 0).unwrap(), 2);
        assert_eq!(&out, b"AB\0\0");

        let mut past = [0xFFu8; 3];
        assert_eq!(file.read(&mut past, 10).unwrap(), 0);
        assert_eq!(&past, b"\0\0\0");
    }

    #[test]
    fn test_file_size_reports_grown_capacity() {
        let vfs = vfs();
        let path = EntryPath::journal(0);
        let mut file = vfs.open(Some(&path), OpenFlags::default()).unwrap();
        assert_eq!(file.file_size().unwrap(), 0);

        file.write(b"123", 5).unwrap();
        assert_eq!(file.file_size().unwrap(), 8);

        // Truncate is a no-op in memory.
        file.truncate(2).unwrap();
        assert_eq!(file.file_size().unwrap(), 8);
    }

    #[test]
    fn test_delete_clears_slot_and_access_follows() {
        let vfs = vfs();
        let path = EntryPath::main(3);
        let mut file = vfs.open(Some(&path), OpenFlags::default()).unwrap();
        file.write(b"gone soon", 0).unwrap();
        assert!(vfs.access(&path, AccessMode::Exists).unwrap());

        vfs.delete(&path).unwrap();
        assert!(!vfs.access(&path, AccessMode::Exists).unwrap());
        // Non-exists modes only ask whether the id is in range.
        assert!(vfs.access(&path, AccessMode::Read).unwrap());
        assert!(vfs.access(&path, AccessMode::ReadWrite).unwrap());
    }

    #[test]
    fn test_journal_and_main_are_distinct_buffers() {
        let vfs = vfs();
        let main = EntryPath::main(1);
        let journal = EntryPath::journal(1);

        let mut mf = vfs.open(Some(&main), OpenFlags::default()).unwrap();
        let mut jf = vfs.open(Some(&journal), OpenFlags::default()).unwrap();
        mf.write(b"main", 0).unwrap();
        jf.write(b"journal!", 0).unwrap();

        assert_eq!(mf.file_size().unwrap(), 4);
        assert_eq!(jf.file_size().unwrap(), 8);
    }

    #[test]
    fn test_locks_always_granted() {
        let vfs = vfs();
        let mut file = vfs.open(None, OpenFlags::default()).unwrap();
        file.lock(LockLevel::Exclusive).unwrap();
        assert!(!file.check_reserved_lock().unwrap());
        file.unlock(LockLevel::None).unwrap();
        file.sync().unwrap();
    }

    #[test]
    fn test_seeded_randomness_is_deterministic() {
        let vfs = vfs();
        vfs.seed_randomness(42);
        let mut a = [0u8; 16];
        vfs.randomness(&mut a);

        vfs.seed_randomness(42);
        let mut b = [0u8; 16];
        vfs.randomness(&mut b);
        assert_eq!(a, b);

        let mut c = [0u8; 16];
        vfs.randomness(&mut c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_injected_time() {
        let vfs = vfs();
        assert_eq!(vfs.current_time(), 0.0);
        vfs.set_current_time(2_440_587.5);
        assert_eq!(vfs.current_time(), 2_440_587.5);
    }

    #[test]
    fn test_full_pathname_is_identity() {
        let vfs = vfs();
        let path = EntryPath::journal(2);
        assert_eq!(vfs.full_pathname(&path).unwrap(), path);
    }
}
