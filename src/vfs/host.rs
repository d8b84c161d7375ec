//! Host-relayed storage adapter
//!
//! Instead of registry buffers, every operation is forwarded to a host
//! capability: the embedder supplies a [`HostIo`] implementation (the
//! mirror of a JavaScript import table in the original environment) and
//! the adapter translates the engine's file contract onto it. Open files
//! are host resources addressed by a resource id.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::error::Result;
use crate::path::EntryPath;

use super::{AccessMode, LockLevel, OpenFlags, Vfs, VfsFile};

/// Milliseconds-since-epoch to Julian day.
const JULIAN_UNIX_EPOCH: f64 = 2_440_587.5;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Host-side I/O primitives the adapter delegates to.
///
/// `open(None)` requests an anonymous scratch resource. Resource ids are
/// opaque host handles; the adapter never interprets them.
pub trait HostIo: Send + Sync {
    fn open(&self, path: Option<&EntryPath>) -> Result<u64>;
    fn close(&self, rid: u64);
    fn delete(&self, path: &EntryPath) -> Result<()>;
    fn read(&self, rid: u64, out: &mut [u8], offset: u64) -> Result<usize>;
    fn write(&self, rid: u64, data: &[u8], offset: u64) -> Result<usize>;
    fn truncate(&self, rid: u64, size: u64) -> Result<()>;
    fn size(&self, rid: u64) -> Result<u64>;
    fn lock(&self, rid: u64, exclusive: bool);
    fn unlock(&self, rid: u64);
    /// Has anything been stored at `path`?
    fn exists(&self, path: &EntryPath) -> bool;
    /// Is `path` one the host is willing to serve at all?
    fn accessible(&self, path: &EntryPath) -> bool;
    /// Wall clock in milliseconds since the Unix epoch.
    fn time_ms(&self) -> f64;
}

/// Storage adapter relaying to a [`HostIo`] capability.
#[derive(Clone)]
pub struct HostVfs {
    host: Arc<dyn HostIo>,
    rng: Arc<Mutex<SmallRng>>,
}

impl HostVfs {
    pub fn new(host: Arc<dyn HostIo>) -> Self {
        HostVfs {
            host,
            rng: Arc::new(Mutex::new(SmallRng::seed_from_u64(0))),
        }
    }

    /// Reseed the randomness source (binding-layer capability).
    pub fn seed_randomness(&self, seed: u64) {
        *self.rng.lock() = SmallRng::seed_from_u64(seed);
    }
}

/// Open handle over a host resource. Dropping the handle closes the
/// resource on the host side.
pub struct HostFile {
    host: Arc<dyn HostIo>,
    rid: u64,
    lock_level: LockLevel,
}

impl Drop for HostFile {
    fn drop(&mut self) {
        self.host.close(self.rid);
    }
}

impl Vfs for HostVfs {
    type File = HostFile;

    fn name(&self) -> &'static str {
        "host"
    }

    fn open(&self, path: Option<&EntryPath>, _flags: OpenFlags) -> Result<HostFile> {
        let rid = self.host.open(path)?;
        tracing::debug!(rid, "opened host resource");
        Ok(HostFile {
            host: Arc::clone(&self.host),
            rid,
            lock_level: LockLevel::None,
        })
    }

    fn delete(&self, path: &EntryPath) -> Result<()> {
        self.host.delete(path)
    }

    fn access(&self, path: &EntryPath, mode: AccessMode) -> Result<bool> {
        Ok(match mode {
            AccessMode::Exists => self.host.exists(path),
            AccessMode::Read | AccessMode::ReadWrite => self.host.accessible(path),
        })
    }

    fn randomness(&self, out: &mut [u8]) {
        self.rng.lock().fill_bytes(out);
    }

    fn current_time(&self) -> f64 {
        JULIAN_UNIX_EPOCH + self.host.time_ms() / MS_PER_DAY
    }
}

impl VfsFile for HostFile {
    fn read(&mut self, out: &mut [u8], offset: u64) -> Result<usize> {
        let n = self.host.read(self.rid, out, offset)?;
        if n < out.len() {
            out[n..].fill(0);
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8], offset: u64) -> Result<()> {
        let written = self.host.write(self.rid, data, offset)?;
        if written != data.len() {
            return Err(crate::error::SlotFsError::WriteFailed {
                requested: data.len(),
                written,
            });
        }
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        // Unlike the in-memory adapter, the host may actually shrink its
        // storage; forward the new size.
        self.host.truncate(self.rid, size)
    }

    fn sync(&mut self) -> Result<()> {
        // No durable medium is assumed reachable synchronously.
        Ok(())
    }

    fn file_size(&self) -> Result<u64> {
        self.host.size(self.rid)
    }

    fn lock(&mut self, level: LockLevel) -> Result<()> {
        if level > self.lock_level {
            self.host.lock(self.rid, level >= LockLevel::Reserved);
            self.lock_level = level;
        }
        Ok(())
    }

    fn unlock(&mut self, level: LockLevel) -> Result<()> {
        if level < self.lock_level {
            self.host.unlock(self.rid);
            self.lock_level = level;
        }
        Ok(())
    }

    fn check_reserved_lock(&self) -> Result<bool> {
        Ok(false)
    }
}
