//! slotfs
//!
//! A fixed-slot virtual filesystem that lets an embedded SQL engine run
//! against memory-resident (or host-relayed) byte storage, so several
//! independent databases (each a main file plus an optional journal)
//! can live inside one process with no real disk underneath.
//!
//! ## Features
//!
//! - **Growable buffers** with explicit capacity and clipping reads, in
//!   place of files with implicit trailing zeros
//! - **Fixed-capacity registries** for buffers and for per-connection
//!   prepared-statement handles, with O(1) lookup by small integer id
//! - **1–2 byte path tokens** encoding a logical entry id and a
//!   main/journal flag, with no hierarchical path space
//! - **Pluggable storage adapter**: one [`Vfs`] contract, two backends
//!   (in-memory buffer registry, host-callback relay) selected at
//!   construction
//! - **Real SQLite integration** via `libsqlite3-sys` VFS registration
//!
//! ## Example
//!
//! ```rust
//! use slotfs::vfs::{OpenFlags, Vfs, VfsFile};
//! use slotfs::{EntryPath, Limits, MemoryVfs};
//!
//! let vfs = MemoryVfs::new(&Limits::default());
//!
//! // Database 0's main file lives in buffer slot 0, its journal in slot 1.
//! let path = EntryPath::main(0);
//! let mut file = vfs.open(Some(&path), OpenFlags::default()).unwrap();
//! file.write(b"hello", 0).unwrap();
//!
//! // Reads past capacity clip and zero-fill: a file with implicit zeros.
//! let mut out = [0u8; 8];
//! let n = file.read(&mut out, 0).unwrap();
//! assert_eq!(n, 5);
//! assert_eq!(&out, b"hello\0\0\0");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                 SQL engine                     │
//! │        (black box; file-I/O contract)          │
//! ├────────────────────────────────────────────────┤
//! │ Storage adapter (Vfs / VfsFile)                │
//! │   open · read · write · truncate · sync        │
//! │   lock · access · delete · fullpathname · …    │
//! ├───────────────┬────────────────────────────────┤
//! │ Path codec    │  EntryPath: [id+1, journal?]   │
//! ├───────────────┴────────────────────────────────┤
//! │ BufferRegistry          │  HostIo callbacks    │
//! │  slot 2n   → main file  │  (relay variant)     │
//! │  slot 2n+1 → journal    │                      │
//! └─────────────────────────┴──────────────────────┘
//! ```
//!
//! The [`ConnectionRegistry`] is a parallel bookkeeping structure used by
//! the binding surface to tie prepared statements to the connection that
//! owns them, so teardown can release everything a connection still holds.
//! All registries are explicitly constructed values: capacity comes from
//! one [`Limits`] set, never from hidden globals.

pub mod buffer;
pub mod config;
pub mod error;
pub mod path;
pub mod registry;
pub mod vfs;

// Re-export commonly used types
pub use buffer::{Buffer, BufferRegistry};
pub use config::Limits;
pub use error::{Result, SlotFsError};
pub use path::EntryPath;
pub use registry::{ConnectionRegistry, RegistryEntry};
pub use vfs::{AccessMode, HostIo, HostVfs, LockLevel, MemoryVfs, OpenFlags, Vfs, VfsFile};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
