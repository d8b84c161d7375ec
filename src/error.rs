use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlotFsError {
    #[error("out of memory growing buffer to {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("invalid buffer id: {0}")]
    InvalidBufferId(usize),

    #[error("connection registry full ({capacity} entries)")]
    RegistryFull { capacity: usize },

    #[error("statement limit reached ({capacity} per connection)")]
    StatementLimit { capacity: usize },

    #[error("statement slot table for entry {entry_id} disagrees with its used count")]
    StatementSlotsInconsistent { entry_id: usize },

    #[error("no registry entry at id {0}")]
    NoSuchEntry(usize),

    #[error("cannot open file")]
    CannotOpen,

    #[error("short write: {written} of {requested} bytes")]
    WriteFailed { requested: usize, written: usize },

    #[error("invalid limits: {0}")]
    InvalidLimits(String),

    #[error("host I/O error: {0}")]
    Host(String),

    #[error("VFS registration failed: {0}")]
    VfsRegistration(i32),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SlotFsError>;
