//! Opaque path tokens
//!
//! The SQL engine never sees a real filesystem path. Each logical database
//! is named by a 1–2 byte token: byte 0 carries `entry_id + 1` (never zero,
//! so NUL stays reserved for "no path" temp files) and a non-zero byte 1
//! marks the journal companion of the same entry. The engine derives its
//! journal name by appending `-journal` to the main name, which lands a
//! `-` in byte 1. Only the first two bytes are ever meaningful.
//!
//! [`EntryPath`] is an owned value, so consecutive encodes never alias.

use std::fmt;

/// Byte this crate uses for the journal flag when it encodes a journal
/// token itself. Any non-zero byte decodes the same way.
pub const JOURNAL_MARK: u8 = b'-';

/// Owned 1–2 byte path token naming one side of a logical database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryPath {
    bytes: [u8; 2],
}

impl EntryPath {
    /// Token for the main file of `entry_id`.
    pub fn main(entry_id: usize) -> Self {
        debug_assert!(entry_id < 0x7F, "entry id does not fit a token byte");
        EntryPath {
            bytes: [entry_id as u8 + 1, 0],
        }
    }

    /// Token for the journal companion of `entry_id`.
    pub fn journal(entry_id: usize) -> Self {
        debug_assert!(entry_id < 0x7F, "entry id does not fit a token byte");
        EntryPath {
            bytes: [entry_id as u8 + 1, JOURNAL_MARK],
        }
    }

    /// Decode a token from raw engine-supplied path bytes.
    ///
    /// Only bytes 0 and 1 are inspected; anything after the journal flag
    /// (such as the rest of the engine's `-journal` suffix) is ignored.
    /// Returns `None` for an empty or NUL-led name.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        let first = *raw.first()?;
        if first == 0 {
            return None;
        }
        let second = raw.get(1).copied().unwrap_or(0);
        Some(EntryPath {
            bytes: [first, second],
        })
    }

    /// Logical entry id this token names.
    pub fn entry_id(&self) -> usize {
        usize::from(self.bytes[0] - 1)
    }

    /// True when this token names the journal companion.
    pub fn is_journal(&self) -> bool {
        self.bytes[1] != 0
    }

    /// Buffer registry id backing this token: `2 * entry_id`, `+1` for
    /// the journal.
    pub fn buffer_id(&self) -> usize {
        2 * self.entry_id() + usize::from(self.is_journal())
    }

    /// The meaningful token bytes (one for a main file, two for a journal).
    pub fn as_bytes(&self) -> &[u8] {
        if self.is_journal() {
            &self.bytes
        } else {
            &self.bytes[..1]
        }
    }
}

impl fmt::Display for EntryPath {
    /// Renders the token as the string the engine opens, e.g. for handing
    /// a database name to a connection API.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.as_bytes() {
            write!(f, "{}", char::from(b))?;
        }
        Ok(())
    }
}
