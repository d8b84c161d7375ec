//! Connection entries and statement slot bookkeeping
//!
//! Parallel to the buffer registry, this tracks which prepared statements
//! belong to which open connection so that teardown can release everything
//! a connection still holds. It is pure bookkeeping: releasing an entry
//! does not finalize statements or clear the entry's two buffer slots;
//! that sequencing belongs to the connection-close logic driving it.
//!
//! The registry is generic over the engine's connection and statement
//! handle types; it never calls into the engine.

use crate::config::Limits;
use crate::error::{Result, SlotFsError};

/// One claimed registry slot: a connection and its statement table.
#[derive(Debug)]
pub struct RegistryEntry<C, S> {
    conn: C,
    stmts: Vec<Option<S>>,
    /// Count of occupied statement slots; always equals the number of
    /// `Some` entries in `stmts`.
    used: usize,
    /// Cursor where the next free-slot scan starts. A hint, never
    /// authoritative.
    last: usize,
}

impl<C, S> RegistryEntry<C, S> {
    fn new(conn: C, max_statements: usize) -> Self {
        RegistryEntry {
            conn,
            stmts: (0..max_statements).map(|_| None).collect(),
            used: 0,
            last: 0,
        }
    }

    /// Borrow the connection handle.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Mutably borrow the connection handle.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Number of statement slots currently occupied.
    pub fn open_statements(&self) -> usize {
        self.used
    }

    /// Borrow the statement at `slot_id`, if occupied.
    pub fn statement(&self, slot_id: usize) -> Option<&S> {
        self.stmts.get(slot_id)?.as_ref()
    }

    /// Mutably borrow the statement at `slot_id`, if occupied.
    pub fn statement_mut(&mut self, slot_id: usize) -> Option<&mut S> {
        self.stmts.get_mut(slot_id)?.as_mut()
    }
}

/// Fixed-capacity table of connection entries.
#[derive(Debug)]
pub struct ConnectionRegistry<C, S> {
    entries: Vec<Option<RegistryEntry<C, S>>>,
    max_statements: usize,
}

impl<C, S> ConnectionRegistry<C, S> {
    /// Create a registry with `limits.entry_slots()` empty entry slots.
    pub fn new(limits: &Limits) -> Self {
        ConnectionRegistry {
            entries: (0..limits.entry_slots()).map(|_| None).collect(),
            max_statements: limits.max_statements,
        }
    }

    /// Total entry slot count.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Claim the first free entry slot for `conn`.
    ///
    /// Plain linear scan from 0, with no reuse preference or recency bias.
    pub fn claim_entry(&mut self, conn: C) -> Result<usize> {
        for (entry_id, slot) in self.entries.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(RegistryEntry::new(conn, self.max_statements));
                tracing::debug!(entry_id, "claimed registry entry");
                return Ok(entry_id);
            }
        }
        Err(SlotFsError::RegistryFull {
            capacity: self.entries.len(),
        })
    }

    /// Free the entry slot, returning the connection handle it owned.
    ///
    /// Does not release the entry's statements or its two buffer registry
    /// slots; the caller does that before or alongside this call.
    pub fn release_entry(&mut self, entry_id: usize) -> Option<C> {
        let released = self.entries.get_mut(entry_id)?.take();
        if released.is_some() {
            tracing::debug!(entry_id, "released registry entry");
        }
        released.map(|entry| entry.conn)
    }

    /// Borrow the entry at `entry_id`, if claimed.
    pub fn get_entry(&self, entry_id: usize) -> Option<&RegistryEntry<C, S>> {
        self.entries.get(entry_id)?.as_ref()
    }

    /// Mutably borrow the entry at `entry_id`, if claimed.
    pub fn get_entry_mut(&mut self, entry_id: usize) -> Option<&mut RegistryEntry<C, S>> {
        self.entries.get_mut(entry_id)?.as_mut()
    }

    /// Store `stmt` in a free slot of `entry_id`.
    ///
    /// Rejects with [`SlotFsError::StatementLimit`] when the entry is full.
    /// Otherwise scans circularly from the `last` cursor, stopping one
    /// short of a full lap so a table that disagrees with `used` cannot
    /// loop forever. On success the cursor is left pointing at the slot
    /// just claimed.
    pub fn claim_statement(&mut self, entry_id: usize, stmt: S) -> Result<usize> {
        let cap = self.max_statements;
        let entry = self
            .entries
            .get_mut(entry_id)
            .and_then(Option::as_mut)
            .ok_or(SlotFsError::NoSuchEntry(entry_id))?;

        if entry.used == cap {
            return Err(SlotFsError::StatementLimit { capacity: cap });
        }

        let guard = (entry.last + cap - 1) % cap;
        while entry.stmts[entry.last].is_some() && entry.last != guard {
            entry.last = (entry.last + 1) % cap;
        }
        if entry.stmts[entry.last].is_some() {
            // `used` said there was room but the scan found none. The slot
            // table is the authority; report the inconsistency instead of
            // overwriting a live handle.
            tracing::warn!(
                entry_id,
                used = entry.used,
                "statement slot scan found no free slot"
            );
            return Err(SlotFsError::StatementSlotsInconsistent { entry_id });
        }

        entry.stmts[entry.last] = Some(stmt);
        entry.used += 1;
        tracing::debug!(
            entry_id,
            slot_id = entry.last,
            open = entry.used,
            "claimed statement slot"
        );
        Ok(entry.last)
    }

    /// Clear the statement slot, returning the handle it held.
    ///
    /// Releasing an empty or out-of-range slot is a safe no-op. The scan
    /// cursor stays where it is; pointing it at the freed slot would
    /// shorten the next scan, but the bookkeeping has never done that.
    pub fn release_statement(&mut self, entry_id: usize, slot_id: usize) -> Option<S> {
        let entry = self.entries.get_mut(entry_id)?.as_mut()?;
        let stmt = entry.stmts.get_mut(slot_id)?.take();
        if stmt.is_some() {
            entry.used -= 1;
            tracing::debug!(entry_id, slot_id, open = entry.used, "released statement slot");
        }
        stmt
    }

    /// Borrow the statement at `(entry_id, slot_id)`, if occupied.
    pub fn get_statement(&self, entry_id: usize, slot_id: usize) -> Option<&S> {
        self.get_entry(entry_id)?.statement(slot_id)
    }

    /// Drain every occupied statement slot of `entry_id`.
    ///
    /// Used by connection teardown to finalize everything still open.
    pub fn release_all_statements(&mut self, entry_id: usize) -> Vec<S> {
        let Some(entry) = self.entries.get_mut(entry_id).and_then(Option::as_mut) else {
            return Vec::new();
        };
        let drained: Vec<S> = entry.stmts.iter_mut().filter_map(Option::take).collect();
        entry.used = 0;
        drained
    }
}
