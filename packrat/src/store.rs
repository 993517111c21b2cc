//! Fixed-capacity record store.
//!
//! One node owns one store. Slots are the durable handles remote peers
//! use for retrieve/delete, so a record never moves once assigned:
//! deletion clears the slot in place and first-fit insertion reuses it
//! later. There is no compaction.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use crate::config::NodeConfig;
use crate::types::{NodeId, MAX_RECORD_TEXT};

/// A stored record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Seconds since boot when the record was stored.
    pub stored_at_secs: u32,
    /// Node that requested the create.
    pub owner: NodeId,
    /// Record text, at most [`MAX_RECORD_TEXT`] bytes.
    pub text: String,
}

/// Error type for store operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// Every slot is occupied.
    Full,
    /// Slot out of range or already empty.
    NoSuchSlot,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Full => write!(f, "record store full"),
            StoreError::NoSuchSlot => write!(f, "no record in that slot"),
        }
    }
}

/// Fixed-capacity table of records, keyed by slot index.
pub struct RecordStore<C> {
    slots: Vec<Option<Record>>,
    stored_total: u32,
    occupied: usize,
    _config: PhantomData<C>,
}

impl<C: NodeConfig> Default for RecordStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: NodeConfig> RecordStore<C> {
    /// Create an empty store with `C::MAX_RECORDS` slots.
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(C::MAX_RECORDS);
        slots.resize_with(C::MAX_RECORDS, || None);
        Self {
            slots,
            stored_total: 0,
            occupied: 0,
            _config: PhantomData,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        C::MAX_RECORDS
    }

    /// Currently occupied slots.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Records stored this session, monotonic (deletes do not decrement).
    pub fn stored_total(&self) -> u32 {
        self.stored_total
    }

    /// Returns true if no slot is free.
    pub fn is_full(&self) -> bool {
        self.occupied == C::MAX_RECORDS
    }

    /// Store a record in the lowest free slot and return its index.
    ///
    /// The text is truncated to [`MAX_RECORD_TEXT`] bytes (on a char
    /// boundary).
    pub fn insert(
        &mut self,
        owner: NodeId,
        text: &str,
        stored_at_secs: u32,
    ) -> Result<u8, StoreError> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(StoreError::Full)?;

        self.slots[slot] = Some(Record {
            stored_at_secs,
            owner,
            text: truncate_text(text),
        });
        self.stored_total += 1;
        self.occupied += 1;
        Ok(slot as u8)
    }

    /// Read the record in `slot`, if any. Out-of-range slots read as
    /// empty.
    pub fn get(&self, slot: u8) -> Option<&Record> {
        self.slots.get(slot as usize)?.as_ref()
    }

    /// Clear `slot`. Fails if the slot is out of range or already empty.
    pub fn delete(&mut self, slot: u8) -> Result<(), StoreError> {
        let entry = self
            .slots
            .get_mut(slot as usize)
            .ok_or(StoreError::NoSuchSlot)?;
        if entry.is_none() {
            return Err(StoreError::NoSuchSlot);
        }
        *entry = None;
        self.occupied -= 1;
        Ok(())
    }

    /// Occupied slots in ascending index order, for display.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (u8, &Record)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|r| (i as u8, r)))
    }

    /// Clear every slot and both counters, starting a fresh session.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.stored_total = 0;
        self.occupied = 0;
    }
}

/// Truncate to the wire limit without splitting a UTF-8 char.
fn truncate_text(text: &str) -> String {
    if text.len() <= MAX_RECORD_TEXT {
        return String::from(text);
    }
    let mut end = MAX_RECORD_TEXT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    String::from(&text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmallConfig;

    fn store() -> RecordStore<SmallConfig> {
        RecordStore::new()
    }

    #[test]
    fn test_insert_is_first_fit() {
        let mut s = store();
        assert_eq!(s.insert(1, "a", 0), Ok(0));
        assert_eq!(s.insert(2, "b", 1), Ok(1));
        assert_eq!(s.insert(1, "c", 2), Ok(2));

        // Free the middle slot; the next insert reuses it.
        s.delete(1).unwrap();
        assert_eq!(s.insert(3, "d", 3), Ok(1));
        assert_eq!(s.insert(3, "e", 4), Ok(3));
    }

    #[test]
    fn test_insert_full() {
        let mut s = store();
        for i in 0..SmallConfig::MAX_RECORDS {
            assert_eq!(s.insert(1, "x", 0), Ok(i as u8));
        }
        assert!(s.is_full());
        assert_eq!(s.insert(1, "x", 0), Err(StoreError::Full));
        assert_eq!(s.occupied(), SmallConfig::MAX_RECORDS);
    }

    #[test]
    fn test_delete_then_get_is_empty() {
        let mut s = store();
        let slot = s.insert(4, "hello", 10).unwrap();
        assert!(s.get(slot).is_some());
        s.delete(slot).unwrap();
        assert!(s.get(slot).is_none());
    }

    #[test]
    fn test_delete_invalid() {
        let mut s = store();
        assert_eq!(s.delete(0), Err(StoreError::NoSuchSlot));
        assert_eq!(s.delete(200), Err(StoreError::NoSuchSlot));

        s.insert(1, "a", 0).unwrap();
        s.delete(0).unwrap();
        assert_eq!(s.delete(0), Err(StoreError::NoSuchSlot));
    }

    #[test]
    fn test_get_out_of_range() {
        let s = store();
        assert!(s.get(SmallConfig::MAX_RECORDS as u8).is_none());
        assert!(s.get(255).is_none());
    }

    #[test]
    fn test_counters() {
        let mut s = store();
        s.insert(1, "a", 0).unwrap();
        s.insert(1, "b", 0).unwrap();
        assert_eq!(s.stored_total(), 2);
        assert_eq!(s.occupied(), 2);

        s.delete(0).unwrap();
        assert_eq!(s.stored_total(), 2);
        assert_eq!(s.occupied(), 1);
    }

    #[test]
    fn test_iter_occupied_ascending() {
        let mut s = store();
        s.insert(1, "a", 0).unwrap();
        s.insert(2, "b", 0).unwrap();
        s.insert(3, "c", 0).unwrap();
        s.delete(1).unwrap();

        let listed: alloc::vec::Vec<(u8, &str)> =
            s.iter_occupied().map(|(i, r)| (i, r.text.as_str())).collect();
        assert_eq!(listed, [(0, "a"), (2, "c")]);
    }

    #[test]
    fn test_record_fields() {
        let mut s = store();
        let slot = s.insert(9, "payload", 1234).unwrap();
        let record = s.get(slot).unwrap();
        assert_eq!(record.owner, 9);
        assert_eq!(record.stored_at_secs, 1234);
        assert_eq!(record.text, "payload");
    }

    #[test]
    fn test_text_truncated() {
        let mut s = store();
        let slot = s
            .insert(1, "this text is much longer than nineteen bytes", 0)
            .unwrap();
        assert_eq!(s.get(slot).unwrap().text.len(), MAX_RECORD_TEXT);
    }

    #[test]
    fn test_reset() {
        let mut s = store();
        s.insert(1, "a", 0).unwrap();
        s.insert(2, "b", 0).unwrap();
        s.reset();
        assert_eq!(s.occupied(), 0);
        assert_eq!(s.stored_total(), 0);
        assert!(s.iter_occupied().next().is_none());
        // Slots are reusable from index zero again.
        assert_eq!(s.insert(1, "c", 0), Ok(0));
    }
}
