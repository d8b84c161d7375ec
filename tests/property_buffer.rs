//! Property tests for the buffer and path codec invariants.

use proptest::prelude::*;

use slotfs::{Buffer, EntryPath};

proptest! {
    /// Whatever was written is read back intact from the same offset.
    #[test]
    fn write_then_read_round_trips(
        data in proptest::collection::vec(any::<u8>(), 1..512),
        offset in 0usize..1024,
    ) {
        let mut buf = Buffer::new();
        prop_assert_eq!(buf.write(&data, offset).unwrap(), data.len());
        prop_assert_eq!(buf.size(), offset + data.len());

        let mut out = vec![0u8; data.len()];
        prop_assert_eq!(buf.read(&mut out, offset), data.len());
        prop_assert_eq!(out, data);
    }

    /// Bytes between the old capacity and the write offset come back zero.
    #[test]
    fn write_gap_is_zero_filled(
        data in proptest::collection::vec(1u8..=255, 1..64),
        gap in 1usize..256,
    ) {
        let mut buf = Buffer::new();
        buf.write(&data, gap).unwrap();

        let mut out = vec![0xFFu8; gap];
        prop_assert_eq!(buf.read(&mut out, 0), gap);
        prop_assert!(out.iter().all(|&b| b == 0));
    }

    /// Reads clip at capacity and never change it.
    #[test]
    fn read_clips_and_never_grows(
        len in 0usize..256,
        offset in 0usize..512,
        want in 1usize..128,
    ) {
        let mut buf = Buffer::new();
        buf.grow(len).unwrap();

        let mut out = vec![0u8; want];
        let n = buf.read(&mut out, offset);

        prop_assert_eq!(n, want.min(len.saturating_sub(offset)));
        prop_assert_eq!(buf.size(), len);
    }

    /// Growing never shrinks and never disturbs existing content.
    #[test]
    fn grow_preserves_prefix(
        data in proptest::collection::vec(any::<u8>(), 1..128),
        target in 0usize..512,
    ) {
        let mut buf = Buffer::new();
        buf.write(&data, 0).unwrap();
        buf.grow(target).unwrap();

        prop_assert_eq!(buf.size(), target.max(data.len()));
        let mut out = vec![0u8; data.len()];
        buf.read(&mut out, 0);
        prop_assert_eq!(out, data);
    }

    /// Every representable token survives an encode/decode trip, and
    /// main/journal tokens of one entry map to adjacent buffer ids.
    #[test]
    fn path_tokens_round_trip(entry_id in 0usize..0x7F) {
        let main = EntryPath::main(entry_id);
        let journal = EntryPath::journal(entry_id);

        prop_assert_eq!(EntryPath::decode(main.as_bytes()), Some(main));
        prop_assert_eq!(EntryPath::decode(journal.as_bytes()), Some(journal));
        prop_assert_eq!(main.entry_id(), entry_id);
        prop_assert_eq!(journal.buffer_id(), main.buffer_id() + 1);
    }

    /// Decoding tolerates arbitrary trailing bytes after the journal flag.
    #[test]
    fn path_decode_ignores_suffix(
        entry_id in 0usize..0x7F,
        suffix in proptest::collection::vec(any::<u8>(), 0..16),
    ) {
        let mut raw = Vec::from(EntryPath::journal(entry_id).as_bytes());
        raw.extend_from_slice(&suffix);

        let decoded = EntryPath::decode(&raw).unwrap();
        prop_assert_eq!(decoded.entry_id(), entry_id);
        prop_assert!(decoded.is_journal());
    }
}
