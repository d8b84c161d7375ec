#![no_main]
use libfuzzer_sys::fuzz_target;
use slotfs::EntryPath;

// Arbitrary bytes either decode to a consistent token or are rejected.
fuzz_target!(|input: &[u8]| {
    let Some(path) = EntryPath::decode(input) else {
        assert!(input.first().is_none_or(|&b| b == 0));
        return;
    };

    assert_eq!(path.entry_id(), input[0] as usize - 1);
    assert_eq!(path.is_journal(), input.get(1).is_some_and(|&b| b != 0));
    assert_eq!(path.buffer_id(), 2 * path.entry_id() + usize::from(path.is_journal()));

    // Re-encoding the token decodes back to itself.
    assert_eq!(EntryPath::decode(path.as_bytes()), Some(path));
});
