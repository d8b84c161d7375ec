#![no_main]
use libfuzzer_sys::{
    arbitrary::{Arbitrary, Unstructured},
    fuzz_target,
};
use slotfs::vfs::{OpenFlags, Vfs, VfsFile};
use slotfs::{EntryPath, Limits, MemoryVfs};

#[derive(Debug, Arbitrary)]
enum VfsOp {
    Open { entry: u8, journal: bool },
    Write { offset: u16, data: Vec<u8> },
    Read { offset: u16, len: u8 },
    Delete { entry: u8, journal: bool },
    Size,
}

fn path(entry: u8, journal: bool) -> EntryPath {
    let entry = (entry % 0x7F) as usize;
    if journal {
        EntryPath::journal(entry)
    } else {
        EntryPath::main(entry)
    }
}

// Drive the memory adapter with arbitrary op sequences; out-of-range
// opens must fail cleanly and every other op must uphold clip semantics.
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);
    let ops: Vec<VfsOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let vfs = MemoryVfs::new(&Limits::COMPACT);
    let mut file = None;

    for op in ops.iter().take(32) {
        match op {
            VfsOp::Open { entry, journal } => {
                file = vfs.open(Some(&path(*entry, *journal)), OpenFlags::default()).ok();
            }
            VfsOp::Write { offset, data } => {
                if let Some(f) = file.as_mut() {
                    f.write(data, u64::from(*offset)).unwrap();
                }
            }
            VfsOp::Read { offset, len } => {
                if let Some(f) = file.as_mut() {
                    let mut out = vec![0xFFu8; *len as usize];
                    let n = f.read(&mut out, u64::from(*offset)).unwrap();
                    assert!(out[n..].iter().all(|&b| b == 0));
                }
            }
            VfsOp::Delete { entry, journal } => {
                vfs.delete(&path(*entry, *journal)).unwrap();
            }
            VfsOp::Size => {
                if let Some(f) = file.as_ref() {
                    let _ = f.file_size().unwrap();
                }
            }
        }
    }
});
