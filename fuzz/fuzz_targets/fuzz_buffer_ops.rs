#![no_main]
use libfuzzer_sys::{
    arbitrary::{Arbitrary, Unstructured},
    fuzz_target,
};
use slotfs::Buffer;

#[derive(Debug, Arbitrary)]
enum BufOp {
    Grow { target: u16 },
    Read { offset: u16, len: u8 },
    Write { offset: u16, data: Vec<u8> },
}

// Buffer invariants under arbitrary op sequences: size only ever grows,
// reads clip and never allocate.
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);
    let ops: Vec<BufOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let mut buf = Buffer::new();
    for op in ops.iter().take(64) {
        let before = buf.size();
        match op {
            BufOp::Grow { target } => {
                buf.grow(*target as usize).unwrap();
                assert!(buf.size() >= before);
                assert!(buf.size() >= *target as usize);
            }
            BufOp::Read { offset, len } => {
                let mut out = vec![0u8; *len as usize];
                let n = buf.read(&mut out, *offset as usize);
                assert!(n <= out.len());
                assert_eq!(buf.size(), before);
            }
            BufOp::Write { offset, data } => {
                let n = buf.write(data, *offset as usize).unwrap();
                assert_eq!(n, data.len());
                assert!(buf.size() >= *offset as usize + data.len());

                let mut out = vec![0u8; data.len()];
                assert_eq!(buf.read(&mut out, *offset as usize), data.len());
                assert_eq!(&out, data);
            }
        }
    }
});
