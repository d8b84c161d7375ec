//! SQLite VFS registration
//!
//! Bridges a [`MemoryVfs`] into a linked SQLite library through the
//! `sqlite3_vfs` / `sqlite3_io_methods` C contract. The engine hands
//! this layer the 1–2 byte path tokens it was given as database names
//! (plus the `-journal` names it derives itself) and every call lands on
//! the safe adapter.
//!
//! The file half of the contract: SQLite allocates `szOsFile` bytes and
//! `x_open` plants a boxed [`MemoryFile`] behind the `sqlite3_file`
//! header; `x_close` reclaims it.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use libsqlite3_sys as ffi;

use crate::error::{Result, SlotFsError};
use crate::path::EntryPath;
use crate::vfs::memory::{MemoryFile, MemoryVfs};
use crate::vfs::{AccessMode, LockLevel, OpenFlags, Vfs, VfsFile};

/// Name the adapter registers under and connections select with.
pub const VFS_NAME: &str = "slotfs";

/// One token byte plus the engine's "-journal" suffix.
const MAX_PATHNAME: c_int = 1 + 8;

/// Registration state owned by the `sqlite3_vfs.pAppData` pointer.
struct VfsState {
    vfs: MemoryVfs,
    name: CString,
}

/// `sqlite3_file` payload: the base header SQLite requires first, then
/// the boxed safe handle.
#[repr(C)]
struct FfiFile {
    base: ffi::sqlite3_file,
    file: *mut MemoryFile,
}

static IO_METHODS: ffi::sqlite3_io_methods = ffi::sqlite3_io_methods {
    iVersion: 1,
    xClose: Some(x_close),
    xRead: Some(x_read),
    xWrite: Some(x_write),
    xTruncate: Some(x_truncate),
    xSync: Some(x_sync),
    xFileSize: Some(x_file_size),
    xLock: Some(x_lock),
    xUnlock: Some(x_unlock),
    xCheckReservedLock: Some(x_check_reserved_lock),
    xFileControl: Some(x_file_control),
    xSectorSize: Some(x_sector_size),
    xDeviceCharacteristics: Some(x_device_characteristics),
    xShmMap: None,
    xShmLock: None,
    xShmBarrier: None,
    xShmUnmap: None,
    xFetch: None,
    xUnfetch: None,
};

/// Register `vfs` with the linked SQLite under [`VFS_NAME`].
///
/// Fails if a VFS of that name is already registered. The adapter stays
/// registered (and its registry alive) until [`unregister`].
pub fn register(vfs: MemoryVfs) -> Result<()> {
    let name = CString::new(VFS_NAME).map_err(|_| SlotFsError::VfsRegistration(ffi::SQLITE_ERROR))?;

    unsafe {
        if !ffi::sqlite3_vfs_find(name.as_ptr()).is_null() {
            return Err(SlotFsError::VfsRegistration(ffi::SQLITE_ERROR));
        }
    }

    let state = Box::new(VfsState { vfs, name });
    let z_name = state.name.as_ptr();

    let vfs_box = Box::new(ffi::sqlite3_vfs {
        iVersion: 1,
        szOsFile: std::mem::size_of::<FfiFile>() as c_int,
        mxPathname: MAX_PATHNAME,
        pNext: ptr::null_mut(),
        zName: z_name,
        pAppData: Box::into_raw(state) as *mut c_void,
        xOpen: Some(x_open),
        xDelete: Some(x_delete),
        xAccess: Some(x_access),
        xFullPathname: Some(x_full_pathname),
        xDlOpen: Some(x_dlopen),
        xDlError: Some(x_dlerror),
        xDlSym: Some(x_dlsym),
        xDlClose: Some(x_dlclose),
        xRandomness: Some(x_randomness),
        xSleep: Some(x_sleep),
        xCurrentTime: Some(x_current_time),
        xGetLastError: None,
        xCurrentTimeInt64: None,
        xSetSystemCall: None,
        xGetSystemCall: None,
        xNextSystemCall: None,
    });

    let raw = Box::into_raw(vfs_box);
    let rc = unsafe { ffi::sqlite3_vfs_register(raw, 0) };
    if rc != ffi::SQLITE_OK {
        // Reclaim what registration did not take.
        unsafe {
            let vfs_box = Box::from_raw(raw);
            drop(Box::from_raw(vfs_box.pAppData as *mut VfsState));
        }
        return Err(SlotFsError::VfsRegistration(rc));
    }
    tracing::debug!(name = VFS_NAME, "registered VFS");
    Ok(())
}

/// Unregister the adapter and release its registration state.
///
/// Every connection opened through the VFS must be closed first.
pub fn unregister() -> Result<()> {
    let name = CString::new(VFS_NAME).map_err(|_| SlotFsError::VfsRegistration(ffi::SQLITE_ERROR))?;
    unsafe {
        let raw = ffi::sqlite3_vfs_find(name.as_ptr());
        if raw.is_null() {
            return Err(SlotFsError::VfsRegistration(ffi::SQLITE_NOTFOUND));
        }
        let rc = ffi::sqlite3_vfs_unregister(raw);
        if rc != ffi::SQLITE_OK {
            return Err(SlotFsError::VfsRegistration(rc));
        }
        let vfs_box = Box::from_raw(raw);
        drop(Box::from_raw(vfs_box.pAppData as *mut VfsState));
    }
    tracing::debug!(name = VFS_NAME, "unregistered VFS");
    Ok(())
}

unsafe fn state<'a>(p_vfs: *mut ffi::sqlite3_vfs) -> &'a VfsState {
    &*((*p_vfs).pAppData as *const VfsState)
}

unsafe fn file_mut<'a>(p_file: *mut ffi::sqlite3_file) -> Option<&'a mut MemoryFile> {
    let slot = &mut *(p_file as *mut FfiFile);
    slot.file.as_mut()
}

unsafe fn decode_path(z_path: *const c_char) -> Option<EntryPath> {
    if z_path.is_null() {
        return None;
    }
    EntryPath::decode(CStr::from_ptr(z_path).to_bytes())
}

// --- io methods ---

unsafe extern "C" fn x_close(p_file: *mut ffi::sqlite3_file) -> c_int {
    let slot = &mut *(p_file as *mut FfiFile);
    if !slot.file.is_null() {
        drop(Box::from_raw(slot.file));
        slot.file = ptr::null_mut();
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_read(
    p_file: *mut ffi::sqlite3_file,
    buf: *mut c_void,
    amt: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    if offset < 0 || amt < 0 {
        return ffi::SQLITE_IOERR_READ;
    }
    let Some(file) = file_mut(p_file) else {
        return ffi::SQLITE_IOERR_READ;
    };
    let out = std::slice::from_raw_parts_mut(buf as *mut u8, amt as usize);
    match file.read(out, offset as u64) {
        // Tail already zero-filled by the adapter on a short read.
        Ok(n) if n == amt as usize => ffi::SQLITE_OK,
        Ok(_) => ffi::SQLITE_IOERR_SHORT_READ,
        Err(_) => ffi::SQLITE_IOERR_READ,
    }
}

unsafe extern "C" fn x_write(
    p_file: *mut ffi::sqlite3_file,
    buf: *const c_void,
    amt: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    if offset < 0 || amt < 0 {
        return ffi::SQLITE_IOERR_WRITE;
    }
    let Some(file) = file_mut(p_file) else {
        return ffi::SQLITE_IOERR_WRITE;
    };
    let data = std::slice::from_raw_parts(buf as *const u8, amt as usize);
    match file.write(data, offset as u64) {
        Ok(()) => ffi::SQLITE_OK,
        Err(SlotFsError::OutOfMemory { .. }) => ffi::SQLITE_IOERR_NOMEM,
        Err(_) => ffi::SQLITE_IOERR_WRITE,
    }
}

unsafe extern "C" fn x_truncate(
    p_file: *mut ffi::sqlite3_file,
    size: ffi::sqlite3_int64,
) -> c_int {
    if size < 0 {
        return ffi::SQLITE_IOERR_TRUNCATE;
    }
    let Some(file) = file_mut(p_file) else {
        return ffi::SQLITE_IOERR_TRUNCATE;
    };
    match file.truncate(size as u64) {
        Ok(()) => ffi::SQLITE_OK,
        Err(_) => ffi::SQLITE_IOERR_TRUNCATE,
    }
}

unsafe extern "C" fn x_sync(p_file: *mut ffi::sqlite3_file, _flags: c_int) -> c_int {
    match file_mut(p_file).map(VfsFile::sync) {
        Some(Ok(())) => ffi::SQLITE_OK,
        _ => ffi::SQLITE_IOERR_FSYNC,
    }
}

unsafe extern "C" fn x_file_size(
    p_file: *mut ffi::sqlite3_file,
    p_size: *mut ffi::sqlite3_int64,
) -> c_int {
    let Some(file) = file_mut(p_file) else {
        return ffi::SQLITE_IOERR_FSTAT;
    };
    match file.file_size() {
        Ok(size) => {
            *p_size = size as ffi::sqlite3_int64;
            ffi::SQLITE_OK
        }
        Err(_) => ffi::SQLITE_IOERR_FSTAT,
    }
}

unsafe extern "C" fn x_lock(p_file: *mut ffi::sqlite3_file, level: c_int) -> c_int {
    match file_mut(p_file).map(|f| f.lock(LockLevel::from_raw(level))) {
        Some(Ok(())) => ffi::SQLITE_OK,
        _ => ffi::SQLITE_IOERR_LOCK,
    }
}

unsafe extern "C" fn x_unlock(p_file: *mut ffi::sqlite3_file, level: c_int) -> c_int {
    match file_mut(p_file).map(|f| f.unlock(LockLevel::from_raw(level))) {
        Some(Ok(())) => ffi::SQLITE_OK,
        _ => ffi::SQLITE_IOERR_UNLOCK,
    }
}

unsafe extern "C" fn x_check_reserved_lock(
    p_file: *mut ffi::sqlite3_file,
    p_res_out: *mut c_int,
) -> c_int {
    let reserved = file_mut(p_file)
        .and_then(|f| f.check_reserved_lock().ok())
        .unwrap_or(false);
    *p_res_out = c_int::from(reserved);
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_file_control(
    _p_file: *mut ffi::sqlite3_file,
    _op: c_int,
    _p_arg: *mut c_void,
) -> c_int {
    ffi::SQLITE_NOTFOUND
}

unsafe extern "C" fn x_sector_size(p_file: *mut ffi::sqlite3_file) -> c_int {
    file_mut(p_file).map_or(0, |f| f.sector_size() as c_int)
}

unsafe extern "C" fn x_device_characteristics(p_file: *mut ffi::sqlite3_file) -> c_int {
    file_mut(p_file).map_or(0, |f| f.device_characteristics() as c_int)
}

// --- vfs methods ---

unsafe extern "C" fn x_open(
    p_vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    p_file: *mut ffi::sqlite3_file,
    flags: c_int,
    p_out_flags: *mut c_int,
) -> c_int {
    let slot = &mut *(p_file as *mut FfiFile);
    slot.base.pMethods = ptr::null();
    slot.file = ptr::null_mut();

    let path = if z_name.is_null() {
        None
    } else {
        match decode_path(z_name) {
            Some(path) => Some(path),
            None => return ffi::SQLITE_CANTOPEN,
        }
    };

    let open_flags = OpenFlags {
        create: flags & ffi::SQLITE_OPEN_CREATE != 0,
        read_write: flags & ffi::SQLITE_OPEN_READWRITE != 0,
        delete_on_close: flags & ffi::SQLITE_OPEN_DELETEONCLOSE != 0,
    };
    match state(p_vfs).vfs.open(path.as_ref(), open_flags) {
        Ok(file) => {
            slot.file = Box::into_raw(Box::new(file));
            slot.base.pMethods = &IO_METHODS;
            if !p_out_flags.is_null() {
                *p_out_flags = flags;
            }
            ffi::SQLITE_OK
        }
        Err(_) => ffi::SQLITE_CANTOPEN,
    }
}

unsafe extern "C" fn x_delete(
    p_vfs: *mut ffi::sqlite3_vfs,
    z_path: *const c_char,
    _dir_sync: c_int,
) -> c_int {
    if let Some(path) = decode_path(z_path) {
        // delete() cannot fail for the memory adapter; an unknown path is
        // a no-op either way.
        let _ = state(p_vfs).vfs.delete(&path);
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_access(
    p_vfs: *mut ffi::sqlite3_vfs,
    z_path: *const c_char,
    flags: c_int,
    p_res_out: *mut c_int,
) -> c_int {
    let mode = if flags == ffi::SQLITE_ACCESS_EXISTS {
        AccessMode::Exists
    } else if flags == ffi::SQLITE_ACCESS_READ {
        AccessMode::Read
    } else {
        AccessMode::ReadWrite
    };
    let allowed = decode_path(z_path)
        .map(|path| state(p_vfs).vfs.access(&path, mode).unwrap_or(false))
        .unwrap_or(false);
    *p_res_out = c_int::from(allowed);
    ffi::SQLITE_OK
}

/// Path names are fixed-width tokens; a full path is the same two
/// meaningful bytes (the second preserves the journal flag) plus NUL.
unsafe extern "C" fn x_full_pathname(
    _p_vfs: *mut ffi::sqlite3_vfs,
    z_path: *const c_char,
    n_out: c_int,
    z_out: *mut c_char,
) -> c_int {
    if n_out < 3 || z_path.is_null() {
        return ffi::SQLITE_CANTOPEN;
    }
    let bytes = CStr::from_ptr(z_path).to_bytes();
    *z_out = bytes.first().map_or(0, |&b| b as c_char);
    *z_out.add(1) = bytes.get(1).map_or(0, |&b| b as c_char);
    *z_out.add(2) = 0;
    ffi::SQLITE_OK
}

// Extension loading is permanently unsupported: no dynamic code loading
// in this environment.

unsafe extern "C" fn x_dlopen(
    _p_vfs: *mut ffi::sqlite3_vfs,
    _z_path: *const c_char,
) -> *mut c_void {
    ptr::null_mut()
}

unsafe extern "C" fn x_dlerror(_p_vfs: *mut ffi::sqlite3_vfs, n_byte: c_int, z_err: *mut c_char) {
    const MSG: &[u8] = b"Loadable extensions are not supported";
    if n_byte <= 0 || z_err.is_null() {
        return;
    }
    let n = MSG.len().min(n_byte as usize - 1);
    for (i, &b) in MSG[..n].iter().enumerate() {
        *z_err.add(i) = b as c_char;
    }
    *z_err.add(n) = 0;
}

unsafe extern "C" fn x_dlsym(
    _p_vfs: *mut ffi::sqlite3_vfs,
    _handle: *mut c_void,
    _z_symbol: *const c_char,
) -> Option<unsafe extern "C" fn(*mut ffi::sqlite3_vfs, *mut c_void, *const c_char)> {
    None
}

unsafe extern "C" fn x_dlclose(_p_vfs: *mut ffi::sqlite3_vfs, _handle: *mut c_void) {}

unsafe extern "C" fn x_randomness(
    p_vfs: *mut ffi::sqlite3_vfs,
    n_byte: c_int,
    z_out: *mut c_char,
) -> c_int {
    if n_byte <= 0 || z_out.is_null() {
        return 0;
    }
    let out = std::slice::from_raw_parts_mut(z_out as *mut u8, n_byte as usize);
    state(p_vfs).vfs.randomness(out);
    n_byte
}

unsafe extern "C" fn x_sleep(_p_vfs: *mut ffi::sqlite3_vfs, _micros: c_int) -> c_int {
    // Nothing to yield to; report zero time slept.
    0
}

unsafe extern "C" fn x_current_time(p_vfs: *mut ffi::sqlite3_vfs, p_time: *mut f64) -> c_int {
    *p_time = state(p_vfs).vfs.current_time();
    ffi::SQLITE_OK
}
