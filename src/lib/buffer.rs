use crate::error::PathErr;

use std::ffi::{CStr, CString, OsStr};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use log::error;

pub const SEPARATOR: u8 = b'/';

/// Hands out the byte buffers that become a [`SysPath`].
///
/// Allocation is fallible so exhaustion can be reported instead of aborting.
pub trait BufferAlloc {
    fn alloc(&self, capacity: usize) -> Result<Vec<u8>, PathErr>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAlloc;

impl BufferAlloc for HeapAlloc {
    fn alloc(&self, capacity: usize) -> Result<Vec<u8>, PathErr> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity).map_err(|_| PathErr::OutOfMemory)?;
        Ok(buf)
    }
}

impl<A: BufferAlloc + ?Sized> BufferAlloc for &A {
    fn alloc(&self, capacity: usize) -> Result<Vec<u8>, PathErr> {
        (**self).alloc(capacity)
    }
}

/// An owned, null-terminated directory path that always ends in a separator.
#[derive(Clone, PartialEq, Eq)]
pub struct SysPath {
    buf: CString,
}

impl SysPath {
    /// Joins `parts` with single separators and terminates the result with a
    /// separator and a NUL. Separators already at the edges of a part are not
    /// doubled.
    pub fn build<A, I, S>(alloc: &A, parts: I) -> Result<SysPath, PathErr>
    where
        A: BufferAlloc + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let parts: Vec<S> = parts.into_iter().collect();
        let pieces: Vec<&[u8]> = parts.iter()
            .enumerate()
            .map(|(i, part)| trim_part(part.as_ref().as_bytes(), i == 0))
            .collect();

        // Each piece plus its trailing separator, then the terminator.
        let len = pieces.iter().map(|p| p.len() + 1).sum::<usize>() + 1;
        let mut buf = alloc.alloc(len).map_err(|e| {
            error!("Couldn't allocate {len} bytes for a path");
            e
        })?;

        for piece in pieces {
            if piece.contains(&0) {
                return Err(PathErr::InvalidParam("path".to_owned()));
            }
            buf.extend_from_slice(piece);
            if buf.last() != Some(&SEPARATOR) {
                buf.push(SEPARATOR);
            }
        }
        if buf.is_empty() {
            buf.push(SEPARATOR);
        }
        buf.push(0);

        let buf = CString::from_vec_with_nul(buf)
            .map_err(|_| PathErr::InvalidParam("path".to_owned()))?;
        Ok(SysPath { buf })
    }

    pub fn as_path(&self) -> &Path {
        Path::new(OsStr::from_bytes(self.as_bytes()))
    }

    pub fn as_c_str(&self) -> &CStr {
        &self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.buf.as_bytes_with_nul()
    }

    pub fn into_c_string(self) -> CString {
        self.buf
    }

    pub fn into_path_buf(self) -> PathBuf {
        PathBuf::from(OsStr::from_bytes(self.as_bytes()))
    }
}

// The leading part keeps its root separator; every other part is trimmed on
// both sides.
fn trim_part(part: &[u8], leading: bool) -> &[u8] {
    let mut end = part.len();
    while end > 0 && part[end - 1] == SEPARATOR {
        end -= 1;
    }
    let mut start = 0;
    if !leading {
        while start < end && part[start] == SEPARATOR {
            start += 1;
        }
    }
    &part[start..end]
}

impl AsRef<Path> for SysPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl fmt::Display for SysPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_path().display())
    }
}

impl fmt::Debug for SysPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SysPath").field(&self.buf).finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
