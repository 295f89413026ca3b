//! Memory-mapped file input
//!
//! A mapped file is read straight out of the page cache; `&[u8]` implements
//! `Read`, so a [`TypedBytesReader`](crate::protocol::TypedBytesReader) can
//! run over it without an intermediate buffer.

use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io;
use std::path::Path;

/// Read-only mapping of a TypedBytes file
pub struct MappedInput {
    // Zero-length files cannot be mapped on every platform
    mmap: Option<Mmap>,
}

impl MappedInput {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Self { mmap: None });
        }

        // SAFETY: the mapping is read-only; the file must not be truncated
        // while it is mapped
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Self { mmap: Some(mmap) })
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
