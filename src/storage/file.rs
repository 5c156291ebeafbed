//! File-backed page store.
//!
//! A single backing file holds every page ever allocated. Allocation appends
//! the page image at the current end of file and hands the byte offset back
//! as the page identifier, so reads are a single positional I/O at the
//! identifier itself. `free` is accepted and ignored: space is not reclaimed,
//! which keeps the write path a straight append.
//!
//! Identifier 0 is reserved, so on an empty file allocation starts at offset
//! `page_size`; the first page-sized span of the file is left as a hole.
//!
//! The root identifier is not persisted anywhere in the file. Re-opening an
//! existing file therefore always yields an empty tree whose new pages append
//! after the old content.
//!
//! Positional reads take `&File` and need no seek, so concurrent readers are
//! safe; writes go through `&mut self` and are serialized by the caller.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use tracing::debug;

use super::{PageId, PageStore, PAGE_SIZE};

#[derive(Debug)]
pub struct FileStore {
    file: File,
    /// Offset at which the next page will be written.
    end: u64,
    page_size: usize,
}

impl FileStore {
    /// Opens or creates the backing file at `path`, creating missing parent
    /// directories first.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_page_size(path, PAGE_SIZE)
    }

    pub fn with_page_size(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .wrap_err_with(|| format!("failed to create directory {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .wrap_err_with(|| format!("failed to open {}", path.display()))?;

        let len = file.metadata()?.len();
        // Offset 0 is the reserved null identifier; never place a page there.
        let end = len.max(page_size as u64);

        debug!(path = %path.display(), len, "filestore.open");

        Ok(Self {
            file,
            end,
            page_size,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Flushes all written pages to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().wrap_err("failed to sync backing file")
    }
}

impl PageStore for FileStore {
    fn read(&self, id: PageId) -> Result<Vec<u8>> {
        ensure!(!id.is_none(), "page id 0 is reserved");

        let mut buf = vec![0u8; self.page_size];
        read_exact_at(&self.file, id.as_raw(), &mut buf)
            .wrap_err_with(|| format!("failed to read page {}", id))?;
        Ok(buf)
    }

    fn allocate(&mut self, page: &[u8]) -> Result<PageId> {
        ensure!(
            page.len() == self.page_size,
            "allocation of {} bytes does not match the page size {}",
            page.len(),
            self.page_size
        );

        let offset = self.end;
        write_all_at(&self.file, offset, page)
            .wrap_err_with(|| format!("failed to write page at offset {}", offset))?;
        self.end = offset + page.len() as u64;
        Ok(PageId::from_raw(offset))
    }

    fn free(&mut self, _id: PageId) -> Result<()> {
        // Freed offsets are discarded; the file never shrinks.
        Ok(())
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, off: u64, dst: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(dst, off)
}

#[cfg(unix)]
fn write_all_at(file: &File, off: u64, src: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(src, off)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut off: u64, mut dst: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !dst.is_empty() {
        let read = file.seek_read(dst, off)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "seek_read reached EOF",
            ));
        }
        let (_, tail) = dst.split_at_mut(read);
        dst = tail;
        off += read as u64;
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut off: u64, mut src: &[u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !src.is_empty() {
        let written = file.seek_write(src, off)?;
        if written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "seek_write wrote zero bytes",
            ));
        }
        src = &src[written..];
        off += written as u64;
    }
    Ok(())
}
