//! Mapped file lifecycle, growth, and bounds-checked I/O.

use super::header::{FileHeader, HeaderLayout, HEADER_SIZE};
use super::{INITIAL_CAPACITY, MAX_IO_SIZE};
use crate::error::{Result, StowageError};
use memmap2::MmapMut;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Shared mapped-file state.
///
/// Everything that must change together during a grow lives behind one lock
/// so readers can never observe a half-installed mapping.
#[derive(Debug)]
struct MapInner {
    /// The live memory mapping, always exactly `capacity` bytes long.
    mmap: MmapMut,
    /// The underlying file handle; kept open for the mapping's lifetime.
    file: File,
    /// Total file size in bytes, header included.
    capacity: u64,
}

/// A growable, persistent, memory-mapped byte store.
///
/// The handle owns the backing file and its mapping. Reads take a shared
/// lock and return owned copies; writes take the exclusive lock, grow the
/// file in place when needed, and flush synchronously. The handle is shared
/// across threads by reference and consumed by [`MappedFile::close`].
#[derive(Debug)]
pub struct MappedFile {
    inner: RwLock<MapInner>,
    path: PathBuf,
    is_new: bool,
}

/// Map the whole file and check the mapping came back at the expected size.
fn map_file(file: &File, expected_len: u64, path: &Path) -> Result<MmapMut> {
    // SAFETY: the file is opened read-write and the handle stays owned by
    // the caller's inner state for the mapping's whole lifetime. Nothing in
    // this module touches the file contents except through the mapping, and
    // every access is bounds-checked against the tracked capacity.
    let mmap = unsafe { MmapMut::map_mut(file) }.map_err(|e| StowageError::Io {
        path: path.to_path_buf(),
        op: "mmap",
        cause: e.to_string(),
    })?;

    let mapped_len = mmap.len() as u64;
    if mapped_len != expected_len {
        return Err(StowageError::InvariantViolation {
            what: "mapped region length",
            expected: expected_len,
            actual: mapped_len,
        });
    }
    Ok(mmap)
}

impl MapInner {
    /// Rewrite the header from current state and flush it to disk.
    fn write_header(&mut self, path: &Path) -> Result<()> {
        let header = FileHeader::new(&HeaderLayout::CURRENT, self.capacity);
        self.mmap[..HEADER_SIZE].copy_from_slice(&header.encode());
        self.mmap
            .flush_range(0, HEADER_SIZE)
            .map_err(|e| StowageError::Io {
                path: path.to_path_buf(),
                op: "flush",
                cause: e.to_string(),
            })
    }

    /// Grow the file so that byte `required_end` is addressable.
    ///
    /// No-op when the request already fits. Otherwise the current mapping is
    /// flushed, the file extended with one header-size of headroom past the
    /// requested end, and a replacement mapping installed and re-verified.
    /// The header is rewritten with the new capacity before the write that
    /// triggered the grow proceeds.
    ///
    /// Callers hold the exclusive lock, so the size check and the extension
    /// happen under one critical section.
    fn ensure_capacity(&mut self, required_end: u64, path: &Path) -> Result<()> {
        if required_end <= self.capacity {
            return Ok(());
        }

        let Some(new_capacity) = required_end.checked_add(HEADER_SIZE as u64) else {
            return Err(StowageError::TooLarge {
                requested: required_end,
                ceiling: u64::MAX - HEADER_SIZE as u64,
            });
        };

        tracing::debug!(
            path = %path.display(),
            old_capacity = self.capacity,
            new_capacity,
            "growing mapped region"
        );

        self.mmap.flush().map_err(|e| StowageError::Io {
            path: path.to_path_buf(),
            op: "flush",
            cause: e.to_string(),
        })?;
        self.file
            .set_len(new_capacity)
            .map_err(|e| StowageError::Io {
                path: path.to_path_buf(),
                op: "truncate",
                cause: e.to_string(),
            })?;

        // The old mapping is replaced by assignment and unmapped on drop.
        self.mmap = map_file(&self.file, new_capacity, path)?;
        self.capacity = new_capacity;
        self.write_header(path)
    }
}

impl MappedFile {
    /// Open the backing file at `path`, creating it when absent.
    ///
    /// A missing or zero-length file is initialized to
    /// [`INITIAL_CAPACITY`](super::INITIAL_CAPACITY) bytes with a fresh
    /// header. An existing file is mapped at its current length and its
    /// header validated; files that fail validation are rejected as
    /// [`StowageError::CorruptHeader`] and left untouched.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| StowageError::Io {
                path: path.clone(),
                op: "open",
                cause: e.to_string(),
            })?;

        let file_len = file
            .metadata()
            .map_err(|e| StowageError::Io {
                path: path.clone(),
                op: "metadata",
                cause: e.to_string(),
            })?
            .len();

        if file_len == 0 {
            file.set_len(INITIAL_CAPACITY).map_err(|e| StowageError::Io {
                path: path.clone(),
                op: "truncate",
                cause: e.to_string(),
            })?;

            let mmap = map_file(&file, INITIAL_CAPACITY, &path)?;
            let mut inner = MapInner {
                mmap,
                file,
                capacity: INITIAL_CAPACITY,
            };
            inner.write_header(&path)?;

            tracing::info!(
                path = %path.display(),
                capacity = INITIAL_CAPACITY,
                "created initial file structure"
            );

            Ok(Self {
                inner: RwLock::new(inner),
                path,
                is_new: true,
            })
        } else {
            let mmap = map_file(&file, file_len, &path)?;

            let header =
                FileHeader::decode(&mmap[..]).map_err(|cause| StowageError::CorruptHeader {
                    path: path.clone(),
                    cause,
                })?;
            if let Err(cause) = header.validate(&HeaderLayout::CURRENT, file_len) {
                tracing::warn!(path = %path.display(), %cause, "header validation failed");
                return Err(StowageError::CorruptHeader { path, cause });
            }

            tracing::debug!(
                path = %path.display(),
                capacity = file_len,
                "using existing backing file"
            );

            Ok(Self {
                inner: RwLock::new(MapInner {
                    mmap,
                    file,
                    capacity: file_len,
                }),
                path,
                is_new: false,
            })
        }
    }

    /// Write `data` at `position` and return the number of bytes written.
    ///
    /// Positions are payload-relative: position 0 is the first byte after
    /// the header. A write past the current end grows the file in place;
    /// the touched range is flushed before returning, so a successful write
    /// is durable. Writes longer than
    /// [`MAX_IO_SIZE`](super::MAX_IO_SIZE), and positions too large to
    /// address, are rejected as [`StowageError::TooLarge`].
    pub fn write(&self, data: &[u8], position: u64) -> Result<usize> {
        let len = data.len() as u64;
        if len > MAX_IO_SIZE {
            return Err(StowageError::TooLarge {
                requested: len,
                ceiling: MAX_IO_SIZE,
            });
        }

        let Some(end) = (HEADER_SIZE as u64)
            .checked_add(position)
            .and_then(|start| start.checked_add(len))
        else {
            return Err(StowageError::TooLarge {
                requested: position,
                ceiling: u64::MAX - HEADER_SIZE as u64,
            });
        };
        let start = end - len;

        let mut inner = self.inner.write();
        if end > inner.capacity {
            inner.ensure_capacity(end, &self.path)?;
        }

        let mapped_len = inner.mmap.len() as u64;
        let dst = inner
            .mmap
            .get_mut(start as usize..end as usize)
            .ok_or(StowageError::InvariantViolation {
                what: "write destination",
                expected: end,
                actual: mapped_len,
            })?;
        dst.copy_from_slice(data);

        if !data.is_empty() {
            inner
                .mmap
                .flush_range(start as usize, data.len())
                .map_err(|e| StowageError::Io {
                    path: self.path.clone(),
                    op: "flush",
                    cause: e.to_string(),
                })?;
        }

        Ok(data.len())
    }

    /// Read `length` bytes starting at `position + offset`.
    ///
    /// Returns an owned copy; the buffer stays valid however the store
    /// grows afterwards. Ranges past the current capacity are rejected as
    /// [`StowageError::OutOfRange`] and reads longer than
    /// [`MAX_IO_SIZE`](super::MAX_IO_SIZE) as [`StowageError::TooLarge`],
    /// neither of which allocates.
    pub fn read(&self, position: u64, length: u64, offset: u64) -> Result<Vec<u8>> {
        let inner = self.inner.read();

        let Some(end) = (HEADER_SIZE as u64)
            .checked_add(position)
            .and_then(|s| s.checked_add(offset))
            .and_then(|s| s.checked_add(length))
        else {
            return Err(StowageError::OutOfRange {
                position,
                length,
                offset,
                capacity: inner.capacity,
            });
        };
        if end > inner.capacity {
            return Err(StowageError::OutOfRange {
                position,
                length,
                offset,
                capacity: inner.capacity,
            });
        }
        if length > MAX_IO_SIZE {
            return Err(StowageError::TooLarge {
                requested: length,
                ceiling: MAX_IO_SIZE,
            });
        }

        let start = end - length;
        let mapped_len = inner.mmap.len() as u64;
        let src = inner
            .mmap
            .get(start as usize..end as usize)
            .ok_or(StowageError::InvariantViolation {
                what: "read source",
                expected: end,
                actual: mapped_len,
            })?;

        Ok(src.to_vec())
    }

    /// Flush the whole mapping to disk.
    pub fn flush(&self) -> Result<()> {
        let inner = self.inner.read();
        inner.mmap.flush().map_err(|e| StowageError::Io {
            path: self.path.clone(),
            op: "flush",
            cause: e.to_string(),
        })
    }

    /// Total capacity in bytes, header included.
    pub fn capacity(&self) -> u64 {
        self.inner.read().capacity
    }

    /// Whether this handle created the backing file.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// The backing file's path as a display string.
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// The backing file's path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the store: rewrite the header, flush everything, unmap, and
    /// release the file handle.
    ///
    /// Consuming the handle makes use-after-close unrepresentable. A flush
    /// failure is returned, but the mapping and file handle are released
    /// regardless.
    pub fn close(self) -> Result<()> {
        tracing::debug!(path = %self.path.display(), "closing mapped file");

        let mut inner = self.inner.into_inner();
        inner.write_header(&self.path)?;
        inner.mmap.flush().map_err(|e| StowageError::Io {
            path: self.path.clone(),
            op: "flush",
            cause: e.to_string(),
        })?;
        Ok(())
    }
}
