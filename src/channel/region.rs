//! POSIX shared memory segment mapped into this process.

use crate::error::{DivError, Result};
use nix::fcntl::OFlag;
use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap, shm_open, shm_unlink};
use nix::sys::stat::Mode;
use std::ffi::c_void;
use std::fs::File;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

/// A mapped, fixed-size shared memory segment.
///
/// The creating side owns the name and unlinks it on [`ShmRegion::unlink`] or
/// drop; attached handles only unmap.
pub struct ShmRegion {
    name: String,
    base: NonNull<c_void>,
    size: usize,
    owner: bool,
    unlinked: bool,
}

impl ShmRegion {
    /// Create a new, zero-filled segment. Fails if the name already exists.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let fd = shm_open(
            name,
            OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_EXCL,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .map_err(|source| DivError::ShmCreate {
            name: name.to_string(),
            source,
        })?;
        let file = File::from(fd);

        if let Err(e) = file.set_len(size as u64) {
            let _ = shm_unlink(name);
            return Err(DivError::ShmResize {
                size,
                source: io_errno(&e),
            });
        }

        let base = match map(&file, size) {
            Ok(base) => base,
            Err(e) => {
                let _ = shm_unlink(name);
                return Err(e);
            }
        };

        let region = Self {
            name: name.to_string(),
            base,
            size,
            owner: true,
            unlinked: false,
        };
        // Safety: the mapping is `size` bytes long and writable.
        unsafe { std::ptr::write_bytes(region.base_ptr(), 0, size) };

        tracing::debug!(name, size, "Created shared memory segment");
        Ok(region)
    }

    /// Attach to a segment created by another process.
    pub fn open(name: &str, size: usize) -> Result<Self> {
        let fd = shm_open(name, OFlag::O_RDWR, Mode::empty()).map_err(|source| {
            DivError::ShmOpen {
                name: name.to_string(),
                source,
            }
        })?;
        let file = File::from(fd);

        // Touching pages past the end of a short segment raises SIGBUS.
        let actual = file.metadata()?.len();
        if actual < size as u64 {
            return Err(DivError::ShmOpen {
                name: name.to_string(),
                source: nix::errno::Errno::EINVAL,
            });
        }

        let base = map(&file, size)?;
        tracing::debug!(name, size, "Attached to shared memory segment");
        Ok(Self {
            name: name.to_string(),
            base,
            size,
            owner: false,
            unlinked: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn base_ptr(&self) -> *mut u8 {
        self.base.as_ptr().cast::<u8>()
    }

    /// Read the leading `u32`.
    pub(super) fn read_u32(&self) -> u32 {
        // Safety: mmap returns page-aligned memory of at least 4 bytes. Volatile
        // because the other process writes this word.
        unsafe { std::ptr::read_volatile(self.base_ptr().cast::<u32>()) }
    }

    /// Overwrite the leading `u32`.
    pub(super) fn write_u32(&mut self, value: u32) {
        // Safety: see `read_u32`.
        unsafe { std::ptr::write_volatile(self.base_ptr().cast::<u32>(), value) }
    }

    /// Copy `len` bytes starting at `offset` out of the segment.
    pub(super) fn read_bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        assert!(offset + len <= self.size, "read past end of region");
        let mut out = vec![0u8; len];
        // Safety: bounds checked above; `out` does not alias the mapping.
        unsafe {
            std::ptr::copy_nonoverlapping(self.base_ptr().add(offset), out.as_mut_ptr(), len);
        }
        out
    }

    /// Copy `data` into the segment at `offset`.
    pub(super) fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        assert!(offset + data.len() <= self.size, "write past end of region");
        // Safety: bounds checked above; `data` does not alias the mapping.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.base_ptr().add(offset), data.len());
        }
    }

    /// Remove the name from the system namespace. Existing mappings stay valid.
    pub fn unlink(&mut self) -> Result<()> {
        if self.unlinked {
            return Ok(());
        }
        shm_unlink(self.name.as_str()).map_err(|source| DivError::ShmUnlink {
            name: self.name.clone(),
            source,
        })?;
        self.unlinked = true;
        tracing::debug!(name = %self.name, "Unlinked shared memory segment");
        Ok(())
    }
}

impl Drop for ShmRegion {
    fn drop(&mut self) {
        // Safety: `base`/`size` came from a successful mmap and are unmapped once.
        if let Err(e) = unsafe { munmap(self.base, self.size) } {
            tracing::warn!(name = %self.name, error = %e, "munmap failed");
        }
        if self.owner && !self.unlinked {
            let _ = shm_unlink(self.name.as_str());
        }
    }
}

fn map(file: &File, size: usize) -> Result<NonNull<c_void>> {
    let length = NonZeroUsize::new(size).ok_or(DivError::ShmMap(nix::errno::Errno::EINVAL))?;
    // Safety: fresh shared mapping of a file we hold open; no existing Rust
    // references point into it.
    unsafe {
        mmap(
            None,
            length,
            ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
            MapFlags::MAP_SHARED,
            file,
            0,
        )
    }
    .map_err(DivError::ShmMap)
}

fn io_errno(e: &std::io::Error) -> nix::errno::Errno {
    e.raw_os_error()
        .map(nix::errno::Errno::from_raw)
        .unwrap_or(nix::errno::Errno::EIO)
}
