//! Named POSIX semaphore used as a cross-process binary lock.

use crate::error::{DivError, Result};
use nix::errno::Errno;
use std::ffi::CString;

/// Handle to a named counting semaphore (`sem_open`).
pub struct NamedSemaphore {
    name: String,
    sem: *mut libc::sem_t,
    owner: bool,
    unlinked: bool,
}

impl NamedSemaphore {
    /// Create a new semaphore with the given initial value. Fails if the name exists.
    pub fn create(name: &str, initial: u32) -> Result<Self> {
        let c_name = c_name(name)?;
        // Safety: `c_name` is NUL-terminated; O_CREAT requires the mode and value varargs.
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(DivError::SemCreate {
                name: name.to_string(),
                source: Errno::last(),
            });
        }
        tracing::debug!(name, initial, "Created semaphore");
        Ok(Self {
            name: name.to_string(),
            sem,
            owner: true,
            unlinked: false,
        })
    }

    /// Open a semaphore created by another process.
    pub fn open(name: &str) -> Result<Self> {
        let c_name = c_name(name)?;
        // Safety: `c_name` is NUL-terminated; without O_CREAT no varargs are read.
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), libc::O_RDWR) };
        if sem == libc::SEM_FAILED {
            return Err(DivError::SemOpen {
                name: name.to_string(),
                source: Errno::last(),
            });
        }
        tracing::debug!(name, "Opened semaphore");
        Ok(Self {
            name: name.to_string(),
            sem,
            owner: false,
            unlinked: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decrement, blocking while the value is zero.
    pub fn wait(&self) -> Result<()> {
        loop {
            // Safety: `sem` is a live handle from sem_open.
            if unsafe { libc::sem_wait(self.sem) } == 0 {
                return Ok(());
            }
            match Errno::last() {
                Errno::EINTR => continue, // Retry on interrupt
                source => return Err(DivError::Semaphore { op: "wait", source }),
            }
        }
    }

    /// Increment, waking one waiter.
    pub fn post(&self) -> Result<()> {
        // Safety: `sem` is a live handle from sem_open.
        if unsafe { libc::sem_post(self.sem) } == 0 {
            Ok(())
        } else {
            Err(DivError::Semaphore {
                op: "post",
                source: Errno::last(),
            })
        }
    }

    /// Current value, for diagnostics and tests.
    pub fn value(&self) -> Result<i32> {
        let mut value: libc::c_int = 0;
        // Safety: `sem` is live and `value` is a valid out pointer.
        if unsafe { libc::sem_getvalue(self.sem, &mut value) } == 0 {
            Ok(value)
        } else {
            Err(DivError::Semaphore {
                op: "getvalue",
                source: Errno::last(),
            })
        }
    }

    /// Remove the name from the system namespace.
    pub fn unlink(&mut self) -> Result<()> {
        if self.unlinked {
            return Ok(());
        }
        let c_name = c_name(&self.name)?;
        // Safety: `c_name` is NUL-terminated.
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } != 0 {
            return Err(DivError::Semaphore {
                op: "unlink",
                source: Errno::last(),
            });
        }
        self.unlinked = true;
        tracing::debug!(name = %self.name, "Unlinked semaphore");
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // Safety: `sem` came from sem_open and is closed exactly once.
        unsafe { libc::sem_close(self.sem) };
        if self.owner && !self.unlinked {
            let _ = self.unlink();
        }
    }
}

fn c_name(name: &str) -> Result<CString> {
    if !name.starts_with('/') {
        return Err(DivError::InvalidName(name.to_string()));
    }
    CString::new(name).map_err(|_| DivError::InvalidName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("/divchain_test_sem_{}_{}", std::process::id(), tag)
    }

    #[test]
    fn test_create_wait_post_tracks_value() {
        let sem = NamedSemaphore::create(&unique_name("value"), 1).unwrap();
        assert_eq!(sem.value().unwrap(), 1);
        sem.wait().unwrap();
        assert_eq!(sem.value().unwrap(), 0);
        sem.post().unwrap();
        assert_eq!(sem.value().unwrap(), 1);
    }

    #[test]
    fn test_create_is_exclusive() {
        let name = unique_name("exclusive");
        let _first = NamedSemaphore::create(&name, 1).unwrap();
        let second = NamedSemaphore::create(&name, 1);
        assert!(matches!(second, Err(DivError::SemCreate { .. })));
    }

    #[test]
    fn test_open_missing_fails() {
        let result = NamedSemaphore::open(&unique_name("missing"));
        assert!(matches!(result, Err(DivError::SemOpen { .. })));
    }

    #[test]
    fn test_owner_drop_unlinks_name() {
        let name = unique_name("drop");
        drop(NamedSemaphore::create(&name, 1).unwrap());
        assert!(NamedSemaphore::open(&name).is_err());
    }

    #[test]
    fn test_rejects_names_without_leading_slash() {
        let result = NamedSemaphore::create("no_slash", 1);
        assert!(matches!(result, Err(DivError::InvalidName(_))));
    }
}
