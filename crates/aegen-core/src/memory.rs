//! Memory protection for seed material
//!
//! Two measures, both best-effort:
//!
//! 1. **Core dump prevention**: `setrlimit(RLIMIT_CORE, 0)` so a crash
//!    never writes a decrypted seed to disk.
//! 2. **Locked secret buffers**: [`SecretBytes`] keeps fixed-size secrets on
//!    the heap, `mlock`s the page so it is not swapped out, and zeroizes the
//!    bytes on drop.
//!
//! Containers and unprivileged users frequently cannot lock memory, so
//! failures are logged and never fatal.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use zeroize::Zeroize;

static CORE_DUMPS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Disable core dumps for the current process.
///
/// Call once, early, before any seed is decrypted. Returns `true` when core
/// dumps are (or already were) disabled. A failed attempt is not remembered,
/// so a later call tries again.
///
/// ```
/// aegen_core::memory::disable_core_dumps();
/// ```
pub fn disable_core_dumps() -> bool {
    latch_on_success(&CORE_DUMPS_DISABLED, || {
        #[cfg(unix)]
        {
            unix::disable_core_dumps_impl()
        }

        #[cfg(not(unix))]
        {
            log::warn!("core dump prevention is not supported on this platform");
            false
        }
    })
}

/// Run `apply` until it succeeds once; `flag` is only set by a success.
fn latch_on_success(flag: &AtomicBool, apply: impl FnOnce() -> bool) -> bool {
    if flag.load(Ordering::SeqCst) {
        return true;
    }
    let done = apply();
    if done {
        flag.store(true, Ordering::SeqCst);
    }
    done
}

/// A fixed-size secret that lives in locked memory and is wiped on drop.
///
/// `Debug` never prints the contents.
pub struct SecretBytes<const N: usize> {
    data: Box<[u8; N]>,
    locked: bool,
}

impl<const N: usize> SecretBytes<N> {
    /// A locked, all-zero buffer to be filled in place.
    pub fn zeroed() -> Self {
        let data = Box::new([0u8; N]);
        let locked = lock_region(data.as_ptr(), N);
        if !locked {
            log::warn!("failed to mlock {} secret bytes; they may be swapped to disk", N);
        }
        Self { data, locked }
    }

    /// Copy `bytes` into a locked buffer and wipe the argument.
    ///
    /// Arrays are `Copy`, so callers holding their own copy must wipe it
    /// themselves or fill a [`SecretBytes::zeroed`] buffer instead.
    pub fn new(mut bytes: [u8; N]) -> Self {
        let mut secret = Self::zeroed();
        secret.data.copy_from_slice(&bytes);
        bytes.zeroize();
        secret
    }

    /// Copy a slice of exactly `N` bytes into a locked buffer.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != N {
            return None;
        }
        let mut secret = Self::zeroed();
        secret.data.copy_from_slice(slice);
        Some(secret)
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.data
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8; N] {
        &mut self.data
    }

    /// Whether the pages backing this buffer are actually locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl<const N: usize> Clone for SecretBytes<N> {
    fn clone(&self) -> Self {
        let mut copy = Self::zeroed();
        copy.data.copy_from_slice(&self.data[..]);
        copy
    }
}

impl<const N: usize> PartialEq for SecretBytes<N> {
    fn eq(&self, other: &Self) -> bool {
        // Fold over every byte so the comparison time does not depend on
        // where the first difference is.
        self.data
            .iter()
            .zip(other.data.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl<const N: usize> Eq for SecretBytes<N> {}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{}>(..)", N)
    }
}

impl<const N: usize> Drop for SecretBytes<N> {
    fn drop(&mut self) {
        Zeroize::zeroize(&mut *self.data);
        if self.locked {
            unlock_region(self.data.as_ptr(), N);
        }
    }
}

fn lock_region(ptr: *const u8, len: usize) -> bool {
    if len == 0 {
        return true;
    }

    #[cfg(unix)]
    {
        // SAFETY: `ptr` points at a live heap allocation of `len` bytes owned
        // by the caller for at least as long as the lock is held.
        unsafe { unix::mlock_impl(ptr, len) }
    }

    #[cfg(not(unix))]
    {
        let _ = ptr;
        false
    }
}

fn unlock_region(ptr: *const u8, len: usize) {
    if len == 0 {
        return;
    }

    #[cfg(unix)]
    {
        // SAFETY: same region that was passed to `lock_region`.
        unsafe { unix::munlock_impl(ptr, len) };
    }

    #[cfg(not(unix))]
    {
        let _ = ptr;
    }
}

#[cfg(unix)]
mod unix {
    pub fn disable_core_dumps_impl() -> bool {
        let rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: setrlimit with a valid rlimit struct is a plain POSIX call.
        let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };
        if result != 0 {
            log::warn!(
                "failed to disable core dumps: {}",
                std::io::Error::last_os_error()
            );
            return false;
        }
        true
    }

    pub unsafe fn mlock_impl(ptr: *const u8, len: usize) -> bool {
        let result = libc::mlock(ptr as *const libc::c_void, len);
        if result != 0 {
            log::debug!(
                "mlock of {} bytes failed: {}",
                len,
                std::io::Error::last_os_error()
            );
            return false;
        }
        true
    }

    pub unsafe fn munlock_impl(ptr: *const u8, len: usize) -> bool {
        libc::munlock(ptr as *const libc::c_void, len) == 0
    }
}
