//! Removal of the pending downloaded script when the process is signalled.
//!
//! Normal returns are covered by `NamedTempFile`'s drop. This guard covers
//! SIGINT, SIGTERM and SIGHUP, where no destructor runs: the handler unlinks
//! the registered path and then performs the signal's default action.
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::low_level;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Once;

const SIGNALS: [libc::c_int; 3] = [SIGINT, SIGTERM, SIGHUP];

static PENDING: AtomicPtr<libc::c_char> = AtomicPtr::new(ptr::null_mut());
static INSTALL: Once = Once::new();

/// Serializes tests that register guards; the pending slot is process-wide.
#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Keeps `path` registered for signal-time removal until dropped.
#[derive(Debug)]
pub struct SignalCleanup {
    _registered: (),
}

impl SignalCleanup {
    pub fn register(path: &Path) -> Self {
        INSTALL.call_once(install_handlers);
        match CString::new(path.as_os_str().as_bytes()) {
            Ok(c_path) => release(PENDING.swap(c_path.into_raw(), Ordering::SeqCst)),
            Err(_) => tracing::warn!(
                path = %path.display(),
                "temp path contains NUL; signal cleanup disabled"
            ),
        }
        Self { _registered: () }
    }

    pub fn is_armed() -> bool {
        !PENDING.load(Ordering::SeqCst).is_null()
    }
}

impl Drop for SignalCleanup {
    fn drop(&mut self) {
        release(PENDING.swap(ptr::null_mut(), Ordering::SeqCst));
    }
}

fn release(raw: *mut libc::c_char) {
    if !raw.is_null() {
        // SAFETY: every non-null value stored in PENDING came from CString::into_raw
        // and is swapped out exactly once before being reclaimed here.
        drop(unsafe { CString::from_raw(raw) });
    }
}

/// Runs inside the signal handler, so only async-signal-safe calls are allowed.
fn remove_pending(signal: libc::c_int) {
    let raw = PENDING.swap(ptr::null_mut(), Ordering::SeqCst);
    if !raw.is_null() {
        // SAFETY: `raw` is a NUL-terminated path owned by PENDING; it is leaked
        // because freeing memory is not async-signal-safe.
        unsafe {
            libc::unlink(raw);
        }
    }
    let _ = low_level::emulate_default_handler(signal);
}

fn install_handlers() {
    for signal in SIGNALS {
        // Dispositions inherited from nohup and friends stay ignored.
        if inherited_ignore(signal) {
            tracing::debug!(signal, "signal ignored by parent; no cleanup handler");
            continue;
        }
        // SAFETY: the action only touches an atomic, calls unlink and re-raises.
        let registered = unsafe { low_level::register(signal, move || remove_pending(signal)) };
        if let Err(err) = registered {
            tracing::warn!(signal, "cannot install cleanup handler: {err}");
        }
    }
}

fn inherited_ignore(signal: libc::c_int) -> bool {
    // SAFETY: a null new action only queries the current disposition into `current`.
    unsafe {
        let mut current: libc::sigaction = std::mem::zeroed();
        libc::sigaction(signal, ptr::null(), &mut current) == 0
            && current.sa_sigaction == libc::SIG_IGN
    }
}
