//! Safe wrappers for platform-specific unsafe operations.
//!
//! Every `unsafe` block in the codebase lives here. Call sites use the safe
//! public API and never touch `unsafe` directly.

/// Send `SIGKILL` to every process in the group led by `pid`.
///
/// Decoder tools are spawned as group leaders so helpers they fork die with
/// them. Returns `false` if the pid does not fit a `pid_t`, is not positive,
/// or the signal could not be delivered (e.g. the group already exited).
///
/// # Safety
/// `killpg` only sends a signal. A positive group id never addresses the
/// caller's own group (0) or every process (-1).
#[cfg(unix)]
pub fn kill_process_group(pid: u32) -> bool {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pgid <= 0 {
        return false;
    }
    // SAFETY: pgid is positive, so the signal targets exactly that group.
    unsafe { libc::killpg(pgid, libc::SIGKILL) == 0 }
}

/// Whether a process with `pid` exists (zombies included).
///
/// Uses signal 0, which performs the permission and existence checks
/// without delivering anything. A process owned by another user counts as
/// existing.
#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 is never delivered; pid is positive so it names one
    // process rather than a group.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

/// Set an environment variable.
///
/// # Safety
/// Caller must ensure no other threads are reading environment variables concurrently.
pub fn set_env(key: &str, value: &str) {
    // SAFETY: Caller must ensure no other threads are reading environment
    // variables concurrently.
    #[allow(unsafe_code)]
    unsafe {
        std::env::set_var(key, value);
    }
}

/// Remove an environment variable.
///
/// # Safety
/// Caller must ensure no other threads are reading environment variables concurrently.
pub fn remove_env(key: &str) {
    // SAFETY: Caller must ensure no other threads are reading environment
    // variables concurrently.
    #[allow(unsafe_code)]
    unsafe {
        std::env::remove_var(key);
    }
}

/// Serializes tests that mutate the process environment.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
