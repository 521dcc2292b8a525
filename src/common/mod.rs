pub mod io;


/// Restore the default SIGPIPE action so a closed pipe ends the process
/// quietly with status 141, as shell tools do. Call first thing in main().
#[inline]
pub fn reset_sigpipe() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

/// Format an I/O error without Rust's " (os error N)" suffix.
pub fn io_error_msg(e: &std::io::Error) -> String {
    match e.raw_os_error() {
        Some(raw) => {
            let msg = std::io::Error::from_raw_os_error(raw).to_string();
            msg.replace(&format!(" (os error {raw})"), "")
        }
        None => e.to_string(),
    }
}
