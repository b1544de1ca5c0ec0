// Asynchronous signals become pending throws.
//
// Unwinding out of a signal handler is not portable, so the handler only
// records a throw code; the interpreters poll it at every primitive
// boundary and convert it to an ordinary throw on the polling thread.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::errors::Throw;

static PENDING: AtomicI64 = AtomicI64::new(0);

/// Take the pending throw, if a signal arrived since the last check.
pub fn take_pending() -> Option<Throw> {
    let code = PENDING.swap(0, Ordering::Relaxed);
    if code == 0 {
        None
    } else {
        Some(Throw::from_code(code))
    }
}

#[cfg(unix)]
extern "C" fn on_sigint(_signum: libc::c_int) {
    PENDING.store(Throw::Sigint.code(), Ordering::Relaxed);
}

/// Install the interrupt handler. SIGFPE and SIGSEGV conditions are
/// raised synchronously by the zero and bounds checks instead, which is
/// the only portable option in safe code.
#[cfg(unix)]
pub fn install() {
    unsafe {
        libc::signal(
            libc::SIGINT,
            on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }
}

#[cfg(not(unix))]
pub fn install() {}

//////////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_signal_means_no_throw() {
        // The pending slot is shared interpreter-wide; with no signal
        // delivered there is nothing to take.
        assert_eq!(take_pending(), None);
    }
}
