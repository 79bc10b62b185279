use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide interrupt flag fed by the SIGINT handler.
///
/// Sessions hold a clone of this `Arc` (tests may substitute their own),
/// and consume it at evaluator step boundaries; the handler itself only
/// performs an atomic store.
static SHARED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

pub fn shared_flag() -> Arc<AtomicBool> {
    SHARED
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone()
}

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    if let Some(flag) = SHARED.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Route SIGINT into the interrupt flag instead of process death.
#[cfg(unix)]
pub fn install_handler() {
    shared_flag();
    unsafe {
        libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn install_handler() {
    shared_flag();
}
