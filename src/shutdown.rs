//! Ctrl+C handling for sprint execution.
//!
//! The first interrupt kills every registered agent process group and asks
//! the workflow engine to pause at the next task boundary. Repeated
//! interrupts force-quit.
//!
//! ```ignore
//! use vibe::shutdown;
//!
//! shutdown::register_handler()?;
//! if shutdown::requested() {
//!     println!("Pausing after the current task");
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::process_registry::PROCESS_REGISTRY;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Counter for how many times Ctrl+C was pressed.
static INTERRUPT_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Maximum number of interrupts before force-quitting.
const MAX_INTERRUPTS: usize = 3;

/// Register the Ctrl+C handler. Call once at program startup.
pub fn register_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        let count = INTERRUPT_COUNT.fetch_add(1, Ordering::SeqCst) + 1;

        if count >= MAX_INTERRUPTS {
            eprintln!("\nForce quit (received {} interrupts)", count);
            std::process::exit(130);
        }

        if count == 1 {
            eprintln!();
            eprintln!("Interrupt received. Pausing the sprint...");
            SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
            let stopped = PROCESS_REGISTRY.stop_all();
            if stopped > 0 {
                eprintln!("Stopped {} running agent process(es)", stopped);
            }
        }
        eprintln!(
            "(Press Ctrl+C {} more time(s) to force quit)",
            MAX_INTERRUPTS - count
        );
    })
}

/// Returns `true` if the user pressed Ctrl+C or `request()` was called.
pub fn requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

pub fn request() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Clear the shutdown flag and interrupt counter.
pub fn reset() {
    SHUTDOWN_REQUESTED.store(false, Ordering::SeqCst);
    INTERRUPT_COUNT.store(0, Ordering::SeqCst);
}

/// Cloneable pause check handed to the workflow engine.
///
/// A signal from [`global`](Self::global) also observes the process-wide
/// Ctrl+C flag; one from [`new`](Self::new) only sees its own triggers.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
    linked: bool,
}

impl ShutdownSignal {
    /// Detached signal, only set through [`trigger`](Self::trigger).
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal linked to the global Ctrl+C flag.
    pub fn global() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            linked: true,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        (self.linked && requested()) || self.flag.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_signal_tracks_own_trigger() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());

        signal.trigger();
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_signal_clones_share_state() {
        let signal1 = ShutdownSignal::global();
        let signal2 = signal1.clone();

        signal1.trigger();
        assert!(signal1.is_shutdown());
        assert!(signal2.is_shutdown());
    }

    #[test]
    fn test_signal_is_shareable_across_threads() {
        let signal = ShutdownSignal::new();
        let remote = signal.clone();

        std::thread::spawn(move || remote.trigger())
            .join()
            .unwrap();

        assert!(signal.is_shutdown());
    }
}
