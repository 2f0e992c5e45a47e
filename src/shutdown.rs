//! Process-wide owner of the gadget for graceful and signal-driven shutdown

use crate::error::Error;
use crate::hid::{GadgetHandle, GadgetProvider};
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exit status used after an interrupt, as a shell reports SIGINT
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Single owner of the [`GadgetHandle`].
///
/// Whichever of [`shutdown`](Self::shutdown) and
/// [`interrupt`](Self::interrupt) runs first tears the gadget down; later
/// calls find nothing left to do.
pub struct ShutdownCoordinator<P: GadgetProvider> {
    gadget: Mutex<Option<GadgetHandle<P>>>,
    cancel: Arc<AtomicBool>,
}

impl<P: GadgetProvider> ShutdownCoordinator<P> {
    pub fn new(gadget: GadgetHandle<P>) -> Self {
        Self {
            gadget: Mutex::new(Some(gadget)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag sessions poll between reads
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Whether the gadget has not been torn down yet
    pub fn owns_gadget(&self) -> bool {
        self.gadget.lock().is_some()
    }

    /// Run `f` on the gadget under the coordinator's lock.
    ///
    /// Bring-up goes through here so an interrupt arriving mid-setup waits
    /// for the current step and then tears down whatever exists. Returns
    /// `None` once the gadget has been torn down.
    pub fn with_gadget<T>(&self, f: impl FnOnce(&mut GadgetHandle<P>) -> T) -> Option<T> {
        self.gadget.lock().as_mut().map(f)
    }

    /// Graceful path: tear down once workers are joined.
    ///
    /// Returns the teardown failures, which were already logged.
    pub fn shutdown(&self) -> Vec<Error> {
        self.cancel.store(true, Ordering::SeqCst);
        self.teardown()
    }

    /// Signal path: ask sessions to stop and tear down without waiting for them
    pub fn interrupt(&self) -> Vec<Error> {
        if !self.cancel.swap(true, Ordering::SeqCst) {
            info!("interrupted, removing gadget");
        }
        self.teardown()
    }

    fn teardown(&self) -> Vec<Error> {
        // Held across teardown: a racing interrupt must not exit the process
        // while a graceful teardown is still running
        let mut gadget = self.gadget.lock();
        match gadget.take() {
            Some(mut gadget) => gadget.teardown(),
            None => Vec::new(),
        }
    }
}

impl<P: GadgetProvider + 'static> ShutdownCoordinator<P> {
    /// Route SIGINT, SIGTERM and SIGHUP to [`interrupt`](Self::interrupt),
    /// then exit.
    ///
    /// Session threads are not joined; the process exits as soon as the
    /// gadget is gone.
    pub fn install_signal_handler(self: &Arc<Self>) -> Result<(), ctrlc::Error> {
        let coordinator = Arc::clone(self);
        ctrlc::set_handler(move || {
            let errors = coordinator.interrupt();
            if !errors.is_empty() {
                warn!("{} teardown step(s) failed during interrupt", errors.len());
            }
            std::process::exit(INTERRUPTED_EXIT_CODE);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::gadget::tests::RecordingProvider;
    use crate::hid::{GadgetIdentity, GadgetState};
    use std::thread;

    type Calls = Arc<Mutex<Vec<&'static str>>>;

    fn coordinator(name: &str) -> (ShutdownCoordinator<RecordingProvider>, Calls) {
        let provider = RecordingProvider::new();
        let calls = Arc::clone(&provider.calls);
        let mut gadget = GadgetHandle::new(provider, GadgetIdentity::default(), 4);
        gadget.initialize(name, 2).unwrap();
        assert_eq!(gadget.state(), GadgetState::Enabled);
        calls.lock().clear();
        (ShutdownCoordinator::new(gadget), calls)
    }

    #[test]
    fn shutdown_tears_down_once() {
        let (coord, calls) = coordinator("shutdown-once");
        assert!(coord.owns_gadget());
        assert!(coord.shutdown().is_empty());
        assert!(coord.shutdown().is_empty());
        assert_eq!(*calls.lock(), vec!["disable", "remove", "disconnect"]);
        assert!(!coord.owns_gadget());
        assert!(coord.is_cancelled());
    }

    #[test]
    fn interrupt_raises_flag_and_tears_down() {
        let (coord, calls) = coordinator("shutdown-interrupt");
        let flag = coord.cancel_flag();
        assert!(!flag.load(Ordering::SeqCst));

        coord.interrupt();
        assert!(flag.load(Ordering::SeqCst));
        assert_eq!(*calls.lock(), vec!["disable", "remove", "disconnect"]);

        // The graceful path afterwards finds nothing to do
        assert!(coord.shutdown().is_empty());
        assert_eq!(calls.lock().len(), 3);
    }

    #[test]
    fn racing_shutdowns_release_gadget_once() {
        let (coord, calls) = coordinator("shutdown-race");
        let coord = Arc::new(coord);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let coord = Arc::clone(&coord);
                thread::spawn(move || {
                    if i % 2 == 0 {
                        coord.interrupt();
                    } else {
                        coord.shutdown();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*calls.lock(), vec!["disable", "remove", "disconnect"]);
    }

    #[test]
    fn interrupt_after_partial_bring_up_removes_gadget() {
        let provider = RecordingProvider::failing_at("enable");
        let calls = Arc::clone(&provider.calls);
        let coord = ShutdownCoordinator::new(GadgetHandle::new(
            provider,
            GadgetIdentity::default(),
            4,
        ));

        let result = coord
            .with_gadget(|g| g.initialize("shutdown-partial", 2))
            .unwrap();
        assert!(result.is_err());
        assert_eq!(
            coord.with_gadget(|g| g.state()),
            Some(GadgetState::Configured)
        );
        calls.lock().clear();

        coord.interrupt();
        assert_eq!(*calls.lock(), vec!["remove", "disconnect"]);
        assert!(coord.with_gadget(|g| g.state()).is_none());
    }

    #[test]
    fn interrupt_before_bring_up_leaves_nothing_to_set_up() {
        let provider = RecordingProvider::new();
        let calls = Arc::clone(&provider.calls);
        let coord = ShutdownCoordinator::new(GadgetHandle::new(
            provider,
            GadgetIdentity::default(),
            4,
        ));

        assert!(coord.interrupt().is_empty());
        assert!(coord
            .with_gadget(|g| g.initialize("shutdown-early", 1))
            .is_none());
        assert!(calls.lock().is_empty());
    }

    // The only test in this binary that installs a process signal handler
    #[test]
    fn signal_handler_installs_before_bring_up() {
        let coord = Arc::new(ShutdownCoordinator::new(GadgetHandle::new(
            RecordingProvider::new(),
            GadgetIdentity::default(),
            4,
        )));
        assert!(coord.install_signal_handler().is_ok());
        assert!(coord.owns_gadget());
        assert!(!coord.is_cancelled());
    }

    #[test]
    fn dropping_coordinator_tears_down() {
        let (coord, calls) = coordinator("shutdown-drop");
        drop(coord);
        assert_eq!(*calls.lock(), vec!["disable", "remove", "disconnect"]);
    }
}
