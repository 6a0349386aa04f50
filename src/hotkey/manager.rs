//! Hotkey manager.
//!
//! Owns the single combination → callback binding and the listener thread
//! that runs the callback. Replacing the binding first releases the old
//! combination, so a failed registration leaves nothing bound.

use super::{Combination, HotkeyBackend, HotkeyId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Action run when the bound combination is pressed.
pub type HotkeyCallback = Arc<dyn Fn() + Send + Sync>;

/// Sending half of the trigger channel, handed to the hotkey backend.
pub type TriggerSender = Sender<HotkeyId>;

/// How often the listener checks its stop flag while idle.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Create the channel that carries trigger events from the backend to the
/// manager's listener thread.
pub fn trigger_channel() -> (TriggerSender, Receiver<HotkeyId>) {
    channel()
}

/// The binding the listener thread dispatches to.
struct ActiveBinding {
    id: HotkeyId,
    callback: HotkeyCallback,
}

type SharedBinding = Arc<Mutex<Option<ActiveBinding>>>;

fn lock(binding: &SharedBinding) -> MutexGuard<'_, Option<ActiveBinding>> {
    binding.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the global hotkey binding.
pub struct HotkeyManager {
    backend: Box<dyn HotkeyBackend>,

    /// Canonical form of the bound combination
    combination: Option<String>,

    /// Backend id of the bound combination
    bound_id: Option<HotkeyId>,

    /// Last callback registered successfully, reused by `reload`
    callback: Option<HotkeyCallback>,

    active: SharedBinding,
    triggers: Option<Receiver<HotkeyId>>,
    running: Arc<AtomicBool>,
    listener: Option<JoinHandle<Receiver<HotkeyId>>>,
}

impl HotkeyManager {
    /// Create a manager over a backend and the receiving half of its
    /// trigger channel.
    pub fn new(backend: Box<dyn HotkeyBackend>, triggers: Receiver<HotkeyId>) -> Self {
        Self {
            backend,
            combination: None,
            bound_id: None,
            callback: None,
            active: Arc::new(Mutex::new(None)),
            triggers: Some(triggers),
            running: Arc::new(AtomicBool::new(false)),
            listener: None,
        }
    }

    /// Canonical form of the currently bound combination.
    pub fn current_combination(&self) -> Option<&str> {
        self.combination.as_deref()
    }

    /// Bind `combination` to `callback`, replacing any existing binding.
    ///
    /// The previous combination is released before the new one is tried;
    /// on failure nothing remains bound.
    pub fn register(&mut self, combination: &str, callback: HotkeyCallback) -> bool {
        self.unbind_current();

        let parsed: Combination = match combination.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Hotkey not registered");
                return false;
            }
        };

        match self.backend.bind(&parsed) {
            Ok(id) => {
                let canonical = parsed.to_string();
                info!(hotkey = %canonical, "Registered hotkey");

                self.combination = Some(canonical);
                self.bound_id = Some(id);
                self.callback = Some(callback.clone());
                *lock(&self.active) = Some(ActiveBinding { id, callback });
                true
            }
            Err(e) => {
                warn!(error = %e, "Hotkey not registered");
                false
            }
        }
    }

    /// Re-register with a new combination, keeping the current callback.
    ///
    /// Fails without touching anything if no callback was ever registered.
    pub fn reload(&mut self, combination: &str) -> bool {
        match self.callback.clone() {
            Some(callback) => self.register(combination, callback),
            None => {
                warn!(hotkey = combination, "Cannot reload hotkey before one is registered");
                false
            }
        }
    }

    /// Run the callback if `id` belongs to the bound combination.
    pub fn dispatch(&self, id: HotkeyId) -> bool {
        dispatch_to(&self.active, id)
    }

    /// Whether the listener thread is running.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Start the background listener thread.
    pub fn start_listening(&mut self) {
        if self.listener.is_some() {
            return;
        }

        let Some(triggers) = self.triggers.take() else {
            error!("Hotkey trigger channel is gone, cannot listen");
            return;
        };

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let active = Arc::clone(&self.active);

        let spawned = thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                debug!("Hotkey listener started");
                while running.load(Ordering::SeqCst) {
                    match triggers.recv_timeout(STOP_POLL_INTERVAL) {
                        Ok(id) => {
                            if !dispatch_to(&active, id) {
                                debug!(id, "Ignoring trigger for an unbound hotkey");
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Hotkey listener stopped");
                triggers
            });

        match spawned {
            Ok(handle) => self.listener = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                error!(error = %e, "Failed to start hotkey listener");
            }
        }
    }

    /// Signal the listener thread to stop and wait for it.
    pub fn stop_listening(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.listener.take() {
            match handle.join() {
                Ok(triggers) => self.triggers = Some(triggers),
                Err(_) => error!("Hotkey listener panicked"),
            }
        }
    }

    /// Signal the listener thread to stop without waiting for it.
    ///
    /// A callback that is already running is left to finish on its own.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn unbind_current(&mut self) {
        *lock(&self.active) = None;
        self.combination = None;

        if let Some(id) = self.bound_id.take() {
            if let Err(e) = self.backend.unbind(id) {
                warn!(error = %e, "Failed to release previous hotkey");
            }
        }
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        self.stop_listening();
        self.unbind_current();
    }
}

fn dispatch_to(active: &SharedBinding, id: HotkeyId) -> bool {
    // Clone out so the callback runs without holding the lock.
    let callback = match lock(active).as_ref() {
        Some(binding) if binding.id == id => Arc::clone(&binding.callback),
        _ => return false,
    };
    callback();
    true
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::hotkey::HotkeyError;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[derive(Default)]
    pub(crate) struct MockState {
        pub bound: HashMap<HotkeyId, String>,
        pub refused: HashSet<String>,
        next_id: HotkeyId,
    }

    /// Backend that records bindings in memory and can simulate key presses.
    #[derive(Clone)]
    pub(crate) struct MockHotkeyBackend {
        pub state: Arc<Mutex<MockState>>,
        triggers: TriggerSender,
    }

    impl MockHotkeyBackend {
        pub fn new(triggers: TriggerSender) -> Self {
            Self {
                state: Arc::new(Mutex::new(MockState::default())),
                triggers,
            }
        }

        pub fn is_bound(&self, combination: &str) -> bool {
            self.state
                .lock()
                .unwrap()
                .bound
                .values()
                .any(|c| c == combination)
        }

        pub fn bound_count(&self) -> usize {
            self.state.lock().unwrap().bound.len()
        }

        pub fn refuse(&self, combination: &str) {
            self.state
                .lock()
                .unwrap()
                .refused
                .insert(combination.to_string());
        }

        /// Simulate pressing a combination; returns whether it was bound.
        pub fn press(&self, combination: &str) -> bool {
            let id = self
                .state
                .lock()
                .unwrap()
                .bound
                .iter()
                .find(|(_, c)| c.as_str() == combination)
                .map(|(id, _)| *id);
            match id {
                Some(id) => self.triggers.send(id).is_ok(),
                None => false,
            }
        }
    }

    impl HotkeyBackend for MockHotkeyBackend {
        fn bind(&mut self, combination: &Combination) -> Result<HotkeyId, HotkeyError> {
            let mut state = self.state.lock().unwrap();
            let canonical = combination.to_string();
            if state.refused.contains(&canonical) {
                return Err(HotkeyError::RegisterFailed {
                    combination: canonical,
                    reason: "already registered by another application".to_string(),
                });
            }
            state.next_id += 1;
            let id = state.next_id;
            state.bound.insert(id, canonical);
            Ok(id)
        }

        fn unbind(&mut self, id: HotkeyId) -> Result<(), HotkeyError> {
            self.state
                .lock()
                .unwrap()
                .bound
                .remove(&id)
                .map(|_| ())
                .ok_or(HotkeyError::NotBound(id))
        }
    }

    pub(crate) fn mock_manager() -> (HotkeyManager, MockHotkeyBackend) {
        let (tx, rx) = trigger_channel();
        let backend = MockHotkeyBackend::new(tx);
        (HotkeyManager::new(Box::new(backend.clone()), rx), backend)
    }

    fn counting_callback() -> (HotkeyCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let callback: HotkeyCallback = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (callback, count)
    }

    fn bound_id(backend: &MockHotkeyBackend, combination: &str) -> HotkeyId {
        let state = backend.state.lock().unwrap();
        *state
            .bound
            .iter()
            .find(|(_, c)| c.as_str() == combination)
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn test_register_binds_canonical_combination() {
        let (mut manager, backend) = mock_manager();
        let (callback, _) = counting_callback();

        assert!(manager.register("Alt+Ctrl+S", callback));
        assert_eq!(manager.current_combination(), Some("ctrl+alt+s"));
        assert!(backend.is_bound("ctrl+alt+s"));
    }

    #[test]
    fn test_second_register_replaces_first() {
        let (mut manager, backend) = mock_manager();
        let (callback, count) = counting_callback();

        assert!(manager.register("ctrl+alt+s", callback.clone()));
        let first_id = bound_id(&backend, "ctrl+alt+s");
        assert!(manager.register("ctrl+alt+d", callback));
        let second_id = bound_id(&backend, "ctrl+alt+d");

        assert!(!backend.is_bound("ctrl+alt+s"));
        assert_eq!(backend.bound_count(), 1);

        assert!(!manager.dispatch(first_id));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(manager.dispatch(second_id));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_register_leaves_nothing_bound() {
        let (mut manager, backend) = mock_manager();
        let (callback, _) = counting_callback();

        assert!(manager.register("ctrl+alt+s", callback.clone()));
        assert!(!manager.register("ctrl+alt+", callback));

        assert_eq!(backend.bound_count(), 0);
        assert_eq!(manager.current_combination(), None);
    }

    #[test]
    fn test_backend_refusal_leaves_nothing_bound() {
        let (mut manager, backend) = mock_manager();
        let (callback, _) = counting_callback();
        backend.refuse("win+l");

        assert!(manager.register("ctrl+alt+s", callback));
        assert!(!manager.reload("win+l"));
        assert_eq!(backend.bound_count(), 0);

        // The callback survives, so a later reload can recover.
        assert!(manager.reload("ctrl+alt+x"));
        assert!(backend.is_bound("ctrl+alt+x"));
    }

    #[test]
    fn test_reload_before_register_fails() {
        let (mut manager, backend) = mock_manager();

        assert!(!manager.reload("ctrl+alt+s"));
        assert_eq!(backend.bound_count(), 0);
        assert_eq!(manager.current_combination(), None);
    }

    #[test]
    fn test_reload_keeps_callback() {
        let (mut manager, backend) = mock_manager();
        let (callback, count) = counting_callback();

        assert!(manager.register("ctrl+alt+s", callback));
        assert!(manager.reload("shift+f9"));
        assert_eq!(manager.current_combination(), Some("shift+f9"));

        assert!(manager.dispatch(bound_id(&backend, "shift+f9")));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_runs_callback_and_stops() {
        let (mut manager, backend) = mock_manager();
        let (fired_tx, fired_rx) = channel();
        let fired_tx = Mutex::new(fired_tx);
        let callback: HotkeyCallback = Arc::new(move || {
            let _ = fired_tx.lock().unwrap().send(());
        });

        assert!(manager.register("ctrl+alt+s", callback));
        manager.start_listening();
        assert!(manager.is_listening());

        assert!(backend.press("ctrl+alt+s"));
        assert!(fired_rx.recv_timeout(Duration::from_secs(5)).is_ok());

        manager.stop_listening();
        assert!(!manager.is_listening());

        // Listening can resume on the same channel.
        manager.start_listening();
        assert!(backend.press("ctrl+alt+s"));
        assert!(fired_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_drop_releases_binding() {
        let (mut manager, backend) = mock_manager();
        let (callback, _) = counting_callback();

        assert!(manager.register("ctrl+alt+s", callback));
        manager.start_listening();
        drop(manager);

        assert_eq!(backend.bound_count(), 0);
    }

    #[test]
    fn test_request_stop_does_not_wait_for_running_callback() {
        let (mut manager, backend) = mock_manager();
        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel::<()>();
        let started_tx = Mutex::new(started_tx);
        let release_rx = Mutex::new(release_rx);
        let callback: HotkeyCallback = Arc::new(move || {
            let _ = started_tx.lock().unwrap().send(());
            let _ = release_rx.lock().unwrap().recv_timeout(Duration::from_secs(10));
        });

        assert!(manager.register("ctrl+alt+s", callback));
        manager.start_listening();
        assert!(backend.press("ctrl+alt+s"));
        assert!(started_rx.recv_timeout(Duration::from_secs(5)).is_ok());

        let requested = Instant::now();
        manager.request_stop();
        assert!(requested.elapsed() < Duration::from_millis(500));

        release_tx.send(()).unwrap();
        manager.stop_listening();
        assert!(!manager.is_listening());
    }
}
