use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use strum::Display;

/// Lifecycle of one collection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionPhase {
    #[strum(serialize = "running")]
    Running,
    /// Finish sentinel received.
    #[strum(serialize = "finished")]
    Finished,
    /// Target process exited first.
    #[strum(serialize = "peer exited")]
    PeerExited,
    /// Channel reached end of stream without the sentinel.
    #[strum(serialize = "disconnected")]
    Disconnected,
    /// Receive loop failed.
    #[strum(serialize = "failed")]
    Failed,
}

/// Shared completion state for the receive loop and the exit watcher.
///
/// Both sides transition the phase under the same lock, so exactly one of
/// "finished" and "peer exited" is ever observed. Later transitions are
/// ignored.
pub struct CompletionSignal {
    phase: Mutex<SessionPhase>,
    condvar: Condvar,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(SessionPhase::Running),
            condvar: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionPhase> {
        // the phase is a plain Copy value, a poisoned lock still holds a valid one
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move out of `Running`. Returns `true` if this call made the transition.
    fn transition(&self, to: SessionPhase) -> bool {
        let mut phase = self.lock();
        if *phase != SessionPhase::Running {
            return false;
        }
        *phase = to;
        self.condvar.notify_all();
        true
    }

    /// Record the finish sentinel.
    pub fn finish(&self) -> bool {
        self.transition(SessionPhase::Finished)
    }

    /// Record that the target process exited.
    pub fn peer_exited(&self) -> bool {
        self.transition(SessionPhase::PeerExited)
    }

    pub fn disconnected(&self) -> bool {
        self.transition(SessionPhase::Disconnected)
    }

    pub fn fail(&self) -> bool {
        self.transition(SessionPhase::Failed)
    }

    pub fn phase(&self) -> SessionPhase {
        *self.lock()
    }

    pub fn is_finished_normally(&self) -> bool {
        self.phase() == SessionPhase::Finished
    }

    /// Block until the session leaves `Running`.
    pub fn wait(&self) -> SessionPhase {
        let guard = self.lock();
        let guard = self
            .condvar
            .wait_while(guard, |phase| *phase == SessionPhase::Running)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Like [`wait`](Self::wait), but gives up after `duration` and returns
    /// the phase at that point.
    pub fn wait_timeout(&self, duration: Duration) -> SessionPhase {
        let guard = self.lock();
        let (guard, _) = self
            .condvar
            .wait_timeout_while(guard, duration, |phase| *phase == SessionPhase::Running)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_initial_state() {
        let signal = CompletionSignal::new();
        assert_eq!(signal.phase(), SessionPhase::Running);
        assert!(!signal.is_finished_normally());
    }

    #[test]
    fn test_first_transition_wins() {
        let signal = CompletionSignal::new();
        assert!(signal.finish());
        assert!(!signal.peer_exited());
        assert!(!signal.disconnected());
        assert_eq!(signal.phase(), SessionPhase::Finished);
        assert!(signal.is_finished_normally());

        let signal = CompletionSignal::new();
        assert!(signal.peer_exited());
        assert!(!signal.finish());
        assert_eq!(signal.phase(), SessionPhase::PeerExited);
    }

    #[test]
    fn test_wait_timeout_while_running() {
        let signal = CompletionSignal::new();
        let start = Instant::now();
        let phase = signal.wait_timeout(Duration::from_millis(50));
        let elapsed = start.elapsed();

        assert_eq!(phase, SessionPhase::Running);
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn test_wait_woken_by_transition() {
        let signal = Arc::new(CompletionSignal::new());
        let signal_clone = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let phase = signal_clone.wait();
            (phase, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        signal.disconnected();

        let (phase, elapsed) = handle.join().unwrap();
        assert_eq!(phase, SessionPhase::Disconnected);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_after_transition_returns_immediately() {
        let signal = CompletionSignal::new();
        signal.finish();

        let start = Instant::now();
        assert_eq!(signal.wait(), SessionPhase::Finished);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_finish_exit_race_has_one_winner() {
        for delay_us in [0u64, 10, 100, 1_000] {
            let signal = Arc::new(CompletionSignal::new());
            let wins = Arc::new(AtomicUsize::new(0));

            let finisher = {
                let signal = Arc::clone(&signal);
                let wins = Arc::clone(&wins);
                thread::spawn(move || {
                    if signal.finish() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            };
            let watcher = {
                let signal = Arc::clone(&signal);
                let wins = Arc::clone(&wins);
                thread::spawn(move || {
                    thread::sleep(Duration::from_micros(delay_us));
                    if signal.peer_exited() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            };
            finisher.join().unwrap();
            watcher.join().unwrap();

            assert_eq!(wins.load(Ordering::SeqCst), 1, "delay {delay_us}us");
            assert_ne!(signal.phase(), SessionPhase::Running);
        }
    }

    #[test]
    fn test_exit_after_finish_is_not_reported() {
        let signal = Arc::new(CompletionSignal::new());
        signal.finish();

        // watcher fires late, e.g. because the collector terminated the target
        let late = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.peer_exited())
        };
        assert!(!late.join().unwrap());
        assert_eq!(signal.wait(), SessionPhase::Finished);
    }
}
