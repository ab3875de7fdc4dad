use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, warn};

/// Actions currently waiting for the backend.
///
/// A second attempt of the same action is refused until the first one settles, which is what
/// a disabled loading button gives a graphical console.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    actions: Arc<Mutex<HashSet<String>>>,
}

/// Marks an action as running until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    actions: Arc<Mutex<HashSet<String>>>,
    action: String,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `action`, or `None` if it is already running.
    pub fn try_begin(&self, action: impl Into<String>) -> Option<InFlightGuard> {
        let action = action.into();
        let mut actions = lock(&self.actions);
        if !actions.insert(action.clone()) {
            debug!(%action, "already in flight");
            return None;
        }
        Some(InFlightGuard {
            actions: self.actions.clone(),
            action,
        })
    }

    /// True while `action` is running.
    pub fn is_running(&self, action: &str) -> bool {
        lock(&self.actions).contains(action)
    }
}

fn lock(actions: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    match actions.lock() {
        Ok(actions) => actions,
        Err(error) => {
            warn!("recovering poisoned in-flight set");
            error.into_inner()
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.actions).remove(&self.action);
    }
}

#[cfg(test)]
mod tests {
    use super::InFlight;

    #[test]
    fn same_action_is_refused_until_released() {
        let in_flight = InFlight::new();
        let guard = in_flight.try_begin("sync:1->2").unwrap();
        assert!(in_flight.try_begin("sync:1->2").is_none());
        assert!(in_flight.try_begin("sync:1->3").is_some());
        assert!(in_flight.is_running("sync:1->2"));

        drop(guard);
        assert!(!in_flight.is_running("sync:1->2"));
        assert!(in_flight.try_begin("sync:1->2").is_some());
    }

    #[test]
    fn guard_releases_after_a_panicking_holder() {
        let in_flight = InFlight::new();
        let result = std::thread::spawn({
            let in_flight = in_flight.clone();
            move || {
                let _guard = in_flight.try_begin("sync:1->2");
                let _actions = in_flight.actions.lock();
                panic!("submission panicked");
            }
        })
        .join();
        assert!(result.is_err());

        assert!(!in_flight.is_running("sync:1->2"));
        assert!(in_flight.try_begin("sync:1->2").is_some());
    }
}
