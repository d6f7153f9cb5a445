// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const DRAW_RESOURCE: &str = "raffle-draw";

/// Named non-queueing locks: a second caller for a busy name is turned away
/// instead of waiting.
#[derive(Default)]
pub struct SingleFlight {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    #[must_use]
    pub fn try_acquire(&self, resource: &str) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(resource.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_until_release() {
        let flights = SingleFlight::default();
        let held = flights.try_acquire(DRAW_RESOURCE).expect("first");
        assert!(flights.try_acquire(DRAW_RESOURCE).is_none());
        assert!(flights.try_acquire("other").is_some());
        drop(held);
        assert!(flights.try_acquire(DRAW_RESOURCE).is_some());
    }

    #[test]
    fn poisoned_registry_still_hands_out_locks() {
        let flights = Arc::new(SingleFlight::default());
        let poisoner = Arc::clone(&flights);
        let _ = std::thread::spawn(move || {
            let _held = poisoner.locks.lock().expect("registry lock");
            panic!("poison the registry");
        })
        .join();
        assert!(flights.locks.is_poisoned());

        let held = flights.try_acquire(DRAW_RESOURCE).expect("acquire after poison");
        assert!(flights.try_acquire(DRAW_RESOURCE).is_none());
        drop(held);
        assert!(flights.try_acquire(DRAW_RESOURCE).is_some());
    }
}
