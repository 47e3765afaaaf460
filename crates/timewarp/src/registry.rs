// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use slab::Slab;

use crate::{Timer, TimerId};

#[derive(Debug)]
struct Record {
    epoch: u64,
    timer: Timer,
}

/// Storage for the timers known to a clock.
///
/// Timers live in slab-allocated slots. Each insertion is stamped with a unique epoch,
/// which is part of the [`TimerId`]; a handle is live only while its slot holds a record
/// with the same epoch, so handles to removed timers never alias newer timers.
#[derive(Debug, Default)]
pub(crate) struct TimerRegistry {
    records: Slab<Record>,
    next_epoch: u64,
}

impl TimerRegistry {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn register(&mut self, timer: Timer) -> TimerId {
        let epoch = self.next_epoch;
        self.next_epoch = self.next_epoch.wrapping_add(1);

        let index = self.records.insert(Record { epoch, timer });
        TimerId::new(index, epoch)
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer> {
        self.records
            .get(id.index())
            .filter(|record| record.epoch == id.epoch())
            .map(|record| &record.timer)
    }

    pub fn get_mut(&mut self, id: TimerId) -> Option<&mut Timer> {
        self.records
            .get_mut(id.index())
            .filter(|record| record.epoch == id.epoch())
            .map(|record| &mut record.timer)
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        self.get(id).is_some()
    }

    /// Whether `id` refers to a registered timer that has not been cancelled.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.get(id).is_some_and(|timer| !timer.is_cancelled())
    }

    /// Removes the timer, invalidating `id` for good.
    pub fn remove(&mut self, id: TimerId) -> Option<Timer> {
        if !self.is_live(id) {
            return None;
        }

        self.records.try_remove(id.index()).map(|record| record.timer)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn register_and_get() {
        let mut registry = TimerRegistry::default();
        let id = registry.register(Timer::once(Duration::from_secs(1)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).map(Timer::delay), Some(Duration::from_secs(1)));
        assert!(registry.is_live(id));
        assert!(registry.is_active(id));
    }

    #[test]
    fn same_timer_values_get_distinct_ids() {
        let mut registry = TimerRegistry::default();
        let a = registry.register(Timer::once(Duration::from_secs(1)));
        let b = registry.register(Timer::once(Duration::from_secs(1)));

        assert_ne!(a, b);
    }

    #[test]
    fn cancelled_timer_is_live_but_not_active() {
        let mut registry = TimerRegistry::default();
        let id = registry.register(Timer::once(Duration::from_secs(1)));

        registry.get_mut(id).unwrap().cancel();

        assert!(registry.is_live(id));
        assert!(!registry.is_active(id));
    }

    #[test]
    fn remove_invalidates_id() {
        let mut registry = TimerRegistry::default();
        let id = registry.register(Timer::once(Duration::from_secs(1)));

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(registry.get(id).is_none());
        assert!(!registry.is_live(id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn reused_slot_does_not_alias_removed_id() {
        let mut registry = TimerRegistry::default();
        let old = registry.register(Timer::once(Duration::from_secs(1)));
        registry.remove(old);

        let new = registry.register(Timer::once(Duration::from_secs(2)));

        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(!registry.is_live(old));
        assert!(registry.remove(old).is_none());
        assert!(registry.is_live(new));
    }
}
