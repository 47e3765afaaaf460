// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::time::SystemTime;

use crate::TimerId;

/// Position of one occurrence of a timer on the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ScheduleKey {
    tick: SystemTime,

    /// Orders occurrences that share an instant by insertion.
    discriminator: u64,
}

impl ScheduleKey {
    const fn new(tick: SystemTime, discriminator: u64) -> Self {
        Self { tick, discriminator }
    }

    /// The smallest key that sorts after every occurrence at or before `tick`.
    const fn after(tick: SystemTime) -> Self {
        Self::new(tick, u64::MAX)
    }

    /// The virtual time at which the occurrence elapses.
    pub const fn tick(&self) -> SystemTime {
        self.tick
    }
}

/// The pending occurrences of timers, in the order in which they elapse.
///
/// A timer may occupy several slots, e.g. when it was added more than once or when a
/// repeating timer has been expanded. Slots of removed timers are kept until they are
/// consumed; the schedule does not know which timers are live.
#[derive(Debug, Default)]
pub(crate) struct Schedule {
    entries: BTreeMap<ScheduleKey, TimerId>,
    last_discriminator: u64,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, when: SystemTime, id: TimerId) -> ScheduleKey {
        // u64::MAX insertions into one schedule are out of reach, so the discriminator
        // never wraps and never reaches the value reserved by `ScheduleKey::after`.
        self.last_discriminator = self.last_discriminator.wrapping_add(1);
        let key = ScheduleKey::new(when, self.last_discriminator);

        self.entries.insert(key, id);

        key
    }

    /// The earliest slot, live or not.
    pub fn first(&self) -> Option<(ScheduleKey, TimerId)> {
        self.entries.first_key_value().map(|(key, id)| (*key, *id))
    }

    /// Slots at or before `t`, in order.
    pub fn up_to(&self, t: SystemTime) -> btree_map::Range<'_, ScheduleKey, TimerId> {
        self.entries.range(..ScheduleKey::after(t))
    }

    /// Slots strictly after `t`, in order.
    pub fn after(&self, t: SystemTime) -> btree_map::Range<'_, ScheduleKey, TimerId> {
        self.entries.range(ScheduleKey::after(t)..)
    }

    /// Removes and returns every slot at or before `t`, in order.
    pub fn split_off_up_to(&mut self, t: SystemTime) -> BTreeMap<ScheduleKey, TimerId> {
        let pending = self.entries.split_off(&ScheduleKey::after(t));
        std::mem::replace(&mut self.entries, pending)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ScheduleKey, TimerId> {
        self.entries.iter()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn ids(n: usize) -> Vec<TimerId> {
        (0..n).map(|i| TimerId::new(i, i as u64)).collect()
    }

    #[test]
    fn same_instant_keeps_insertion_order() {
        let mut schedule = Schedule::default();
        let ids = ids(3);

        let k0 = schedule.insert(at(10), ids[0]);
        let k1 = schedule.insert(at(10), ids[1]);
        let k2 = schedule.insert(at(10), ids[2]);

        assert!(k0 < k1 && k1 < k2);
        assert_eq!(k0.tick(), k2.tick());

        let order: Vec<_> = schedule.iter().map(|(_, id)| *id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn earlier_insert_at_later_instant_sorts_after() {
        let mut schedule = Schedule::default();
        let ids = ids(2);

        schedule.insert(at(20), ids[0]);
        schedule.insert(at(10), ids[1]);

        assert_eq!(schedule.first(), Some((ScheduleKey::new(at(10), 2), ids[1])));
    }

    #[test]
    fn split_off_includes_boundary() {
        let mut schedule = Schedule::default();
        let ids = ids(3);

        schedule.insert(at(10), ids[0]);
        schedule.insert(at(20), ids[1]);
        schedule.insert(at(30), ids[2]);

        let elapsed = schedule.split_off_up_to(at(20));

        assert_eq!(elapsed.values().copied().collect::<Vec<_>>(), vec![ids[0], ids[1]]);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.first().map(|(key, _)| key.tick()), Some(at(30)));
    }

    #[test]
    fn up_to_and_after_partition() {
        let mut schedule = Schedule::default();
        let ids = ids(3);

        schedule.insert(at(10), ids[0]);
        schedule.insert(at(20), ids[1]);
        schedule.insert(at(20), ids[2]);

        assert_eq!(schedule.up_to(at(19)).count(), 1);
        assert_eq!(schedule.up_to(at(20)).count(), 3);
        assert_eq!(schedule.after(at(10)).count(), 2);
        assert_eq!(schedule.after(at(20)).count(), 0);
    }

    #[test]
    fn split_off_empty() {
        let mut schedule = Schedule::default();

        assert!(schedule.split_off_up_to(at(20)).is_empty());
        assert_eq!(schedule.len(), 0);
        assert!(schedule.first().is_none());
    }
}
