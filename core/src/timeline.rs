use crate::event::{AccessEvent, ServiceCallEvent};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;

/// Events positioned on the shared time axis
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
    fn set_timestamp(&mut self, ts: DateTime<Utc>);
}

impl Timestamped for AccessEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn set_timestamp(&mut self, ts: DateTime<Utc>) {
        self.timestamp = ts;
    }
}

impl Timestamped for ServiceCallEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn set_timestamp(&mut self, ts: DateTime<Utc>) {
        self.timestamp = ts;
    }
}

/// Stable sort by timestamp.
pub fn sort_by_time<T: Timestamped>(items: &mut [T]) {
    items.sort_by_key(|item| item.timestamp());
}

/// Respace every group of events carrying the exact same timestamp across the second
/// that follows it: the k-th of n events (1-based) lands at `base + k * 1000 / (n + 1)` ms.
/// Single events are moved to the middle of their second as well.
pub fn spread_identical<T: Timestamped>(items: &mut [T]) {
    spread_groups(items, 1, |ts| ts.timestamp_micros());
}

/// Respace events that share the same wall-clock second, leaving lone events untouched.
pub fn spread_within_second<T: Timestamped>(items: &mut [T]) {
    spread_groups(items, 2, |ts| ts.timestamp().saturating_mul(1_000_000));
}

fn spread_groups<T, F>(items: &mut [T], min_group: usize, base_micros: F)
where
    T: Timestamped,
    F: Fn(DateTime<Utc>) -> i64,
{
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, item) in items.iter().enumerate() {
        groups
            .entry(base_micros(item.timestamp()))
            .or_default()
            .push(idx);
    }

    for (base, members) in groups {
        if members.len() < min_group {
            continue;
        }
        let Some(base_ts) = Utc.timestamp_micros(base).single() else {
            continue;
        };
        let step_micros = 1_000_000.0 / (members.len() + 1) as f64;
        for (position, idx) in members.into_iter().enumerate() {
            let offset = (step_micros * (position + 1) as f64) as i64;
            items[idx].set_timestamp(base_ts + Duration::microseconds(offset));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[derive(Debug, Clone)]
    struct Point(DateTime<Utc>);

    impl Timestamped for Point {
        fn timestamp(&self) -> DateTime<Utc> {
            self.0
        }

        fn set_timestamp(&mut self, ts: DateTime<Utc>) {
            self.0 = ts;
        }
    }

    fn at(secs: u32, millis: i64) -> Point {
        Point(Utc.with_ymd_and_hms(2025, 11, 9, 13, 0, secs).unwrap() + Duration::milliseconds(millis))
    }

    #[test]
    fn test_spread_identical_four_events() {
        let mut points = vec![at(1, 0), at(1, 0), at(1, 0), at(1, 0)];
        let second = points[0].0;
        spread_identical(&mut points);

        for pair in points.windows(2) {
            assert!(pair[0].0 < pair[1].0);
        }
        for p in &points {
            assert!(p.0 > second && p.0 < second + Duration::seconds(1));
        }
        assert_eq!(points[0].0.nanosecond(), 200_000_000);
        assert_eq!(points[3].0.nanosecond(), 800_000_000);
    }

    #[test]
    fn test_spread_identical_moves_single_event() {
        let mut points = vec![at(1, 0), at(2, 0)];
        spread_identical(&mut points);
        assert_eq!(points[0].0.nanosecond(), 500_000_000);
        assert_eq!(points[1].0.second(), 2);
    }

    #[test]
    fn test_spread_within_second_groups_by_floor() {
        let mut points = vec![at(1, 100), at(1, 900), at(3, 250)];
        spread_within_second(&mut points);
        assert!((points[0].0.nanosecond() as i64 - 333_333_000).abs() < 1_000);
        assert!((points[1].0.nanosecond() as i64 - 666_666_000).abs() < 1_000);
        // Lone event keeps its sub-second position
        assert_eq!(points[2].0.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_sort_by_time_is_stable() {
        let mut points = vec![at(3, 0), at(1, 0), at(2, 0)];
        sort_by_time(&mut points);
        let secs: Vec<u32> = points.iter().map(|p| p.0.second()).collect();
        assert_eq!(secs, vec![1, 2, 3]);
    }
}
