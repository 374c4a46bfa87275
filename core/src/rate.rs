//! Trailing-window and whole-run rate computation.
//!
//! Three streams use this module: GC byte flow (allocation / reclamation in GB/s),
//! access logs (requests and bytes per second) and service logs (processing ms and
//! goods per second). The GC pass and the shared per-second pass bound their windows
//! differently and are kept apart.

use crate::event::{GcEvent, RateStats};
use crate::size::GIB;

/// Divide bytes/ms by this to get GB/s.
pub const BYTES_PER_MS_PER_GBS: f64 = GIB / 1000.0;

/// Fill allocation, reclamation and instant rates on time-sorted GC events.
///
/// The window at `i` covers the `window` events before `i` plus `i` itself. Until
/// `window` prior events exist the divisor is the whole run's elapsed time; the divisor
/// never drops below the event's own pause duration.
///
/// Returns `None` when fewer than two events exist, leaving the events untouched.
pub fn compute_gc_rates(events: &mut [GcEvent], window: usize) -> Option<RateStats> {
    if events.len() < 2 {
        return None;
    }

    let first_time = events[0].timestamp;
    let last_time = events[events.len() - 1].timestamp;
    let total_time_ms = millis_between(first_time, last_time);
    let mean_interval_ms = total_time_ms / events.len() as f64;

    let mut prev_after = events[0].before_bytes;
    let mut total_allocated = 0.0;
    let mut total_reclaimed = 0.0;

    for event in events.iter_mut() {
        event.allocated_bytes = (event.before_bytes - prev_after).max(0.0);
        event.reclaimed_bytes = (event.before_bytes - event.after_bytes).max(0.0);
        total_allocated += event.allocated_bytes;
        total_reclaimed += event.reclaimed_bytes;
        prev_after = event.after_bytes;
        event.elapsed_ms = millis_between(first_time, event.timestamp);
    }

    for i in 0..events.len() {
        let start = i.saturating_sub(window);
        let (window_allocated, window_reclaimed) = events[start..=i]
            .iter()
            .fold((0.0, 0.0), |(a, r), e| (a + e.allocated_bytes, r + e.reclaimed_bytes));

        let span = if i < window {
            total_time_ms
        } else {
            events[i].elapsed_ms - events[start].elapsed_ms
        };
        let span = span.max(events[i].total_duration);

        let event = &mut events[i];
        if span > 0.0 {
            event.instant_alloc_rate = window_allocated / span / BYTES_PER_MS_PER_GBS;
            event.instant_gc_rate = window_reclaimed / span / BYTES_PER_MS_PER_GBS;
        } else {
            event.instant_alloc_rate = 0.0;
            event.instant_gc_rate = 0.0;
        }
    }

    let (mean_alloc_rate, mean_gc_rate) = if total_time_ms > 0.0 {
        (
            total_allocated / total_time_ms / BYTES_PER_MS_PER_GBS,
            total_reclaimed / total_time_ms / BYTES_PER_MS_PER_GBS,
        )
    } else {
        (0.0, 0.0)
    };

    Some(RateStats {
        mean_alloc_rate,
        mean_gc_rate,
        mean_interval_ms,
        total_allocated,
        total_reclaimed,
        total_time_ms,
    })
}

/// Per-second rate of `values` over a trailing window of time-sorted samples.
///
/// `rate(i) = sum(values over (i-W, i]) / max(t(i) - t(max(0, i-W)), own(i))`, with the
/// divisor converted from milliseconds to seconds. A zero divisor yields zero.
pub fn trailing_rates(times_ms: &[f64], own_ms: &[f64], values: &[f64], window: usize) -> Vec<f64> {
    debug_assert_eq!(times_ms.len(), values.len());
    debug_assert_eq!(own_ms.len(), values.len());

    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(window);
            let span_secs = (times_ms[i] - times_ms[start]).max(own_ms[i]) / 1000.0;
            if span_secs > 0.0 {
                values[start + 1..=i].iter().sum::<f64>() / span_secs
            } else {
                0.0
            }
        })
        .collect()
}

pub(crate) fn millis_between(from: chrono::DateTime<chrono::Utc>, to: chrono::DateTime<chrono::Utc>) -> f64 {
    (to - from).num_microseconds().unwrap_or(0) as f64 / 1000.0
}

pub(crate) fn epoch_millis(ts: chrono::DateTime<chrono::Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::GcClass;
    use crate::size::MIB;
    use chrono::{Duration, TimeZone, Utc};

    fn gc_event(i: usize, before_mb: f64, after_mb: f64, offset_ms: i64, duration: f64) -> GcEvent {
        let base = Utc.with_ymd_and_hms(2025, 11, 9, 13, 0, 0).unwrap();
        GcEvent {
            id: i as u64,
            timestamp: base + Duration::milliseconds(offset_ms),
            timestamp_raw: String::new(),
            raw_lines: Vec::new(),
            actions: vec!["Pause Young (Normal)".to_string()],
            action: "Pause Young (Normal)".to_string(),
            before_bytes: before_mb * MIB,
            after_bytes: after_mb * MIB,
            total_bytes: 512.0 * MIB,
            total_duration: duration,
            duration,
            class: GcClass::Normal,
            mixed_long: false,
            color: String::new(),
            radius: 0.0,
            priority: 0,
            allocated_bytes: 0.0,
            reclaimed_bytes: 0.0,
            elapsed_ms: 0.0,
            instant_alloc_rate: 0.0,
            instant_gc_rate: 0.0,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_single_event_has_no_stats() {
        let mut events = vec![gc_event(0, 100.0, 50.0, 0, 5.0)];
        assert!(compute_gc_rates(&mut events, 10).is_none());
        assert_eq!(events[0].instant_alloc_rate, 0.0);
    }

    #[test]
    fn test_allocated_and_reclaimed_bytes() {
        let mut events = vec![
            gc_event(0, 100.0, 40.0, 0, 5.0),
            gc_event(1, 120.0, 60.0, 1000, 5.0),
            gc_event(2, 50.0, 45.0, 2000, 5.0),
        ];
        let stats = compute_gc_rates(&mut events, 10).unwrap();

        assert_eq!(events[0].allocated_bytes, 0.0);
        assert_eq!(events[1].allocated_bytes, 80.0 * MIB);
        // Heap shrank below the previous after value: no negative allocation
        assert_eq!(events[2].allocated_bytes, 0.0);
        assert_eq!(events[2].reclaimed_bytes, 5.0 * MIB);
        assert_eq!(stats.total_allocated, 80.0 * MIB);
        assert_eq!(stats.total_reclaimed, 125.0 * MIB);
        assert_eq!(stats.total_time_ms, 2000.0);
        assert!(approx(stats.mean_interval_ms, 2000.0 / 3.0));
        assert!(approx(
            stats.mean_alloc_rate,
            80.0 * MIB / 2000.0 / BYTES_PER_MS_PER_GBS
        ));
    }

    #[test]
    fn test_window_rate_at_index_eleven() {
        let mut events: Vec<GcEvent> = (0..12)
            .map(|i| {
                let before = 200.0 + (i as f64) * 7.0;
                gc_event(i, before, before - 90.0, (i as i64) * 750 + (i as i64 * i as i64) * 13, 4.0)
            })
            .collect();
        compute_gc_rates(&mut events, 10).unwrap();

        let allocated: f64 = events[1..=11].iter().map(|e| e.allocated_bytes).sum();
        let span = (events[11].elapsed_ms - events[1].elapsed_ms).max(events[11].duration);
        let expected = allocated / span / BYTES_PER_MS_PER_GBS;
        assert!(approx(events[11].instant_alloc_rate, expected));
    }

    #[test]
    fn test_early_events_use_total_time() {
        let mut events: Vec<GcEvent> = (0..4)
            .map(|i| gc_event(i, 300.0, 100.0, (i as i64) * 1000, 1.0))
            .collect();
        let stats = compute_gc_rates(&mut events, 10).unwrap();

        let allocated: f64 = events[..=2].iter().map(|e| e.allocated_bytes).sum();
        let expected = allocated / stats.total_time_ms / BYTES_PER_MS_PER_GBS;
        assert!(approx(events[2].instant_alloc_rate, expected));
    }

    #[test]
    fn test_divisor_floors_at_own_duration() {
        let mut events = vec![
            gc_event(0, 100.0, 40.0, 0, 1.0),
            gc_event(1, 140.0, 40.0, 2, 50.0),
        ];
        compute_gc_rates(&mut events, 1).unwrap();
        let expected = (events[0].reclaimed_bytes + events[1].reclaimed_bytes) / 50.0 / BYTES_PER_MS_PER_GBS;
        assert!(approx(events[1].instant_gc_rate, expected));
    }

    #[test]
    fn test_trailing_rates() {
        let times = [0.0, 100.0, 200.0, 300.0];
        let own = [0.0, 0.0, 0.0, 0.0];
        let ones = [1.0; 4];
        let rates = trailing_rates(&times, &own, &ones, 2);
        assert_eq!(rates[0], 0.0);
        assert!(approx(rates[1], 1.0 / 0.1));
        assert!(approx(rates[3], 2.0 / 0.2));
    }

    #[test]
    fn test_trailing_rates_floor_at_own_duration() {
        let times = [0.0, 0.0];
        let own = [0.0, 500.0];
        let values = [10.0, 10.0];
        let rates = trailing_rates(&times, &own, &values, 30);
        assert!(approx(rates[1], 10.0 / 0.5));
    }
}
