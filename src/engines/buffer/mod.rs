pub mod extract;

pub use extract::{extract_rows, f64_values, IngestRow};

use crate::types::SeriesKey;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint<V = f64> {
    pub time: i64,
    pub value: V,
    pub valid: bool,
}

/// Points of one series in arrival order until `sort_by_time` is called.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBuffer<V = f64> {
    points: Vec<SeriesPoint<V>>,
    sorted: bool,
}

impl<V> Default for SeriesBuffer<V> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            sorted: true,
        }
    }
}

impl<V> SeriesBuffer<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: i64, value: V, valid: bool) {
        if self.points.last().is_some_and(|p| p.time > time) {
            self.sorted = false;
        }
        self.points.push(SeriesPoint { time, value, valid });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Stable sort, so duplicate timestamps keep their arrival order.
    pub fn sort_by_time(&mut self) {
        if !self.sorted {
            self.points.sort_by_key(|p| p.time);
            self.sorted = true;
        }
    }

    pub fn points(&self) -> &[SeriesPoint<V>] {
        &self.points
    }

    pub fn valid_points(&self) -> impl Iterator<Item = &SeriesPoint<V>> {
        self.points.iter().filter(|p| p.valid)
    }

    pub fn count_valid(&self) -> usize {
        self.valid_points().count()
    }

    /// Points with `start <= time <= end`. Requires a sorted buffer.
    pub fn window(&self, start: i64, end: i64) -> &[SeriesPoint<V>] {
        debug_assert!(self.sorted, "window on unsorted series");
        let lo = self.points.partition_point(|p| p.time < start);
        let hi = self.points.partition_point(|p| p.time <= end);
        if lo >= hi {
            &[]
        } else {
            &self.points[lo..hi]
        }
    }

    pub fn last_time(&self) -> Option<i64> {
        if self.sorted {
            self.points.last().map(|p| p.time)
        } else {
            self.points.iter().map(|p| p.time).max()
        }
    }
}

impl SeriesBuffer<f64> {
    /// Values and validity flags in the layout the model call expects.
    pub fn model_input(&self) -> (Vec<f64>, Vec<bool>) {
        self.points.iter().map(|p| (p.value, p.valid)).unzip()
    }
}

/// Per-group series keyed by `SeriesKey`, remembering the order keys were
/// first seen.
#[derive(Debug, Clone)]
pub struct GroupBuffer<V = f64> {
    order: Vec<SeriesKey>,
    series: HashMap<SeriesKey, SeriesBuffer<V>>,
}

impl<V> Default for GroupBuffer<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            series: HashMap::new(),
        }
    }
}

impl<V> GroupBuffer<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, key: SeriesKey, time: i64, value: V, valid: bool) {
        match self.series.entry(key) {
            Entry::Occupied(mut slot) => slot.get_mut().push(time, value, valid),
            Entry::Vacant(slot) => {
                self.order.push(slot.key().clone());
                slot.insert(SeriesBuffer::new()).push(time, value, valid);
            }
        }
    }

    /// Appends a locally extracted batch, keeping row order within each key.
    pub fn ingest_rows(&mut self, rows: Vec<IngestRow<V>>) {
        for row in rows {
            self.ingest(row.key, row.time, row.value, row.valid);
        }
    }

    /// Absorbs `other`; keys new to `self` are appended in `other`'s order.
    pub fn merge(&mut self, other: GroupBuffer<V>) {
        for (key, buffer) in other.into_groups() {
            match self.series.entry(key) {
                Entry::Occupied(mut slot) => {
                    for p in buffer.points {
                        slot.get_mut().push(p.time, p.value, p.valid);
                    }
                }
                Entry::Vacant(slot) => {
                    self.order.push(slot.key().clone());
                    slot.insert(buffer);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn total_points(&self) -> usize {
        self.series.values().map(|s| s.len()).sum()
    }

    pub fn keys(&self) -> &[SeriesKey] {
        &self.order
    }

    pub fn get(&self, key: &SeriesKey) -> Option<&SeriesBuffer<V>> {
        self.series.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, &SeriesBuffer<V>)> {
        self.order
            .iter()
            .filter_map(move |k| self.series.get(k).map(|s| (k, s)))
    }

    /// Sorted distinct times of valid points across every group.
    pub fn distinct_times(&self) -> Vec<i64> {
        let mut times: Vec<i64> = self
            .series
            .values()
            .flat_map(|s| s.valid_points().map(|p| p.time))
            .collect();
        times.sort_unstable();
        times.dedup();
        times
    }

    pub fn time_range(&self) -> Option<(i64, i64)> {
        self.series
            .values()
            .flat_map(|s| s.valid_points().map(|p| p.time))
            .fold(None, |acc, t| match acc {
                None => Some((t, t)),
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            })
    }

    /// Hands every group over in key-encounter order, each sorted by time.
    pub fn into_groups(self) -> Vec<(SeriesKey, SeriesBuffer<V>)> {
        let mut series = self.series;
        self.order
            .into_iter()
            .filter_map(|k| {
                series.remove(&k).map(|mut s| {
                    s.sort_by_time();
                    (k, s)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encounter_order_is_kept() {
        let mut buffer = GroupBuffer::new();
        buffer.ingest(SeriesKey::single("b"), 1, 1.0, true);
        buffer.ingest(SeriesKey::single("a"), 1, 2.0, true);
        buffer.ingest(SeriesKey::single("b"), 0, 3.0, true);

        let keys: Vec<String> = buffer.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(buffer.total_points(), 3);

        let groups = buffer.into_groups();
        let b = &groups[0].1;
        assert!(b.is_sorted());
        assert_eq!(b.points()[0].value, 3.0);
    }

    #[test]
    fn test_null_key_parts_are_distinct_groups() {
        let mut buffer = GroupBuffer::new();
        buffer.ingest(SeriesKey::new(vec![None]), 0, 1.0, true);
        buffer.ingest(SeriesKey::new(vec![Some("__NULL__".into())]), 0, 1.0, true);
        buffer.ingest(SeriesKey::new(vec![None]), 1, 1.0, true);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_merge_appends_new_keys_after_existing() {
        let mut left = GroupBuffer::new();
        left.ingest(SeriesKey::single("x"), 0, 1.0, true);
        let mut right = GroupBuffer::new();
        right.ingest(SeriesKey::single("y"), 0, 1.0, true);
        right.ingest(SeriesKey::single("x"), 1, 2.0, true);

        left.merge(right);
        let keys: Vec<String> = left.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(left.get(&SeriesKey::single("x")).map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_window_and_axis() {
        let mut buffer = GroupBuffer::new();
        for t in [5, 1, 3, 2, 4] {
            buffer.ingest(SeriesKey::single("a"), t, t as f64, true);
        }
        buffer.ingest(SeriesKey::single("b"), 9, 0.0, false);
        buffer.ingest(SeriesKey::single("b"), 0, 0.0, true);

        assert_eq!(buffer.distinct_times(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(buffer.time_range(), Some((0, 5)));

        let groups = buffer.into_groups();
        let window: Vec<i64> = groups[0].1.window(2, 4).iter().map(|p| p.time).collect();
        assert_eq!(window, vec![2, 3, 4]);
        assert!(groups[0].1.window(6, 8).is_empty());
    }
}
