//! Sorted interval sets over symbol values.
//!
//! Symbols are token types in parser ATNs and Unicode code points in lexer
//! ATNs; both fit in `i32` with `-1` reserved for EOF. Intervals are
//! inclusive, sorted, and disjoint.

use std::fmt;

/// A set of symbol values stored as sorted disjoint inclusive intervals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntervalSet {
    intervals: Vec<(i32, i32)>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-value set.
    pub fn of(value: i32) -> Self {
        Self {
            intervals: vec![(value, value)],
        }
    }

    /// Single-interval set, inclusive on both ends.
    pub fn range(from: i32, to: i32) -> Self {
        debug_assert!(from <= to);
        Self {
            intervals: vec![(from, to)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of contained values.
    pub fn len(&self) -> usize {
        self.intervals
            .iter()
            .map(|&(lo, hi)| (hi - lo) as usize + 1)
            .sum()
    }

    pub fn contains(&self, value: i32) -> bool {
        self.intervals
            .binary_search_by(|&(lo, hi)| {
                if value < lo {
                    std::cmp::Ordering::Greater
                } else if value > hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Adds an inclusive interval, merging with neighbors.
    pub fn add(&mut self, from: i32, to: i32) {
        debug_assert!(from <= to);
        let mut merged: Vec<(i32, i32)> = Vec::with_capacity(self.intervals.len() + 1);
        let mut new = (from, to);
        let mut placed = false;
        for &(lo, hi) in &self.intervals {
            if placed {
                merged.push((lo, hi));
            } else if hi as i64 + 1 < new.0 as i64 {
                // Entirely before the new interval.
                merged.push((lo, hi));
            } else if new.1 as i64 + 1 < lo as i64 {
                // Entirely after: place the new interval first.
                merged.push(new);
                merged.push((lo, hi));
                placed = true;
            } else {
                // Overlapping or adjacent: absorb.
                new = (new.0.min(lo), new.1.max(hi));
            }
        }
        if !placed {
            merged.push(new);
        }
        self.intervals = merged;
    }

    pub fn add_value(&mut self, value: i32) {
        self.add(value, value);
    }

    pub fn union(&mut self, other: &IntervalSet) {
        for &(lo, hi) in &other.intervals {
            self.add(lo, hi);
        }
    }

    /// True when the two sets share any value.
    pub fn intersects(&self, other: &IntervalSet) -> bool {
        let mut a = self.intervals.iter().peekable();
        let mut b = other.intervals.iter().peekable();
        while let (Some(&&(alo, ahi)), Some(&&(blo, bhi))) = (a.peek(), b.peek()) {
            if ahi < blo {
                a.next();
            } else if bhi < alo {
                b.next();
            } else {
                return true;
            }
        }
        false
    }

    /// Iterates the contained intervals.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.intervals.iter().copied()
    }

    /// Iterates every contained value. Intended for small sets.
    pub fn values(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|&(lo, hi)| lo..=hi)
    }

    /// Smallest contained value.
    pub fn min(&self) -> Option<i32> {
        self.intervals.first().map(|&(lo, _)| lo)
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        let mut set = IntervalSet::new();
        for value in iter {
            set.add_value(value);
        }
        set
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (lo, hi)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if lo == hi {
                write!(f, "{lo}")?;
            } else {
                write!(f, "{lo}..{hi}")?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_merges_overlapping() {
        let mut set = IntervalSet::new();
        set.add(5, 10);
        set.add(1, 3);
        set.add(9, 15);
        assert_eq!(set.to_string(), "{1..3, 5..15}");
        assert!(set.contains(1));
        assert!(set.contains(12));
        assert!(!set.contains(4));
    }

    #[test]
    fn add_merges_adjacent() {
        let mut set = IntervalSet::new();
        set.add(1, 2);
        set.add(3, 4);
        assert_eq!(set.to_string(), "{1..4}");
    }

    #[test]
    fn singleton_display() {
        assert_eq!(IntervalSet::of(7).to_string(), "{7}");
    }

    #[test]
    fn len_counts_values() {
        let mut set = IntervalSet::range(10, 12);
        set.add_value(20);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn intersects_detects_overlap() {
        let a = IntervalSet::range(1, 5);
        let b = IntervalSet::range(5, 9);
        let c = IntervalSet::range(6, 9);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&IntervalSet::new()));
    }

    #[test]
    fn union_and_values() {
        let mut a = IntervalSet::of(1);
        a.union(&IntervalSet::range(3, 4));
        let values: Vec<i32> = a.values().collect();
        assert_eq!(values, vec![1, 3, 4]);
        assert_eq!(a.min(), Some(1));
    }

    #[test]
    fn from_iter_collects() {
        let set: IntervalSet = [4, 2, 3, 9].into_iter().collect();
        assert_eq!(set.to_string(), "{2..4, 9}");
    }

    #[test]
    fn negative_values_sort_correctly() {
        let mut set = IntervalSet::of(-1);
        set.add_value(5);
        assert_eq!(set.min(), Some(-1));
        assert!(set.contains(-1));
        assert!(!set.contains(0));
    }
}
