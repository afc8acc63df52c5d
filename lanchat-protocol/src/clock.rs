//! Vector clocks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::wire::PeerId;

/// A vector clock: one monotonically increasing counter per peer.
///
/// Coordinates that were never written read as 0, so clocks over different
/// member sets still compare. The map is ordered so that two equal clocks
/// always encode to the same bytes.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct VectorClock {
   counters: BTreeMap<PeerId, u64>,
}

impl VectorClock {
   pub fn new() -> Self {
      Self::default()
   }

   /// Returns the counter for `id`, 0 if the coordinate is absent.
   pub fn get(&self, id: PeerId) -> u64 {
      self.counters.get(&id).copied().unwrap_or(0)
   }

   /// Materializes an explicit 0 coordinate for `id` if there is none yet.
   ///
   /// Room clocks keep a coordinate for every member, even the silent ones.
   pub fn ensure(&mut self, id: PeerId) {
      self.counters.entry(id).or_insert(0);
   }

   /// Bumps the coordinate of `id` by one.
   pub fn increment(&mut self, id: PeerId) {
      *self.counters.entry(id).or_insert(0) += 1;
   }

   /// Coordinate-wise maximum of `self` and `other`, stored in `self`.
   pub fn merge(&mut self, other: &VectorClock) {
      for (&id, &count) in &other.counters {
         let entry = self.counters.entry(id).or_insert(0);
         *entry = (*entry).max(count);
      }
   }

   /// `self ≤ other`: every coordinate of `self` is at most the matching
   /// coordinate of `other`.
   pub fn le(&self, other: &VectorClock) -> bool {
      self.counters.iter().all(|(&id, &count)| count <= other.get(id))
   }

   /// `self < other`: causally strictly earlier.
   pub fn lt(&self, other: &VectorClock) -> bool {
      self.le(other) && self != other
   }

   /// Neither clock happened-before the other.
   pub fn concurrent(&self, other: &VectorClock) -> bool {
      !self.le(other) && !other.le(self)
   }

   /// Sum of all coordinates except the one belonging to `excluded`.
   pub fn sum_excluding(&self, excluded: PeerId) -> u64 {
      self
         .counters
         .iter()
         .filter(|(&id, _)| id != excluded)
         .map(|(_, &count)| count)
         .sum()
   }

   /// Iterates over the explicitly stored coordinates.
   pub fn entries(&self) -> impl Iterator<Item = (PeerId, u64)> + '_ {
      self.counters.iter().map(|(&id, &count)| (id, count))
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn clock(entries: &[(PeerId, u64)]) -> VectorClock {
      let mut c = VectorClock::new();
      for &(id, count) in entries {
         for _ in 0..count {
            c.increment(id);
         }
      }
      c
   }

   #[test]
   fn absent_coordinates_read_as_zero() {
      let c = VectorClock::new();
      assert_eq!(c.get(PeerId::new()), 0);
   }

   #[test]
   fn increment_strictly_raises_the_order() {
      let a = PeerId::new();
      let mut c = clock(&[(a, 2)]);
      let before = c.clone();
      c.increment(a);
      assert!(before.lt(&c));
      assert!(!c.le(&before));
   }

   #[test]
   fn merge_is_commutative() {
      let (a, b) = (PeerId::new(), PeerId::new());
      let x = clock(&[(a, 3), (b, 1)]);
      let y = clock(&[(a, 1), (b, 4)]);
      let mut xy = x.clone();
      xy.merge(&y);
      let mut yx = y.clone();
      yx.merge(&x);
      assert_eq!(xy, yx);
   }

   #[test]
   fn merge_is_associative() {
      let (a, b, c) = (PeerId::new(), PeerId::new(), PeerId::new());
      let x = clock(&[(a, 2)]);
      let y = clock(&[(b, 5)]);
      let z = clock(&[(c, 1), (a, 1)]);
      let mut left = x.clone();
      left.merge(&y);
      left.merge(&z);
      let mut yz = y.clone();
      yz.merge(&z);
      let mut right = x;
      right.merge(&yz);
      assert_eq!(left, right);
   }

   #[test]
   fn merge_is_idempotent() {
      let a = PeerId::new();
      let x = clock(&[(a, 3)]);
      let mut twice = x.clone();
      twice.merge(&x);
      assert_eq!(twice, x);
   }

   #[test]
   fn concurrent_clocks_are_unordered() {
      let (a, b) = (PeerId::new(), PeerId::new());
      let x = clock(&[(a, 1)]);
      let y = clock(&[(b, 1)]);
      assert!(x.concurrent(&y));
      assert!(!x.le(&y));
      assert!(!y.le(&x));
   }

   #[test]
   fn sum_excluding_skips_one_coordinate() {
      let (a, b, c) = (PeerId::new(), PeerId::new(), PeerId::new());
      let x = clock(&[(a, 2), (b, 3), (c, 5)]);
      assert_eq!(x.sum_excluding(b), 7);
      assert_eq!(x.sum_excluding(PeerId::new()), 10);
   }

   #[test]
   fn ensure_keeps_existing_counts() {
      let a = PeerId::new();
      let mut x = clock(&[(a, 4)]);
      x.ensure(a);
      assert_eq!(x.get(a), 4);
      let b = PeerId::new();
      x.ensure(b);
      assert_eq!(x.get(b), 0);
      assert_eq!(x.entries().count(), 2);
   }
}
