//! Acknowledgement waiting lists.
//!
//! Every packet that expects confirmations gets a waiting list here,
//! keyed by its ack ID. The table is pure bookkeeping: the coordinator
//! runs one retransmission timer per live list, asks [`AckTable::resend_plan`]
//! what a tick should emit, and stops the timer the moment a list
//! completes.

use std::collections::{HashMap, HashSet};
use std::net::{SocketAddr, SocketAddrV4};

use lanchat_protocol::wire::{AckId, Packet, PeerId};

/// What became of a waiting list after an acknowledgement.
#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
   /// The last outstanding confirmation arrived; the list is gone.
   Done,
   /// Confirmations are still owed.
   Pending,
   /// No list with that ID; a duplicate ack after completion.
   Unknown,
}

enum WaitingList {
   /// One entry per destination the packet was unicast to. Entries are
   /// removed as their destinations confirm.
   Unicast { entries: Vec<(Packet, SocketAddr)> },
   /// One multicast packet and the set of members still owing an ack.
   Multicast {
      packet: Packet,
      group: SocketAddrV4,
      pending: HashSet<PeerId>,
   },
}

#[derive(Default)]
pub struct AckTable {
   lists: HashMap<AckId, WaitingList>,
}

impl AckTable {
   pub fn new() -> Self {
      Self::default()
   }

   /// Tracks a packet (or several sharing one ack ID) sent by unicast.
   pub fn insert_unicast(&mut self, ack_id: AckId, entries: Vec<(Packet, SocketAddr)>) {
      debug_assert!(!entries.is_empty());
      self.lists.insert(ack_id, WaitingList::Unicast { entries });
   }

   /// Tracks a packet multicast to `group`, awaiting `pending`'s acks.
   pub fn insert_multicast(
      &mut self,
      ack_id: AckId,
      packet: Packet,
      group: SocketAddrV4,
      pending: HashSet<PeerId>,
   ) {
      debug_assert!(!pending.is_empty());
      self.lists.insert(
         ack_id,
         WaitingList::Multicast {
            packet,
            group,
            pending,
         },
      );
   }

   /// Records a unicast acknowledgement arriving from `from`.
   pub fn ack_unicast(&mut self, ack_id: AckId, from: SocketAddr) -> Completion {
      let Some(WaitingList::Unicast { entries }) = self.lists.get_mut(&ack_id) else {
         return Completion::Unknown;
      };
      entries.retain(|(_, to)| *to != from);
      if entries.is_empty() {
         self.lists.remove(&ack_id);
         Completion::Done
      } else {
         Completion::Pending
      }
   }

   /// Records a multicast acknowledgement from `peer`.
   pub fn ack_multicast(&mut self, ack_id: AckId, peer: PeerId) -> Completion {
      let Some(WaitingList::Multicast { pending, .. }) = self.lists.get_mut(&ack_id) else {
         return Completion::Unknown;
      };
      pending.remove(&peer);
      if pending.is_empty() {
         self.lists.remove(&ack_id);
         Completion::Done
      } else {
         Completion::Pending
      }
   }

   /// Applies the fixups for a peer leaving the network: the peer stops
   /// owing multicast acks, and unicast entries addressed to it are
   /// dropped. Returns the lists that completed as a result, so their
   /// timers can be stopped.
   pub fn peer_departed(&mut self, peer: PeerId, addr: SocketAddr) -> Vec<AckId> {
      let mut completed = Vec::new();
      for (&ack_id, list) in &mut self.lists {
         let emptied = match list {
            WaitingList::Unicast { entries } => {
               entries.retain(|(_, to)| *to != addr);
               entries.is_empty()
            }
            WaitingList::Multicast { pending, .. } => {
               pending.remove(&peer);
               pending.is_empty()
            }
         };
         if emptied {
            completed.push(ack_id);
         }
      }
      for ack_id in &completed {
         self.lists.remove(ack_id);
      }
      completed
   }

   /// Discards every multicast list aimed at `group`. Used when the room
   /// behind the group is deleted; the returned IDs still have timers
   /// running.
   pub fn drop_lists_for(&mut self, group: SocketAddrV4) -> Vec<AckId> {
      let dropped: Vec<AckId> = self
         .lists
         .iter()
         .filter_map(|(&ack_id, list)| match list {
            WaitingList::Multicast { group: target, .. } if *target == group => Some(ack_id),
            _ => None,
         })
         .collect();
      for ack_id in &dropped {
         self.lists.remove(ack_id);
      }
      dropped
   }

   /// What a retransmission tick for `ack_id` must send. Empty if the
   /// list already completed (a stale timer).
   pub fn resend_plan(&self, ack_id: AckId) -> Vec<(Packet, SocketAddr)> {
      match self.lists.get(&ack_id) {
         Some(WaitingList::Unicast { entries }) => entries.clone(),
         Some(WaitingList::Multicast { packet, group, .. }) => {
            vec![(packet.clone(), SocketAddr::V4(*group))]
         }
         None => Vec::new(),
      }
   }

   pub fn contains(&self, ack_id: AckId) -> bool {
      self.lists.contains_key(&ack_id)
   }

   pub fn is_empty(&self) -> bool {
      self.lists.is_empty()
   }
}

#[cfg(test)]
mod tests {
   use std::net::{Ipv4Addr, SocketAddr};

   use super::*;

   fn addr(host: u8) -> SocketAddr {
      SocketAddr::from(([192, 168, 1, host], 9000))
   }

   fn group() -> SocketAddrV4 {
      SocketAddrV4::new(Ipv4Addr::new(239, 20, 1, 5), 9001)
   }

   fn ack_packet() -> Packet {
      Packet::AckUni {
         sender: PeerId::new(),
         ack_id: AckId::new(),
      }
   }

   #[test]
   fn unicast_list_completes_when_every_destination_confirms() {
      let mut table = AckTable::new();
      let ack_id = AckId::new();
      table.insert_unicast(
         ack_id,
         vec![(ack_packet(), addr(10)), (ack_packet(), addr(11))],
      );

      assert_eq!(table.ack_unicast(ack_id, addr(10)), Completion::Pending);
      assert_eq!(table.resend_plan(ack_id).len(), 1);
      assert_eq!(table.ack_unicast(ack_id, addr(11)), Completion::Done);
      assert!(!table.contains(ack_id));
   }

   #[test]
   fn late_duplicate_acks_do_not_retrigger_anything() {
      let mut table = AckTable::new();
      let ack_id = AckId::new();
      table.insert_unicast(ack_id, vec![(ack_packet(), addr(10))]);

      assert_eq!(table.ack_unicast(ack_id, addr(10)), Completion::Done);
      assert_eq!(table.ack_unicast(ack_id, addr(10)), Completion::Unknown);
      assert!(table.resend_plan(ack_id).is_empty());
   }

   #[test]
   fn multicast_list_tracks_the_pending_member_set() {
      let mut table = AckTable::new();
      let ack_id = AckId::new();
      let (b, c) = (PeerId::new(), PeerId::new());
      table.insert_multicast(ack_id, ack_packet(), group(), HashSet::from([b, c]));

      // A tick resends the one multicast packet, not one per member.
      assert_eq!(table.resend_plan(ack_id).len(), 1);
      assert_eq!(table.resend_plan(ack_id)[0].1, SocketAddr::V4(group()));

      assert_eq!(table.ack_multicast(ack_id, b), Completion::Pending);
      assert_eq!(table.ack_multicast(ack_id, c), Completion::Done);
      assert_eq!(table.ack_multicast(ack_id, c), Completion::Unknown);
   }

   #[test]
   fn departing_peer_is_dropped_from_multicast_lists() {
      let mut table = AckTable::new();
      let ack_id = AckId::new();
      let (b, c) = (PeerId::new(), PeerId::new());
      table.insert_multicast(ack_id, ack_packet(), group(), HashSet::from([b, c]));

      assert!(table.peer_departed(c, addr(12)).is_empty());
      assert_eq!(table.peer_departed(b, addr(11)), vec![ack_id]);
      assert!(table.is_empty());
   }

   #[test]
   fn departing_peer_only_removes_its_own_unicast_entries() {
      let mut table = AckTable::new();
      let ack_id = AckId::new();
      table.insert_unicast(
         ack_id,
         vec![(ack_packet(), addr(10)), (ack_packet(), addr(11))],
      );

      // The other destination still owes a reply, so the list stays.
      assert!(table.peer_departed(PeerId::new(), addr(10)).is_empty());
      assert!(table.contains(ack_id));
      assert_eq!(table.resend_plan(ack_id).len(), 1);
      assert_eq!(table.resend_plan(ack_id)[0].1, addr(11));

      assert_eq!(table.peer_departed(PeerId::new(), addr(11)), vec![ack_id]);
      assert!(table.is_empty());
   }

   #[test]
   fn deleting_a_room_discards_its_multicast_lists() {
      let mut table = AckTable::new();
      let doomed = AckId::new();
      let other_group = SocketAddrV4::new(Ipv4Addr::new(239, 99, 2, 3), 9001);
      let survivor = AckId::new();
      table.insert_multicast(doomed, ack_packet(), group(), HashSet::from([PeerId::new()]));
      table.insert_multicast(
         survivor,
         ack_packet(),
         other_group,
         HashSet::from([PeerId::new()]),
      );

      assert_eq!(table.drop_lists_for(group()), vec![doomed]);
      assert!(!table.contains(doomed));
      assert!(table.contains(survivor));
   }
}
