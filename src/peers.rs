//! The registry of known peers.

use lanchat_protocol::wire::{Peer, PeerId};

/// Every peer this node has heard from, in the order they were first seen.
///
/// Uniqueness is by ID; the node's own peer record never enters the
/// registry. Insertion order doubles as the numbering the shell shows next
/// to each peer, so `create` can select members by index.
pub struct PeerRegistry {
   self_id: PeerId,
   peers: Vec<Peer>,
}

impl PeerRegistry {
   pub fn new(self_id: PeerId) -> Self {
      Self {
         self_id,
         peers: Vec::new(),
      }
   }

   /// Adds a peer. Returns `false` if the peer is this node itself or is
   /// already known; duplicate announcements are routine, not errors.
   pub fn add(&mut self, peer: Peer) -> bool {
      if peer.id == self.self_id || self.peers.iter().any(|known| known.id == peer.id) {
         return false;
      }
      self.peers.push(peer);
      true
   }

   /// Forgets a peer. Removing an unknown ID is a no-op.
   pub fn remove(&mut self, id: PeerId) -> Option<Peer> {
      let index = self.peers.iter().position(|peer| peer.id == id)?;
      Some(self.peers.remove(index))
   }

   pub fn get(&self, id: PeerId) -> Option<&Peer> {
      self.peers.iter().find(|peer| peer.id == id)
   }

   pub fn by_index(&self, index: usize) -> Option<&Peer> {
      self.peers.get(index)
   }

   pub fn iter(&self) -> impl Iterator<Item = &Peer> {
      self.peers.iter()
   }

   pub fn len(&self) -> usize {
      self.peers.len()
   }

   pub fn is_empty(&self) -> bool {
      self.peers.is_empty()
   }
}
