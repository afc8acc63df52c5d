//! Rooms, the deferral queue, and causal delivery.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddrV4;

use lanchat_protocol::clock::VectorClock;
use lanchat_protocol::wire::{PeerId, RoomId, RoomInfo, TextMessage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoomError {
   #[error("no room is called '{0}'")]
   NoSuchRoom(String),
   #[error("'{name}' names {} rooms; they need distinct names to be addressed", .candidates.len())]
   AmbiguousName {
      name: String,
      candidates: Vec<RoomId>,
   },
   #[error("a room needs at least one other member")]
   EmptyRoom,
}

/// The verdict on an incoming room text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
   /// Causally ready (or acceptably concurrent); show it now.
   Deliver,
   /// Depends on texts we have not seen; park it in the queue.
   Defer,
   /// Already covered by our clock; a duplicate or superseded copy.
   Discard,
}

/// One chat room as this node sees it.
///
/// Members are referenced by ID only; their addresses and nicknames live in
/// the peer registry. The clock keeps a coordinate for every member, and
/// the queue holds texts whose causal dependencies have not arrived yet.
pub struct Room {
   pub id: RoomId,
   pub name: String,
   pub group: SocketAddrV4,
   pub members: Vec<PeerId>,
   pub clock: VectorClock,
   queue: VecDeque<TextMessage>,
   /// Delivered texts, in delivery order: `(author, text)`.
   pub transcript: Vec<(PeerId, String)>,
}

impl Room {
   pub fn new(id: RoomId, name: String, group: SocketAddrV4, members: Vec<PeerId>) -> Self {
      let mut clock = VectorClock::new();
      for &member in &members {
         clock.ensure(member);
      }
      Self {
         id,
         name,
         group,
         members,
         clock,
         queue: VecDeque::new(),
         transcript: Vec::new(),
      }
   }

   pub fn from_info(info: &RoomInfo) -> Self {
      Self::new(
         info.id,
         info.name.clone(),
         info.group,
         info.members.iter().map(|member| member.id).collect(),
      )
   }

   pub fn contains(&self, peer: PeerId) -> bool {
      self.members.contains(&peer)
   }

   /// Members other than `local`; the set whose acks a multicast from this
   /// node must collect.
   pub fn members_except(&self, local: PeerId) -> Vec<PeerId> {
      self.members.iter().copied().filter(|&member| member != local).collect()
   }

   /// Decides what to do with `message` against the room clock.
   ///
   /// With `R` the room clock and `M` the message clock from author `S`:
   ///
   /// - `M ≤ R`: nothing new, discard.
   /// - `M` and `R` concurrent: accept only a one-step divergence, measured
   ///   on the coordinate sums with the local peer's coordinate excluded
   ///   (our own sends are in `R` but never in a remote `M`, so they would
   ///   inflate the distance). Anything wider waits for fill-in.
   /// - `R < M`: accept exactly the author's next text (`M[S] = R[S] + 1`)
   ///   provided `M` shows no other dependency we lack.
   pub fn classify(&self, local: PeerId, message: &TextMessage) -> Delivery {
      let room_clock = &self.clock;
      let message_clock = &message.clock;

      if message_clock.le(room_clock) {
         return Delivery::Discard;
      }

      if message_clock.concurrent(room_clock) {
         let ours = room_clock.sum_excluding(local);
         let theirs = message_clock.sum_excluding(local);
         return if ours.abs_diff(theirs) <= 1 {
            Delivery::Deliver
         } else {
            Delivery::Defer
         };
      }

      // Causally later than everything we have: R < M.
      let author = message.author;
      let next_from_author = message_clock.get(author) == room_clock.get(author) + 1;
      let no_missing_dependencies = message_clock
         .entries()
         .all(|(id, count)| id == author || count <= room_clock.get(id));
      if next_from_author && no_missing_dependencies {
         Delivery::Deliver
      } else {
         Delivery::Defer
      }
   }

   /// Runs `message` through the causal delivery decision, flushing any
   /// queued texts the delivery unblocks. Returns everything delivered,
   /// in delivery order.
   pub fn receive(&mut self, local: PeerId, message: TextMessage) -> Vec<TextMessage> {
      let mut delivered = Vec::new();
      match self.classify(local, &message) {
         Delivery::Discard => {}
         Delivery::Defer => self.queue.push_back(message),
         Delivery::Deliver => {
            self.deliver(&message);
            delivered.push(message);
            self.flush_queue(local, &mut delivered);
         }
      }
      delivered
   }

   /// Records a text the local user typed; their coordinate was already
   /// incremented by the caller.
   pub fn append_local(&mut self, local: PeerId, text: String) {
      self.transcript.push((local, text));
   }

   pub fn queued(&self) -> usize {
      self.queue.len()
   }

   fn deliver(&mut self, message: &TextMessage) {
      self.transcript.push((message.author, message.text.clone()));
      self.clock.merge(&message.clock);
   }

   /// Rescans the deferral queue until no entry changes state. Each
   /// delivery merges a clock and may unblock entries scanned before it,
   /// so the scan restarts after every hit. Queued texts the clock has
   /// overtaken are discarded.
   fn flush_queue(&mut self, local: PeerId, delivered: &mut Vec<TextMessage>) {
      loop {
         let mut progressed = false;
         let mut index = 0;
         while index < self.queue.len() {
            match self.classify(local, &self.queue[index]) {
               Delivery::Deliver => {
                  let message = self.queue.remove(index).unwrap();
                  self.deliver(&message);
                  delivered.push(message);
                  progressed = true;
                  break;
               }
               Delivery::Discard => {
                  self.queue.remove(index);
                  progressed = true;
               }
               Delivery::Defer => index += 1,
            }
         }
         if !progressed {
            break;
         }
      }
   }
}

/// Which side of the registry a room sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
   /// This node created the room and is the only one who may delete it.
   Created,
   /// This node was added by someone else.
   Participating,
}

/// All rooms this node is in, split by who created them.
///
/// A room ID lives on exactly one side. Names are not unique; lookups by
/// name report ambiguity instead of guessing.
#[derive(Default)]
pub struct RoomRegistry {
   created: HashMap<RoomId, Room>,
   participating: HashMap<RoomId, Room>,
}

impl RoomRegistry {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn insert_created(&mut self, room: Room) {
      debug_assert!(!self.participating.contains_key(&room.id));
      self.created.insert(room.id, room);
   }

   /// Adds a room someone else created. Returns `false` if the room is
   /// already known (a retransmitted invitation).
   pub fn insert_participating(&mut self, room: Room) -> bool {
      if self.created.contains_key(&room.id) || self.participating.contains_key(&room.id) {
         return false;
      }
      self.participating.insert(room.id, room);
      true
   }

   pub fn get(&self, id: RoomId) -> Option<&Room> {
      self.created.get(&id).or_else(|| self.participating.get(&id))
   }

   pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
      self.created.get_mut(&id).or_else(|| self.participating.get_mut(&id))
   }

   pub fn origin(&self, id: RoomId) -> Option<Origin> {
      if self.created.contains_key(&id) {
         Some(Origin::Created)
      } else if self.participating.contains_key(&id) {
         Some(Origin::Participating)
      } else {
         None
      }
   }

   pub fn remove(&mut self, id: RoomId) -> Option<Room> {
      self.created.remove(&id).or_else(|| self.participating.remove(&id))
   }

   /// Resolves a room by name across both sides.
   pub fn by_name(&self, name: &str) -> Result<&Room, RoomError> {
      let mut matches =
         self.iter().filter(|(room, _)| room.name == name).map(|(room, _)| room);
      match (matches.next(), matches.next()) {
         (None, _) => Err(RoomError::NoSuchRoom(name.to_owned())),
         (Some(room), None) => Ok(room),
         (Some(first), Some(second)) => {
            let mut candidates = vec![first.id, second.id];
            candidates.extend(matches.map(|room| room.id));
            Err(RoomError::AmbiguousName {
               name: name.to_owned(),
               candidates,
            })
         }
      }
   }

   /// IDs of every room, on either side, that `peer` is a member of.
   pub fn rooms_with_member(&self, peer: PeerId) -> Vec<RoomId> {
      self
         .iter()
         .filter(|(room, _)| room.contains(peer))
         .map(|(room, _)| room.id)
         .collect()
   }

   pub fn iter(&self) -> impl Iterator<Item = (&Room, Origin)> {
      self
         .created
         .values()
         .map(|room| (room, Origin::Created))
         .chain(self.participating.values().map(|room| (room, Origin::Participating)))
   }

   pub fn is_empty(&self) -> bool {
      self.created.is_empty() && self.participating.is_empty()
   }
}
