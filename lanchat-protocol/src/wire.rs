//! Datagram packets.

use std::fmt::{self, Display, Formatter};
use std::net::{SocketAddr, SocketAddrV4};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::VectorClock;

/// The default port every node binds for unicast traffic.
pub const DEFAULT_UNICAST_PORT: u16 = 9000;

/// The default port room multicast groups use.
pub const DEFAULT_MULTICAST_PORT: u16 = 9001;

/// The maximum length of an encoded packet.
///
/// One packet must fit a single datagram, and we aim below the common
/// Ethernet MTU: 1500 bytes minus the IPv4 and UDP headers.
pub const MAX_PACKET_SIZE: usize = 1472;

/// The first 4 bytes of an ID, enough to tell ids apart in logs.
struct ShortHex([u8; 4]);

fn short_hex(id: Uuid) -> ShortHex {
   let bytes = id.as_bytes();
   ShortHex([bytes[0], bytes[1], bytes[2], bytes[3]])
}

impl Display for ShortHex {
   fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
      for byte in self.0 {
         write!(f, "{:02x}", byte)?;
      }
      Ok(())
   }
}

/// The unique ID of a peer.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct PeerId(pub Uuid);

impl PeerId {
   /// Generates a fresh random peer ID.
   pub fn new() -> Self {
      Self(Uuid::new_v4())
   }
}

impl Default for PeerId {
   fn default() -> Self {
      Self::new()
   }
}

impl Display for PeerId {
   fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
      write!(f, "p:{}", short_hex(self.0))
   }
}

impl fmt::Debug for PeerId {
   fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
      write!(f, "{}", self)
   }
}

/// The unique ID of a room.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct RoomId(pub Uuid);

impl RoomId {
   pub fn new() -> Self {
      Self(Uuid::new_v4())
   }
}

impl Default for RoomId {
   fn default() -> Self {
      Self::new()
   }
}

impl Display for RoomId {
   fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
      write!(f, "r:{}", short_hex(self.0))
   }
}

impl fmt::Debug for RoomId {
   fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
      write!(f, "{}", self)
   }
}

/// The ID tying a sent packet to the acknowledgements it expects.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct AckId(pub Uuid);

impl AckId {
   pub fn new() -> Self {
      Self(Uuid::new_v4())
   }
}

impl Default for AckId {
   fn default() -> Self {
      Self::new()
   }
}

impl Display for AckId {
   fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
      write!(f, "a:{}", short_hex(self.0))
   }
}

impl fmt::Debug for AckId {
   fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
      write!(f, "{}", self)
   }
}

/// A participant in the network, as carried on the wire.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Peer {
   pub id: PeerId,
   pub nickname: String,
   /// Where the peer listens for unicast datagrams.
   pub addr: SocketAddr,
}

/// The full description of a room, as sent to each invited member.
///
/// Members are complete [`Peer`] records, not just ids: the receiver may
/// have never seen some of them and learns their addresses from here. The
/// multicast group carries its port so everyone joins what the creator
/// picked.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct RoomInfo {
   pub id: RoomId,
   pub name: String,
   pub group: SocketAddrV4,
   pub members: Vec<Peer>,
}

/// A chat message inside a room.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct TextMessage {
   pub room_id: RoomId,
   pub author: PeerId,
   pub text: String,
   /// The author's room clock, snapshotted right after incrementing their
   /// own coordinate.
   pub clock: VectorClock,
   pub ack_id: AckId,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub enum Packet {
   // ---
   // Discovery
   // ---
   /// Broadcast probe announcing the sender to the subnet.
   Ping(Peer),
   /// Unicast reply to a [`Packet::Ping`], introducing the responder.
   Pong(Peer),

   // ---
   // Room lifecycle
   // ---
   /// Invitation carrying the full room; unicast to each member by the
   /// creator. Expects [`Packet::AckUni`].
   RoomMembership { room: RoomInfo, ack_id: AckId },
   /// Room teardown, multicast on the room's group by its creator.
   /// Expects [`Packet::AckMulti`].
   DeleteRoom { room_id: RoomId, ack_id: AckId },

   // ---
   // Chat
   // ---
   /// A text, multicast on the room's group. Expects [`Packet::AckMulti`].
   RoomText(TextMessage),

   // ---
   // Departure
   // ---
   /// Farewell, unicast to every known peer. Expects [`Packet::AckUni`].
   LeaveNetwork { peer: Peer, ack_id: AckId },

   // ---
   // Acknowledgements
   // ---
   /// Confirms receipt of a unicast packet.
   AckUni { sender: PeerId, ack_id: AckId },
   /// Confirms receipt of a multicast packet.
   AckMulti { sender: PeerId, ack_id: AckId },
}

impl Packet {
   /// The ID of the peer a packet originates from, where the payload
   /// carries one.
   ///
   /// Multicast listeners use this to drop the loopback copy of their own
   /// sends. `DeleteRoom` names no sender; a creator's own delete is
   /// filtered later because only participating rooms react to it.
   pub fn sender(&self) -> Option<PeerId> {
      match self {
         Packet::Ping(peer) | Packet::Pong(peer) => Some(peer.id),
         Packet::RoomText(message) => Some(message.author),
         Packet::LeaveNetwork { peer, .. } => Some(peer.id),
         Packet::AckUni { sender, .. } | Packet::AckMulti { sender, .. } => Some(*sender),
         Packet::RoomMembership { .. } | Packet::DeleteRoom { .. } => None,
      }
   }
}
