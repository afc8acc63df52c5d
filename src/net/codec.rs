//! Encoding packets into datagrams and back.

use lanchat_protocol::wire::{Packet, MAX_PACKET_SIZE};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
   #[error("serialization error: {0}")]
   Serialize(#[from] bincode::Error),
   #[error("packet is too big: {0} bytes")]
   TooBig(usize),
}

/// Encodes a packet into a buffer that fits one datagram.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
   let encoded = bincode::serialize(packet)?;
   if encoded.len() > MAX_PACKET_SIZE {
      return Err(CodecError::TooBig(encoded.len()));
   }
   Ok(encoded)
}

/// Decodes a received datagram. Anything bincode rejects is treated as
/// noise by the caller.
pub fn decode(buffer: &[u8]) -> Result<Packet, CodecError> {
   Ok(bincode::deserialize(buffer)?)
}

#[cfg(test)]
mod tests {
   use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

   use lanchat_protocol::clock::VectorClock;
   use lanchat_protocol::wire::{AckId, Peer, PeerId, RoomId, RoomInfo, TextMessage};

   use super::*;

   fn peer(nickname: &str) -> Peer {
      Peer {
         id: PeerId::new(),
         nickname: nickname.to_owned(),
         addr: SocketAddr::from(([192, 168, 0, 7], 9000)),
      }
   }

   fn room() -> RoomInfo {
      RoomInfo {
         id: RoomId::new(),
         name: "lounge".to_owned(),
         group: SocketAddrV4::new(Ipv4Addr::new(239, 14, 3, 200), 9001),
         members: vec![peer("alice"), peer("bob")],
      }
   }

   fn text() -> TextMessage {
      let author = PeerId::new();
      let mut clock = VectorClock::new();
      clock.increment(author);
      TextMessage {
         room_id: RoomId::new(),
         author,
         text: "hi".to_owned(),
         clock,
         ack_id: AckId::new(),
      }
   }

   #[test]
   fn every_kind_round_trips() {
      let packets = [
         Packet::Ping(peer("alice")),
         Packet::Pong(peer("bob")),
         Packet::RoomMembership {
            room: room(),
            ack_id: AckId::new(),
         },
         Packet::DeleteRoom {
            room_id: RoomId::new(),
            ack_id: AckId::new(),
         },
         Packet::RoomText(text()),
         Packet::LeaveNetwork {
            peer: peer("carol"),
            ack_id: AckId::new(),
         },
         Packet::AckUni {
            sender: PeerId::new(),
            ack_id: AckId::new(),
         },
         Packet::AckMulti {
            sender: PeerId::new(),
            ack_id: AckId::new(),
         },
      ];
      for packet in packets {
         let decoded = decode(&encode(&packet).unwrap()).unwrap();
         assert_eq!(decoded, packet);
      }
   }

   #[test]
   fn oversize_packets_are_rejected() {
      let mut message = text();
      message.text = "x".repeat(MAX_PACKET_SIZE);
      assert!(matches!(
         encode(&Packet::RoomText(message)),
         Err(CodecError::TooBig(_))
      ));
   }

   #[test]
   fn garbage_does_not_decode() {
      assert!(decode(&[0xff; 11]).is_err());
      assert!(decode(&[]).is_err());
   }
}
