//! Receive loops feeding the coordinator.
//!
//! Listeners never touch node state: they read, filter out our own
//! traffic, decode, and post an event. Everything else is the
//! coordinator's business.

use std::net::SocketAddr;
use std::sync::Arc;

use lanchat_protocol::wire::{PeerId, RoomId};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::coordinator::Event;
use crate::net::codec;

/// Receive buffer size. Encoded packets are capped well below this.
const RECV_BUFFER_SIZE: usize = 2048;

/// Reads the node's unicast socket until it closes or the coordinator
/// goes away.
///
/// Our own broadcasts come back to us, so datagrams whose source address
/// is this node are dropped before decoding.
pub async fn unicast_listener(
   socket: Arc<UdpSocket>,
   self_addr: SocketAddr,
   events: mpsc::Sender<Event>,
) {
   let mut buffer = [0; RECV_BUFFER_SIZE];
   loop {
      let (length, from) = match socket.recv_from(&mut buffer).await {
         Ok(received) => received,
         Err(error) => {
            // Receiving fails when the socket is torn down during
            // shutdown; that is a clean exit, not an error.
            debug!("unicast listener stopping: {}", error);
            break;
         }
      };
      if from == self_addr {
         continue;
      }
      match codec::decode(&buffer[..length]) {
         Ok(packet) => {
            trace!(?packet, %from, "unicast packet");
            if events.send(Event::Packet { packet, from }).await.is_err() {
               break;
            }
         }
         Err(error) => debug!(%from, "dropping malformed datagram: {}", error),
      }
   }
}

/// Reads one room's multicast group until the room goes away.
///
/// Multicast loopback delivers our own sends back to this socket, and the
/// source address alone cannot tell them apart reliably, so the filter is
/// the sender ID embedded in the decoded packet.
pub async fn multicast_listener(
   room_id: RoomId,
   socket: UdpSocket,
   self_id: PeerId,
   events: mpsc::Sender<Event>,
) {
   let mut buffer = [0; RECV_BUFFER_SIZE];
   loop {
      let (length, from) = match socket.recv_from(&mut buffer).await {
         Ok(received) => received,
         Err(error) => {
            debug!(%room_id, "multicast listener stopping: {}", error);
            break;
         }
      };
      match codec::decode(&buffer[..length]) {
         Ok(packet) => {
            if packet.sender() == Some(self_id) {
               continue;
            }
            trace!(?packet, %from, %room_id, "multicast packet");
            if events.send(Event::Packet { packet, from }).await.is_err() {
               break;
            }
         }
         Err(error) => debug!(%from, %room_id, "dropping malformed datagram: {}", error),
      }
   }
}
