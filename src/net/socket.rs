//! Socket setup and the outgoing send path.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use anyhow::Context;
use lanchat_protocol::wire::Packet;
use nanorand::Rng;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::net::codec;

/// Figures out which interface address outbound traffic leaves through.
///
/// Connecting a UDP socket sends nothing; it only makes the OS route the
/// destination, and `local_addr` then reports the chosen interface.
pub fn local_ipv4() -> anyhow::Result<Ipv4Addr> {
   let probe = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
      .context("cannot open interface probe socket")?;
   probe
      .connect((Ipv4Addr::new(8, 8, 8, 8), 53))
      .context("cannot resolve the outbound interface")?;
   match probe.local_addr()? {
      SocketAddr::V4(addr) => Ok(*addr.ip()),
      SocketAddr::V6(_) => anyhow::bail!("the outbound interface has no IPv4 address"),
   }
}

/// Binds the node's one unicast socket.
///
/// This socket receives everything addressed straight to us (including
/// subnet broadcasts, hence the wildcard bind) and is also the single send
/// path: a UDP socket can address unicast, broadcast and multicast
/// destinations alike, so outgoing multicast merely needs the right
/// interface pinned here.
pub fn bind_unicast(interface: Ipv4Addr, port: u16) -> anyhow::Result<UdpSocket> {
   let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
   socket.set_broadcast(true)?;
   socket.set_multicast_if_v4(&interface)?;
   socket.set_multicast_loop_v4(true)?;
   socket
      .bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)).into())
      .with_context(|| format!("cannot bind unicast port {}", port))?;
   socket.set_nonblocking(true)?;
   Ok(UdpSocket::from_std(socket.into())?)
}

/// Opens a receive socket subscribed to a room's multicast group.
///
/// Every joined room gets one of these. The port is shared between all
/// rooms on the machine, so the bind must be reusable.
pub fn join_multicast(group: SocketAddrV4, interface: Ipv4Addr) -> anyhow::Result<UdpSocket> {
   let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
   socket.set_reuse_address(true)?;
   socket
      .bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, group.port())).into())
      .with_context(|| format!("cannot bind multicast port {}", group.port()))?;
   socket
      .join_multicast_v4(group.ip(), &interface)
      .with_context(|| format!("cannot join multicast group {}", group))?;
   socket.set_nonblocking(true)?;
   Ok(UdpSocket::from_std(socket.into())?)
}

/// Picks a random multicast group for a new room.
///
/// Groups live in the administratively scoped 239.0.0.0/8 block; 239.0.x.x
/// is left out because parts of it are reserved. Two rooms landing on the
/// same group is tolerated: every room packet names its room ID, so the
/// wrong room's traffic is rejected when handled.
pub fn alloc_group(port: u16) -> SocketAddrV4 {
   let mut rng = nanorand::tls_rng();
   let ip = Ipv4Addr::new(
      239,
      rng.generate_range(1..=255u8),
      rng.generate_range(0..=255u8),
      rng.generate_range(0..=255u8),
   );
   SocketAddrV4::new(ip, port)
}

/// A cheap-to-clone handle for sending packets anywhere.
///
/// Encodes and writes; acknowledgement tracking and retransmission live
/// with the coordinator, never here.
#[derive(Clone)]
pub struct Sender {
   socket: Arc<UdpSocket>,
   unicast_port: u16,
}

impl Sender {
   pub fn new(socket: Arc<UdpSocket>, unicast_port: u16) -> Self {
      Self {
         socket,
         unicast_port,
      }
   }

   /// Encodes `packet` and sends it to `to`, which may be a unicast,
   /// broadcast or multicast destination.
   pub async fn send(&self, packet: &Packet, to: SocketAddr) -> anyhow::Result<()> {
      let encoded = codec::encode(packet)?;
      self.socket.send_to(&encoded, to).await?;
      Ok(())
   }

   /// Sends `packet` to the whole subnet on the shared unicast port.
   pub async fn broadcast(&self, packet: &Packet) -> anyhow::Result<()> {
      self.send(packet, SocketAddr::from((Ipv4Addr::BROADCAST, self.unicast_port))).await
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn allocated_groups_stay_in_the_scoped_block() {
      for _ in 0..1000 {
         let group = alloc_group(9001);
         let octets = group.ip().octets();
         assert_eq!(octets[0], 239);
         assert!(octets[1] >= 1);
         assert_eq!(group.port(), 9001);
      }
   }
}
