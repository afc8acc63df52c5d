//! The lanchat node.
//!
//! Startup wires four independent tasks around one event channel: the
//! unicast listener, the shell, per-room multicast listeners spawned
//! later, and the coordinator that owns every piece of state. Once the
//! coordinator finishes its departure handshake, everything else is torn
//! down and the process exits.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use lanchat_protocol::wire::{Peer, PeerId};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod acks;
mod cli;
mod config;
mod coordinator;
mod net;
mod peers;
mod rooms;
mod shell;

use cli::Options;
use config::UserConfig;
use coordinator::Coordinator;
use net::socket::{self, Sender};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
   tracing_subscriber::fmt()
      .with_env_filter(
         EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lanchat=info")),
      )
      .init();

   let options = Options::parse();
   let mut config = UserConfig::load_or_create()?;
   if let Some(nickname) = options.nickname {
      config.nickname = nickname;
   }
   if let Some(port) = options.unicast_port {
      config.net.unicast_port = port;
   }
   if let Some(port) = options.multicast_port {
      config.net.multicast_port = port;
   }

   let interface = socket::local_ipv4()?;
   let unicast = Arc::new(socket::bind_unicast(interface, config.net.unicast_port)?);
   let self_peer = Peer {
      id: PeerId::new(),
      nickname: config.nickname.clone(),
      addr: SocketAddr::from((interface, config.net.unicast_port)),
   };
   info!(
      "lanchat {} running as {} ({}) on {}",
      env!("CARGO_PKG_VERSION"),
      self_peer.nickname,
      self_peer.id,
      self_peer.addr,
   );

   let (events_tx, events_rx) = mpsc::channel(128);
   let (notifications_tx, notifications_rx) = mpsc::channel(128);

   let sender = Sender::new(Arc::clone(&unicast), config.net.unicast_port);
   let unicast_listener = tokio::spawn(net::listener::unicast_listener(
      unicast,
      self_peer.addr,
      events_tx.clone(),
   ));
   let shell = tokio::spawn(shell::run(events_tx.clone(), notifications_rx));

   let coordinator = Coordinator::new(
      self_peer,
      interface,
      config.net.multicast_port,
      Duration::from_millis(config.net.retransmit_interval_ms),
      sender,
      events_tx,
      events_rx,
      notifications_tx,
   );
   coordinator.run().await;

   unicast_listener.abort();
   shell.abort();
   Ok(())
}
