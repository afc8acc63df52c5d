//! The coordinator: single owner of all node state.
//!
//! Listeners, retransmission timers and the shell never touch the
//! registries directly. They post [`Event`]s onto one channel, and the
//! coordinator drains it one event at a time, so every handler sees the
//! state alone. Outgoing traffic goes through [`Sender`] without waiting
//! for acknowledgements; the ack table plus one timer task per waiting
//! list take care of retransmission.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use lanchat_protocol::wire::{AckId, Packet, Peer, PeerId, RoomId, RoomInfo, TextMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::acks::{AckTable, Completion};
use crate::net::listener;
use crate::net::socket::{self, Sender};
use crate::peers::PeerRegistry;
use crate::rooms::{Origin, Room, RoomError, RoomRegistry};

/// How long shutdown waits for departure acknowledgements before the
/// process leaves anyway.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// An intent typed into the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
   Discover,
   CreateRoom {
      name: String,
      /// Zero-based indices into the discovered-peer listing.
      peer_indices: Vec<usize>,
   },
   EnterRoom { name: String },
   ExitRoom { name: String },
   SendText { text: String },
   DeleteRoom { name: String },
   ListPeers,
   ListRooms,
   Quit,
}

/// Everything that can wake the coordinator.
pub enum Event {
   /// A decoded datagram from one of the listeners.
   Packet { packet: Packet, from: SocketAddr },
   /// An intent from the shell.
   Command(Command),
   /// A waiting list's timer asking for its packets to go out again.
   Retransmit(AckId),
   /// The bounded wait for departure acknowledgements ran out.
   ShutdownDeadline,
}

/// A line the user should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
   PeerDiscovered { nickname: String },
   PeerLeft { nickname: String },
   RoomCreated { name: String },
   AddedToRoom { name: String },
   RoomDeleted { name: String },
   Entered { name: String },
   Exited { name: String },
   Text {
      room: String,
      author: String,
      text: String,
   },
   PeerList(Vec<String>),
   RoomList(Vec<String>),
   Error(String),
}

impl Display for Notification {
   fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
      match self {
         Notification::PeerDiscovered { nickname } => {
            write!(f, "* {} is on the network", nickname)
         }
         Notification::PeerLeft { nickname } => write!(f, "* {} left the network", nickname),
         Notification::RoomCreated { name } => write!(f, "* room '{}' created", name),
         Notification::AddedToRoom { name } => write!(f, "* you were added to room '{}'", name),
         Notification::RoomDeleted { name } => write!(f, "* room '{}' is gone", name),
         Notification::Entered { name } => write!(f, "* now chatting in '{}'", name),
         Notification::Exited { name } => write!(f, "* no longer chatting in '{}'", name),
         Notification::Text { room, author, text } => {
            write!(f, "[{}] {}: {}", room, author, text)
         }
         Notification::PeerList(lines) => {
            if lines.is_empty() {
               write!(f, "* no peers discovered yet (try 'discover')")
            } else {
               write!(f, "{}", lines.join("\n"))
            }
         }
         Notification::RoomList(lines) => {
            if lines.is_empty() {
               write!(f, "* no rooms yet (try 'create <name> <peer numbers>')")
            } else {
               write!(f, "{}", lines.join("\n"))
            }
         }
         Notification::Error(message) => write!(f, "error: {}", message),
      }
   }
}

pub struct Coordinator {
   self_peer: Peer,
   interface: Ipv4Addr,
   multicast_port: u16,
   retransmit_interval: Duration,
   sender: Sender,
   peers: PeerRegistry,
   rooms: RoomRegistry,
   acks: AckTable,
   /// One retransmission timer per live waiting list, aborted the moment
   /// the list completes.
   timers: HashMap<AckId, JoinHandle<()>>,
   /// One multicast receive task per joined room.
   room_listeners: HashMap<RoomId, JoinHandle<()>>,
   /// The room `send` currently writes into. Cleared by any handler that
   /// removes the underlying room.
   displayed_room: Option<RoomId>,
   /// Set once `quit` sent the departure round; the loop exits when the
   /// matching list completes or the deadline fires.
   departure: Option<AckId>,
   events_tx: mpsc::Sender<Event>,
   events: mpsc::Receiver<Event>,
   notifications: mpsc::Sender<Notification>,
}

impl Coordinator {
   #[allow(clippy::too_many_arguments)]
   pub fn new(
      self_peer: Peer,
      interface: Ipv4Addr,
      multicast_port: u16,
      retransmit_interval: Duration,
      sender: Sender,
      events_tx: mpsc::Sender<Event>,
      events: mpsc::Receiver<Event>,
      notifications: mpsc::Sender<Notification>,
   ) -> Self {
      let self_id = self_peer.id;
      Self {
         self_peer,
         interface,
         multicast_port,
         retransmit_interval,
         sender,
         peers: PeerRegistry::new(self_id),
         rooms: RoomRegistry::new(),
         acks: AckTable::new(),
         timers: HashMap::new(),
         room_listeners: HashMap::new(),
         displayed_room: None,
         departure: None,
         events_tx,
         events,
         notifications,
      }
   }

   /// Drains events until the node has left the network.
   pub async fn run(mut self) {
      while let Some(event) = self.events.recv().await {
         match event {
            Event::Packet { packet, from } => self.handle_packet(packet, from).await,
            Event::Command(command) => self.handle_command(command).await,
            Event::Retransmit(ack_id) => self.retransmit(ack_id).await,
            Event::ShutdownDeadline => {
               warn!("departure went unacknowledged; leaving anyway");
               break;
            }
         }
         if let Some(ack_id) = self.departure {
            if !self.acks.contains(ack_id) {
               break;
            }
         }
      }
      for (_, timer) in self.timers.drain() {
         timer.abort();
      }
      for (_, room_listener) in self.room_listeners.drain() {
         room_listener.abort();
      }
      info!("left the network");
   }

   //
   // Outgoing
   //

   async fn send(&self, packet: &Packet, to: SocketAddr) {
      if let Err(error) = self.sender.send(packet, to).await {
         // Send failures while leaving are the shutdown race, not news.
         if self.departure.is_none() {
            warn!(%to, "send failed: {}", error);
         }
      }
   }

   async fn ack_uni(&self, ack_id: AckId, to: SocketAddr) {
      let reply = Packet::AckUni {
         sender: self.self_peer.id,
         ack_id,
      };
      self.send(&reply, to).await;
   }

   async fn ack_multi(&self, ack_id: AckId, to: SocketAddr) {
      let reply = Packet::AckMulti {
         sender: self.self_peer.id,
         ack_id,
      };
      self.send(&reply, to).await;
   }

   //
   // Retransmission timers
   //

   fn start_timer(&mut self, ack_id: AckId) {
      let events = self.events_tx.clone();
      let period = self.retransmit_interval;
      let handle = tokio::spawn(async move {
         let mut ticks = tokio::time::interval(period);
         // An interval's first tick is immediate, and the packet already
         // went out once.
         ticks.tick().await;
         loop {
            ticks.tick().await;
            if events.send(Event::Retransmit(ack_id)).await.is_err() {
               break;
            }
         }
      });
      self.timers.insert(ack_id, handle);
   }

   fn stop_timer(&mut self, ack_id: AckId) {
      if let Some(timer) = self.timers.remove(&ack_id) {
         timer.abort();
      }
   }

   async fn retransmit(&mut self, ack_id: AckId) {
      let plan = self.acks.resend_plan(ack_id);
      if plan.is_empty() {
         // The list completed while this tick was in flight.
         self.stop_timer(ack_id);
         return;
      }
      debug!(%ack_id, packets = plan.len(), "retransmitting");
      for (packet, to) in plan {
         self.send(&packet, to).await;
      }
   }

   //
   // Room listeners
   //

   fn spawn_room_listener(&mut self, room: &Room) -> anyhow::Result<()> {
      let socket = socket::join_multicast(room.group, self.interface)?;
      let handle = tokio::spawn(listener::multicast_listener(
         room.id,
         socket,
         self.self_peer.id,
         self.events_tx.clone(),
      ));
      self.room_listeners.insert(room.id, handle);
      Ok(())
   }

   fn stop_room_listener(&mut self, room_id: RoomId) {
      if let Some(room_listener) = self.room_listeners.remove(&room_id) {
         room_listener.abort();
      }
   }

   //
   // Shell intents
   //

   async fn handle_command(&mut self, command: Command) {
      match command {
         Command::Discover => {
            debug!("broadcasting discovery ping");
            if let Err(error) = self.sender.broadcast(&Packet::Ping(self.self_peer.clone())).await
            {
               self.notify(Notification::Error(format!("discovery failed: {}", error))).await;
            }
         }
         Command::CreateRoom { name, peer_indices } => {
            match self.create_room(name, peer_indices).await {
               Ok(name) => self.notify(Notification::RoomCreated { name }).await,
               Err(message) => self.notify(Notification::Error(message)).await,
            }
         }
         Command::EnterRoom { name } => match self.rooms.by_name(&name) {
            Ok(room) => {
               self.displayed_room = Some(room.id);
               let name = room.name.clone();
               self.notify(Notification::Entered { name }).await;
            }
            Err(error) => self.notify(Notification::Error(error.to_string())).await,
         },
         Command::ExitRoom { name } => match self.rooms.by_name(&name) {
            Ok(room) if self.displayed_room == Some(room.id) => {
               self.displayed_room = None;
               let name = room.name.clone();
               self.notify(Notification::Exited { name }).await;
            }
            Ok(_) => {
               self
                  .notify(Notification::Error(format!("you are not chatting in '{}'", name)))
                  .await
            }
            Err(error) => self.notify(Notification::Error(error.to_string())).await,
         },
         Command::SendText { text } => self.send_text(text).await,
         Command::DeleteRoom { name } => self.delete_room(name).await,
         Command::ListPeers => {
            let lines = self
               .peers
               .iter()
               .enumerate()
               .map(|(index, peer)| format!("[{}] {} ({})", index + 1, peer.nickname, peer.addr))
               .collect();
            self.notify(Notification::PeerList(lines)).await;
         }
         Command::ListRooms => {
            let displayed = self.displayed_room;
            let lines = self
               .rooms
               .iter()
               .map(|(room, origin)| {
                  format!(
                     "#{} ({} members{}{})",
                     room.name,
                     room.members.len(),
                     if origin == Origin::Created { ", created here" } else { "" },
                     if displayed == Some(room.id) { ", chatting" } else { "" },
                  )
               })
               .collect();
            self.notify(Notification::RoomList(lines)).await;
         }
         Command::Quit => self.begin_departure().await,
      }
   }

   /// Builds the room, joins its group, and invites every selected peer
   /// under one shared ack ID, so any member's reply trims the same list.
   async fn create_room(
      &mut self,
      name: String,
      peer_indices: Vec<usize>,
   ) -> Result<String, String> {
      let mut selected: Vec<Peer> = Vec::new();
      for index in peer_indices {
         match self.peers.by_index(index) {
            Some(peer) => {
               if !selected.iter().any(|picked| picked.id == peer.id) {
                  selected.push(peer.clone());
               }
            }
            None => return Err(format!("no peer is listed at {}", index + 1)),
         }
      }
      if selected.is_empty() {
         return Err(RoomError::EmptyRoom.to_string());
      }

      let group = socket::alloc_group(self.multicast_port);
      let mut members = vec![self.self_peer.clone()];
      members.extend(selected.iter().cloned());
      let info = RoomInfo {
         id: RoomId::new(),
         name,
         group,
         members,
      };
      let room = Room::from_info(&info);
      if let Err(error) = self.spawn_room_listener(&room) {
         return Err(format!("cannot join group {}: {}", group, error));
      }
      info!(room = %info.id, %group, "created room '{}'", info.name);
      let name = info.name.clone();
      self.rooms.insert_created(room);

      let ack_id = AckId::new();
      let mut entries = Vec::new();
      for peer in &selected {
         let invitation = Packet::RoomMembership {
            room: info.clone(),
            ack_id,
         };
         self.send(&invitation, peer.addr).await;
         entries.push((invitation, peer.addr));
      }
      self.acks.insert_unicast(ack_id, entries);
      self.start_timer(ack_id);
      Ok(name)
   }

   async fn send_text(&mut self, text: String) {
      let Some(room_id) = self.displayed_room else {
         self
            .notify(Notification::Error(
               "enter a room first ('join <room name>')".to_owned(),
            ))
            .await;
         return;
      };
      let self_id = self.self_peer.id;
      let ack_id = AckId::new();
      let Some(room) = self.rooms.get_mut(room_id) else {
         self.displayed_room = None;
         return;
      };

      // The local append comes first, then the snapshot taken right
      // after bumping our own coordinate rides inside the message.
      room.append_local(self_id, text.clone());
      room.clock.increment(self_id);
      let message = TextMessage {
         room_id,
         author: self_id,
         text,
         clock: room.clock.clone(),
         ack_id,
      };
      let group = room.group;
      let pending: HashSet<PeerId> = room.members_except(self_id).into_iter().collect();

      let packet = Packet::RoomText(message);
      self.send(&packet, SocketAddr::V4(group)).await;
      if !pending.is_empty() {
         self.acks.insert_multicast(ack_id, packet, group, pending);
         self.start_timer(ack_id);
      }
   }

   /// Deletes a room this node created: locally right away, remotely via
   /// an acknowledged multicast.
   async fn delete_room(&mut self, name: String) {
      let room_id = match self.rooms.by_name(&name) {
         Ok(room) => room.id,
         Err(error) => {
            self.notify(Notification::Error(error.to_string())).await;
            return;
         }
      };
      if self.rooms.origin(room_id) != Some(Origin::Created) {
         self
            .notify(Notification::Error(format!(
               "'{}' was created elsewhere; only its creator can delete it",
               name
            )))
            .await;
         return;
      }

      let room = self.rooms.remove(room_id).expect("room was just looked up");
      self.stop_room_listener(room_id);
      if self.displayed_room == Some(room_id) {
         self.displayed_room = None;
      }
      // Texts still awaiting acks in this room will never complete.
      for stale in self.acks.drop_lists_for(room.group) {
         self.stop_timer(stale);
      }

      let pending: HashSet<PeerId> =
         room.members_except(self.self_peer.id).into_iter().collect();
      let ack_id = AckId::new();
      let packet = Packet::DeleteRoom { room_id, ack_id };
      self.send(&packet, SocketAddr::V4(room.group)).await;
      if !pending.is_empty() {
         self.acks.insert_multicast(ack_id, packet, room.group, pending);
         self.start_timer(ack_id);
      }
      self.notify(Notification::RoomDeleted { name: room.name }).await;
   }

   /// Tells every known peer we are leaving, all under one ack ID, and
   /// arms the deadline that bounds how long we wait for the replies.
   async fn begin_departure(&mut self) {
      info!("leaving the network");
      let ack_id = AckId::new();
      let mut entries = Vec::new();
      for peer in self.peers.iter() {
         let farewell = Packet::LeaveNetwork {
            peer: self.self_peer.clone(),
            ack_id,
         };
         entries.push((farewell, peer.addr));
      }
      for (farewell, to) in &entries {
         self.send(farewell, *to).await;
      }
      if !entries.is_empty() {
         self.acks.insert_unicast(ack_id, entries);
         self.start_timer(ack_id);
         let events = self.events_tx.clone();
         tokio::spawn(async move {
            tokio::time::sleep(SHUTDOWN_DEADLINE).await;
            let _ = events.send(Event::ShutdownDeadline).await;
         });
      }
      self.departure = Some(ack_id);
   }

   //
   // Incoming packets
   //

   async fn handle_packet(&mut self, packet: Packet, from: SocketAddr) {
      match packet {
         Packet::Ping(peer) => {
            if peer.id == self.self_peer.id {
               return;
            }
            self.send(&Packet::Pong(self.self_peer.clone()), peer.addr).await;
            self.learn_peer(peer).await;
         }
         Packet::Pong(peer) => {
            if peer.id == self.self_peer.id {
               return;
            }
            self.learn_peer(peer).await;
         }
         Packet::RoomMembership { room, ack_id } => {
            self.ack_uni(ack_id, from).await;
            self.handle_room_membership(room).await;
         }
         Packet::RoomText(message) => {
            self.ack_multi(message.ack_id, from).await;
            self.handle_room_text(message).await;
         }
         Packet::DeleteRoom { room_id, ack_id } => {
            self.ack_multi(ack_id, from).await;
            self.handle_delete_room(room_id).await;
         }
         Packet::LeaveNetwork { peer, ack_id } => {
            self.ack_uni(ack_id, from).await;
            self.forget_peer(peer).await;
         }
         Packet::AckUni { sender, ack_id } => {
            debug!(%sender, %ack_id, "unicast ack");
            if self.acks.ack_unicast(ack_id, from) == Completion::Done {
               self.stop_timer(ack_id);
            }
         }
         Packet::AckMulti { sender, ack_id } => {
            debug!(%sender, %ack_id, "multicast ack");
            if self.acks.ack_multicast(ack_id, sender) == Completion::Done {
               self.stop_timer(ack_id);
            }
         }
      }
   }

   async fn learn_peer(&mut self, peer: Peer) {
      let nickname = peer.nickname.clone();
      if self.peers.add(peer) {
         info!("discovered {}", nickname);
         self.notify(Notification::PeerDiscovered { nickname }).await;
      }
   }

   async fn handle_room_membership(&mut self, info: RoomInfo) {
      if self.rooms.origin(info.id).is_some() {
         // A retransmitted invitation; the ack already went out again.
         return;
      }
      // The invitation may name peers discovery never showed us.
      for member in &info.members {
         if member.id != self.self_peer.id {
            self.peers.add(member.clone());
         }
      }
      let room = Room::from_info(&info);
      match self.spawn_room_listener(&room) {
         Ok(()) => {
            let name = room.name.clone();
            self.rooms.insert_participating(room);
            self.notify(Notification::AddedToRoom { name }).await;
         }
         Err(error) => {
            warn!("cannot join group {} for room '{}': {}", info.group, info.name, error);
         }
      }
   }

   async fn handle_room_text(&mut self, message: TextMessage) {
      let self_id = self.self_peer.id;
      let Some(room) = self.rooms.get_mut(message.room_id) else {
         // A group collision with another room, or a room already gone.
         debug!(room = %message.room_id, "text for an unknown room");
         return;
      };
      let room_name = room.name.clone();
      let delivered = room.receive(self_id, message);
      for text in delivered {
         let author = self.peer_nickname(text.author);
         self
            .notify(Notification::Text {
               room: room_name.clone(),
               author,
               text: text.text,
            })
            .await;
      }
   }

   async fn handle_delete_room(&mut self, room_id: RoomId) {
      if self.rooms.origin(room_id) != Some(Origin::Participating) {
         // Unknown room, or our own deletion echoed back by loopback.
         return;
      }
      let room = self.rooms.remove(room_id).expect("origin was just checked");
      for stale in self.acks.drop_lists_for(room.group) {
         self.stop_timer(stale);
      }
      self.stop_room_listener(room_id);
      if self.displayed_room == Some(room_id) {
         self.displayed_room = None;
      }
      self.notify(Notification::RoomDeleted { name: room.name }).await;
   }

   /// A peer announced its departure: every room it was in goes away,
   /// waiting lists stop expecting it, and the registry forgets it.
   async fn forget_peer(&mut self, peer: Peer) {
      for room_id in self.rooms.rooms_with_member(peer.id) {
         let room = self.rooms.remove(room_id).expect("id came from the registry");
         for stale in self.acks.drop_lists_for(room.group) {
            self.stop_timer(stale);
         }
         self.stop_room_listener(room_id);
         if self.displayed_room == Some(room_id) {
            self.displayed_room = None;
         }
         self.notify(Notification::RoomDeleted { name: room.name }).await;
      }
      for completed in self.acks.peer_departed(peer.id, peer.addr) {
         self.stop_timer(completed);
      }
      if self.peers.remove(peer.id).is_some() {
         self.notify(Notification::PeerLeft { nickname: peer.nickname }).await;
      }
   }

   fn peer_nickname(&self, id: PeerId) -> String {
      if id == self.self_peer.id {
         return self.self_peer.nickname.clone();
      }
      match self.peers.get(id) {
         Some(peer) => peer.nickname.clone(),
         None => id.to_string(),
      }
   }

   async fn notify(&self, notification: Notification) {
      let _ = self.notifications.send(notification).await;
   }
}

#[cfg(test)]
mod tests {
   use std::sync::Arc;
   use std::time::Duration;

   use tokio::net::UdpSocket;
   use tokio::time::timeout;

   use crate::net::codec;

   use super::*;

   struct Node {
      coordinator: Coordinator,
      notifications: mpsc::Receiver<Notification>,
   }

   async fn node(nickname: &str) -> Node {
      let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
      let addr = socket.local_addr().unwrap();
      let self_peer = Peer {
         id: PeerId::new(),
         nickname: nickname.to_owned(),
         addr,
      };
      let (events_tx, events_rx) = mpsc::channel(64);
      let (notifications_tx, notifications_rx) = mpsc::channel(64);
      let sender = Sender::new(socket, addr.port());
      Node {
         coordinator: Coordinator::new(
            self_peer,
            Ipv4Addr::LOCALHOST,
            9001,
            Duration::from_millis(50),
            sender,
            events_tx,
            events_rx,
            notifications_tx,
         ),
         notifications: notifications_rx,
      }
   }

   async fn remote_peer(nickname: &str) -> (Peer, UdpSocket) {
      let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
      let peer = Peer {
         id: PeerId::new(),
         nickname: nickname.to_owned(),
         addr: socket.local_addr().unwrap(),
      };
      (peer, socket)
   }

   async fn recv_packet(socket: &UdpSocket) -> Packet {
      let mut buffer = [0; 2048];
      let (length, _) = timeout(Duration::from_secs(1), socket.recv_from(&mut buffer))
         .await
         .expect("no packet within a second")
         .unwrap();
      codec::decode(&buffer[..length]).unwrap()
   }

   #[tokio::test]
   async fn ping_registers_the_peer_and_answers_with_pong() {
      let mut node = node("alice").await;
      let (bob, bob_socket) = remote_peer("bob").await;

      node.coordinator.handle_packet(Packet::Ping(bob.clone()), bob.addr).await;

      match recv_packet(&bob_socket).await {
         Packet::Pong(peer) => assert_eq!(peer.id, node.coordinator.self_peer.id),
         other => panic!("expected a pong, got {:?}", other),
      }
      assert!(node.coordinator.peers.get(bob.id).is_some());
      assert_eq!(
         node.notifications.recv().await,
         Some(Notification::PeerDiscovered {
            nickname: "bob".to_owned()
         })
      );

      // A second ping must not announce the peer again.
      node.coordinator.handle_packet(Packet::Ping(bob.clone()), bob.addr).await;
      assert_eq!(node.coordinator.peers.len(), 1);
   }

   #[tokio::test]
   async fn completed_ack_stops_the_retransmission_timer() {
      let mut node = node("alice").await;
      let (bob, _bob_socket) = remote_peer("bob").await;

      let ack_id = AckId::new();
      let farewell = Packet::LeaveNetwork {
         peer: node.coordinator.self_peer.clone(),
         ack_id,
      };
      node.coordinator.acks.insert_unicast(ack_id, vec![(farewell, bob.addr)]);
      node.coordinator.start_timer(ack_id);
      assert!(node.coordinator.timers.contains_key(&ack_id));

      node
         .coordinator
         .handle_packet(
            Packet::AckUni {
               sender: bob.id,
               ack_id,
            },
            bob.addr,
         )
         .await;

      assert!(!node.coordinator.acks.contains(ack_id));
      assert!(!node.coordinator.timers.contains_key(&ack_id));
   }

   #[tokio::test]
   async fn departing_peer_completes_its_waiting_lists() {
      let mut node = node("alice").await;
      let (bob, _bob_socket) = remote_peer("bob").await;
      node.coordinator.peers.add(bob.clone());

      let ack_id = AckId::new();
      let invitation = Packet::AckUni {
         sender: bob.id,
         ack_id,
      };
      node.coordinator.acks.insert_unicast(ack_id, vec![(invitation, bob.addr)]);
      node.coordinator.start_timer(ack_id);

      node
         .coordinator
         .handle_packet(
            Packet::LeaveNetwork {
               peer: bob.clone(),
               ack_id: AckId::new(),
            },
            bob.addr,
         )
         .await;

      assert!(node.coordinator.peers.get(bob.id).is_none());
      assert!(!node.coordinator.acks.contains(ack_id));
      assert!(!node.coordinator.timers.contains_key(&ack_id));
   }
}
