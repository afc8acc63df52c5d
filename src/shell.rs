//! The interactive shell.
//!
//! A deliberately thin layer: it turns typed lines into [`Command`]s and
//! prints [`Notification`]s. Everything it knows about the node fits in
//! the two channels it holds.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::coordinator::{Command, Event, Notification};

const HELP: &str = "\
commands:
  discover                     look for peers on the subnet
  list peers                   show discovered peers
  list rooms                   show the rooms you are in
  create <name> <numbers...>   start a room with the numbered peers
  join <room name>             chat in a room you are a member of
  send <text>                  say something in the current room
  leave <room name>            stop chatting in the room
  delete <room name>           delete a room you created
  quit                         announce departure and exit";

/// Reads stdin until `quit` (or end of input) and prints notifications as
/// they come, then returns.
pub async fn run(events: mpsc::Sender<Event>, mut notifications: mpsc::Receiver<Notification>) {
   let printer = tokio::spawn(async move {
      while let Some(notification) = notifications.recv().await {
         println!("{}", notification);
      }
   });

   let mut lines = BufReader::new(tokio::io::stdin()).lines();
   loop {
      let line = match lines.next_line().await {
         Ok(Some(line)) => line,
         // End of input counts as a quit.
         Ok(None) | Err(_) => {
            let _ = events.send(Event::Command(Command::Quit)).await;
            break;
         }
      };
      match parse(&line) {
         Some(command) => {
            let quitting = command == Command::Quit;
            if events.send(Event::Command(command)).await.is_err() {
               break;
            }
            if quitting {
               break;
            }
         }
         None => {
            if !line.trim().is_empty() {
               println!("{}", HELP);
            }
         }
      }
   }

   printer.await.ok();
}

/// Parses one typed line. `None` means the line deserves the help text.
fn parse(line: &str) -> Option<Command> {
   let line = line.trim();

   // `send` keeps the rest of the line verbatim, spaces and all.
   if let Some(text) = line.strip_prefix("send ") {
      return Some(Command::SendText {
         text: text.to_owned(),
      });
   }

   let mut words = line.split_whitespace();
   let command = match (words.next()?, words.next()) {
      ("discover", None) => Command::Discover,
      ("list", Some("peers")) => Command::ListPeers,
      ("list", Some("rooms")) => Command::ListRooms,
      ("create", Some(name)) => {
         let mut peer_indices = Vec::new();
         // Both `create x 1 2` and `create x 1,2` are accepted.
         for word in words.flat_map(|word| word.split(',')) {
            if word.is_empty() {
               continue;
            }
            // The listing is numbered from 1.
            let number: usize = word.parse().ok().filter(|&number| number > 0)?;
            peer_indices.push(number - 1);
         }
         return Some(Command::CreateRoom {
            name: name.to_owned(),
            peer_indices,
         });
      }
      ("join", Some(first)) => {
         return Some(Command::EnterRoom {
            name: rest_of(first, words),
         })
      }
      ("leave", Some(first)) => {
         return Some(Command::ExitRoom {
            name: rest_of(first, words),
         })
      }
      ("delete", Some(first)) => {
         return Some(Command::DeleteRoom {
            name: rest_of(first, words),
         })
      }
      ("quit", None) => Command::Quit,
      _ => return None,
   };
   // Stray words after a complete command are a typo worth flagging.
   if words.next().is_some() {
      return None;
   }
   Some(command)
}

/// Glues a multi-word room name back together.
fn rest_of<'a>(first: &str, words: impl Iterator<Item = &'a str>) -> String {
   let mut name = first.to_owned();
   for word in words {
      name.push(' ');
      name.push_str(word);
   }
   name
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn parses_the_whole_surface() {
      assert_eq!(parse("discover"), Some(Command::Discover));
      assert_eq!(parse("list peers"), Some(Command::ListPeers));
      assert_eq!(parse("list rooms"), Some(Command::ListRooms));
      assert_eq!(parse("quit"), Some(Command::Quit));
      assert_eq!(
         parse("create lounge 1 3"),
         Some(Command::CreateRoom {
            name: "lounge".to_owned(),
            peer_indices: vec![0, 2],
         })
      );
      assert_eq!(
         parse("create lounge 1,3"),
         Some(Command::CreateRoom {
            name: "lounge".to_owned(),
            peer_indices: vec![0, 2],
         })
      );
      assert_eq!(
         parse("join games night"),
         Some(Command::EnterRoom {
            name: "games night".to_owned(),
         })
      );
      assert_eq!(
         parse("delete lounge"),
         Some(Command::DeleteRoom {
            name: "lounge".to_owned(),
         })
      );
   }

   #[test]
   fn send_keeps_the_text_verbatim() {
      assert_eq!(
         parse("send hello  there"),
         Some(Command::SendText {
            text: "hello  there".to_owned(),
         })
      );
   }

   #[test]
   fn nonsense_asks_for_help() {
      assert_eq!(parse("sing"), None);
      assert_eq!(parse("create"), None);
      assert_eq!(parse("create lounge zero"), None);
      assert_eq!(parse("create lounge 0"), None);
      assert_eq!(parse("list everything"), None);
      assert_eq!(parse("quit now"), None);
   }
}
