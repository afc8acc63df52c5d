//! User configuration.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use lanchat_protocol::wire::{DEFAULT_MULTICAST_PORT, DEFAULT_UNICAST_PORT};

#[derive(Deserialize, Serialize)]
pub struct NetConfig {
   /// The port every node listens on for unicast and broadcast datagrams.
   pub unicast_port: u16,
   /// The port room multicast groups are bound on.
   pub multicast_port: u16,
   /// How often unacknowledged packets are re-sent.
   pub retransmit_interval_ms: u64,
}

#[derive(Deserialize, Serialize)]
pub struct UserConfig {
   pub nickname: String,
   pub net: NetConfig,
}

impl UserConfig {
   pub fn config_dir() -> PathBuf {
      let project_dirs =
         ProjectDirs::from("", "", "lanchat").expect("cannot determine config directories");
      project_dirs.config_dir().to_owned()
   }

   pub fn path() -> PathBuf {
      Self::config_dir().join("config.toml")
   }

   pub fn load_or_create() -> anyhow::Result<Self> {
      let config_dir = Self::config_dir();
      let config_file = Self::path();
      std::fs::create_dir_all(config_dir)?;
      if !config_file.is_file() {
         let config = Self::default();
         config.save()?;
         Ok(config)
      } else {
         let file = std::fs::read_to_string(&config_file)?;
         let config = match toml::from_str(&file) {
            Ok(config) => config,
            Err(error) => {
               warn!("error while deserializing config file: {}", error);
               warn!("falling back to default config");
               Self::default()
            }
         };
         Ok(config)
      }
   }

   pub fn save(&self) -> anyhow::Result<()> {
      // Assumes that `config_dir` was already created in `load_or_create`.
      let config_file = Self::path();
      std::fs::write(&config_file, toml::to_string(self)?)?;
      Ok(())
   }
}

impl Default for UserConfig {
   fn default() -> Self {
      Self {
         nickname: whoami(),
         net: NetConfig {
            unicast_port: DEFAULT_UNICAST_PORT,
            multicast_port: DEFAULT_MULTICAST_PORT,
            retransmit_interval_ms: 1000,
         },
      }
   }
}

/// A nickname to start out with when the config file does not exist yet.
fn whoami() -> String {
   std::env::var("USER")
      .or_else(|_| std::env::var("USERNAME"))
      .unwrap_or_else(|_| "anon".to_owned())
}
