use clap::Parser;

/// Serverless group chat for the local network.
#[derive(Parser)]
#[command(version)]
pub struct Options {
   /// The nickname to announce to other peers (overrides the config file).
   #[clap(long)]
   pub nickname: Option<String>,

   /// The port used for unicast and broadcast traffic. Every peer on the
   /// network must use the same one.
   #[clap(long)]
   pub unicast_port: Option<u16>,

   /// The port room multicast groups use. Every peer on the network must
   /// use the same one.
   #[clap(long)]
   pub multicast_port: Option<u16>,
}
