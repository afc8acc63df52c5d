//! Wire-level types shared by every lanchat node.
//!
//! This crate is pure data: ids, the peer and room records carried inside
//! packets, the packet enum itself, and the vector clock that rides along
//! with room texts. Sockets, timers and state live in the `lanchat` binary.

pub mod clock;
pub mod wire;
