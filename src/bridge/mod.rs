// Command bridge: lets an external controller drive the host over a
// loopback socket, with every command executed on the host main thread.

pub mod client;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod scheduler;
pub mod server;

pub use client::BridgeClient;
pub use dispatch::{BridgeCommand, CommandDispatcher};
pub use error::{BridgeError, DecodeError};
pub use protocol::{Command, ErrorKind, Response, Status};
pub use scheduler::MainThreadScheduler;
pub use server::BridgeServer;
