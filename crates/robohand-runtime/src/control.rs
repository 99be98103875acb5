//! Control server, client and wire framing.

#![allow(missing_docs)]

mod client;
mod framing;
mod server;

pub use client::{ClientConfig, ControlClient};
pub use framing::{FrameBuffer, Framing, MAX_FRAME_BYTES};
pub use server::{ControlServer, ServerConfig, ServerHandle};
