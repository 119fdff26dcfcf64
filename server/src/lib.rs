// mmo_world_server/server/src/lib.rs

pub mod core;
pub mod entities;
pub mod network;
pub mod operational;
pub mod server;
pub mod world;

pub use crate::core::types::PlayerId;
pub use crate::server::instance::MmoGameServer;
