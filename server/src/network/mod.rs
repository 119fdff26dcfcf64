// mmo_world_server/server/src/network/mod.rs
pub mod codec;
pub mod connection;
pub mod protocol;
pub mod router;
pub mod server;
