// mmo_world_server/server/src/entities/mod.rs
pub mod player;
