// mmo_world_server/server/src/world/mod.rs
pub mod aoi;
pub mod grid;
pub mod manager;
