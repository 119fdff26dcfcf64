// mmo_world_server/server/src/core/types.rs
use serde::{Deserialize, Serialize};

pub type PlayerId = i32;
pub type GridId = usize;
pub type ConnectionId = u32;

/// World-space position. `x`/`z` are the horizontal plane used for AOI,
/// `y` is height and `v` the facing angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub v: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32, v: f32) -> Self {
        Position { x, y, z, v }
    }

    /// Horizontal coordinates as seen by the AOI grid.
    pub fn plane(&self) -> (f32, f32) {
        (self.x, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Connecting,
    Active,
    Disconnected,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}
