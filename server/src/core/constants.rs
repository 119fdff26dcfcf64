// mmo_world_server/server/src/core/constants.rs

// Server defaults
pub const DEFAULT_SERVER_NAME: &str = "mmo_world_server";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_TCP_PORT: u16 = 8999;
pub const DEFAULT_MAX_CONN: usize = 3000;
pub const DEFAULT_MAX_PACKET_SIZE: usize = 4096;
pub const DEFAULT_OUTBOUND_QUEUE_LEN: usize = 1024;

// AOI region. 325 / 10 and 325 / 20 do not divide evenly: cells are 32 x 16.
pub const AOI_MIN_X: i32 = 85;
pub const AOI_MAX_X: i32 = 410;
pub const AOI_CNTS_X: i32 = 10;
pub const AOI_MIN_Y: i32 = 75;
pub const AOI_MAX_Y: i32 = 400;
pub const AOI_CNTS_Y: i32 = 20;
pub const MAX_NEIGHBOR_GRIDS: usize = 9;

// Spawn point, jittered per player so new arrivals do not stack
pub const SPAWN_X: f32 = 160.0;
pub const SPAWN_Z: f32 = 140.0;
pub const SPAWN_JITTER_X: u32 = 10;
pub const SPAWN_JITTER_Z: u32 = 20;

// Wire framing: [data_len: u32 LE][msg_id: u32 LE]
pub const FRAME_HEAD_LEN: usize = 8;

// Outbound message ids
pub const MSG_SYNC_PID: u32 = 1;
pub const MSG_BROADCAST: u32 = 200;
pub const MSG_PLAYER_OFFLINE: u32 = 201;
pub const MSG_SYNC_PLAYERS: u32 = 202;

// Inbound message ids
pub const MSG_TALK: u32 = 2;
pub const MSG_MOVE: u32 = 3;

// Connection property holding the assigned player id
pub const PROPERTY_PID: &str = "pid";
