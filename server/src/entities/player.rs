// mmo_world_server/server/src/entities/player.rs
use crate::core::config::SpawnConfig;
use crate::core::constants::{MSG_BROADCAST, MSG_PLAYER_OFFLINE, MSG_SYNC_PID, MSG_SYNC_PLAYERS};
use crate::core::types::{PlayerId, PlayerStatus, Position};
use crate::network::connection::MessageSink;
use crate::network::protocol::{self, BroadCast, BroadcastKind, PlayerSnapshot, SyncPid, SyncPlayers};
use crate::world::manager::WorldManager;
use bytes::Bytes;
use metrics::counter;
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
struct Motion {
    position: Position,
    status: PlayerStatus,
}

/// One connected participant.
pub struct Player {
    pid: PlayerId,
    conn: Arc<dyn MessageSink>,
    motion: RwLock<Motion>,
}

impl Player {
    pub fn new(pid: PlayerId, conn: Arc<dyn MessageSink>, position: Position) -> Self {
        Player {
            pid,
            conn,
            motion: RwLock::new(Motion {
                position,
                status: PlayerStatus::Connecting,
            }),
        }
    }

    /// New player with an id from the world and a spawn point jittered
    /// around the configured origin.
    pub fn spawn(world: &WorldManager, conn: Arc<dyn MessageSink>, spawn: &SpawnConfig) -> Self {
        let mut rng = rand::thread_rng();
        let jitter_x = if spawn.jitter_x > 0 { rng.gen_range(0..spawn.jitter_x) } else { 0 };
        let jitter_z = if spawn.jitter_z > 0 { rng.gen_range(0..spawn.jitter_z) } else { 0 };
        let position = Position::new(spawn.x + jitter_x as f32, 0.0, spawn.z + jitter_z as f32, 0.0);
        Player::new(world.generate_pid(), conn, position)
    }

    pub fn pid(&self) -> PlayerId {
        self.pid
    }

    pub fn position(&self) -> Position {
        self.motion.read().position
    }

    pub fn status(&self) -> PlayerStatus {
        self.motion.read().status
    }

    pub fn is_active(&self) -> bool {
        self.status() == PlayerStatus::Active
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot { pid: self.pid, p: self.position() }
    }

    /// Encodes and queues one message for this player's client. Failures are
    /// logged and returned; callers broadcasting to many players ignore them.
    pub fn send_msg<T: Serialize>(&self, msg_id: u32, payload: &T) -> bool {
        match protocol::encode(payload) {
            Ok(data) => self.send_raw(msg_id, data),
            Err(e) => {
                error!("[player {}]: failed to encode msg {}: {}", self.pid, msg_id, e);
                false
            }
        }
    }

    fn send_raw(&self, msg_id: u32, data: Bytes) -> bool {
        match self.conn.send_msg(msg_id, data) {
            Ok(()) => true,
            Err(e) => {
                counter!("world_send_failures_total").increment(1);
                warn!("[player {}]: failed to send msg {}: {}", self.pid, msg_id, e);
                false
            }
        }
    }

    /// Sends the same payload to every recipient, encoding it once. Returns how
    /// many recipients accepted it.
    pub fn broadcast_to<T: Serialize>(&self, recipients: &[Arc<Player>], msg_id: u32, payload: &T) -> usize {
        let data = match protocol::encode(payload) {
            Ok(data) => data,
            Err(e) => {
                error!("[player {}]: failed to encode broadcast msg {}: {}", self.pid, msg_id, e);
                return 0;
            }
        };

        let delivered = recipients
            .iter()
            .filter(|recipient| recipient.send_raw(msg_id, data.clone()))
            .count();
        counter!("world_broadcast_messages_total").increment(delivered as u64);
        debug!(
            "[player {}]: msg {} delivered to {}/{} recipients",
            self.pid,
            msg_id,
            delivered,
            recipients.len()
        );
        delivered
    }

    /// Tells the client which id it was given (msg 1).
    pub fn sync_pid(&self) {
        self.send_msg(MSG_SYNC_PID, &SyncPid { pid: self.pid });
    }

    /// Sends the client its own spawn point (msg 200).
    pub fn broadcast_start_position(&self) {
        let msg = BroadCast::position(self.pid, BroadcastKind::Spawn, self.position());
        self.send_msg(MSG_BROADCAST, &msg);
    }

    /// Runs the arrival sequence: id, spawn point, registration, then the
    /// neighbourhood exchange.
    pub fn online(self: &Arc<Self>, world: &WorldManager) {
        self.motion.write().status = PlayerStatus::Active;
        self.sync_pid();
        self.broadcast_start_position();
        world.add_player(Arc::clone(self));
        self.sync_surrounding(world);
        info!("Player {} arrived at {:?}", self.pid, self.position().plane());
    }

    /// Shows this player to everyone around it (msg 200) and shows everyone
    /// around it to this player (msg 202).
    pub fn sync_surrounding(&self, world: &WorldManager) {
        let players = self.surrounding_players(world);

        let spawn = BroadCast::position(self.pid, BroadcastKind::Spawn, self.position());
        self.broadcast_to(&players, MSG_BROADCAST, &spawn);

        let visible = SyncPlayers {
            ps: players.iter().map(|player| player.snapshot()).collect(),
        };
        self.send_msg(MSG_SYNC_PLAYERS, &visible);
    }

    /// Applies a move and announces it to the neighbourhood of the new
    /// position, the mover included.
    pub fn update_pos(&self, world: &WorldManager, position: Position) -> usize {
        let old = {
            let mut motion = self.motion.write();
            if motion.status != PlayerStatus::Active {
                warn!("[player {}]: move ignored in state {:?}", self.pid, motion.status);
                return 0;
            }
            std::mem::replace(&mut motion.position, position)
        };

        world.aoi().move_by_pos(self.pid, old.plane(), position.plane());

        let msg = BroadCast::position(self.pid, BroadcastKind::Moved, position);
        let players = self.surrounding_players(world);
        self.broadcast_to(&players, MSG_BROADCAST, &msg)
    }

    /// World chat: every online player, position ignored.
    pub fn talk(&self, world: &WorldManager, content: &str) -> usize {
        if !self.is_active() {
            warn!("[player {}]: chat ignored in state {:?}", self.pid, self.status());
            return 0;
        }
        let msg = BroadCast::chat(self.pid, content);
        let players = world.all_players();
        self.broadcast_to(&players, MSG_BROADCAST, &msg)
    }

    pub fn surrounding_players(&self, world: &WorldManager) -> Vec<Arc<Player>> {
        let (x, z) = self.position().plane();
        world.players_near(x, z)
    }

    /// Announces departure (msg 201) around the last known position, then
    /// leaves the grid and the registry. Terminal.
    pub fn offline(&self, world: &WorldManager) -> usize {
        {
            let mut motion = self.motion.write();
            if motion.status == PlayerStatus::Disconnected {
                return 0;
            }
            motion.status = PlayerStatus::Disconnected;
        }

        let neighbours: Vec<Arc<Player>> = self
            .surrounding_players(world)
            .into_iter()
            .filter(|player| player.pid != self.pid)
            .collect();
        let notified = self.broadcast_to(&neighbours, MSG_PLAYER_OFFLINE, &SyncPid { pid: self.pid });

        world.remove_player(self.pid);
        info!("Player {} offline; notified {} neighbours", self.pid, notified);
        notified
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let motion = *self.motion.read();
        f.debug_struct("Player")
            .field("pid", &self.pid)
            .field("position", &motion.position)
            .field("status", &motion.status)
            .finish()
    }
}
