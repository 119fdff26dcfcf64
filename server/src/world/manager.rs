// mmo_world_server/server/src/world/manager.rs
use crate::core::config::AoiConfig;
use crate::core::error::ServerResult;
use crate::core::types::PlayerId;
use crate::entities::player::Player;
use crate::world::aoi::AoiManager;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Authoritative set of online players plus the AOI grid they live in.
pub struct WorldManager {
    aoi: AoiManager,
    players: RwLock<HashMap<PlayerId, Arc<Player>>>,
    next_pid: AtomicI32,
}

impl WorldManager {
    pub fn new(aoi_config: AoiConfig) -> ServerResult<Self> {
        Ok(WorldManager {
            aoi: AoiManager::new(aoi_config)?,
            players: RwLock::new(HashMap::new()),
            next_pid: AtomicI32::new(1),
        })
    }

    pub fn aoi(&self) -> &AoiManager {
        &self.aoi
    }

    /// Hands out player ids 1, 2, 3, ... Never reused within a process.
    pub fn generate_pid(&self) -> PlayerId {
        self.next_pid.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers the player and places it in the grid under one write lock,
    /// so lookups and spatial queries agree once this returns.
    pub fn add_player(&self, player: Arc<Player>) {
        let pid = player.pid();
        let (x, z) = player.position().plane();

        let mut players = self.players.write();
        if let Some(previous) = players.insert(pid, player) {
            warn!("Player {} registered twice; replacing previous entry", pid);
            let (old_x, old_z) = previous.position().plane();
            self.aoi.remove_from_grid_by_pos(pid, old_x, old_z);
        }
        self.aoi.add_to_grid_by_pos(pid, x, z);
        debug!("Player {} added to world at ({:.1}, {:.1}); {} online", pid, x, z, players.len());
    }

    /// Removes the player from its last known cell and from the registry.
    /// Unknown ids are ignored.
    pub fn remove_player(&self, pid: PlayerId) -> Option<Arc<Player>> {
        let mut players = self.players.write();
        let removed = players.remove(&pid)?;
        let (x, z) = removed.position().plane();
        self.aoi.remove_from_grid_by_pos(pid, x, z);
        debug!("Player {} removed from world; {} online", pid, players.len());
        Some(removed)
    }

    pub fn player_by_pid(&self, pid: PlayerId) -> Option<Arc<Player>> {
        self.players.read().get(&pid).cloned()
    }

    pub fn all_players(&self) -> Vec<Arc<Player>> {
        self.players.read().values().cloned().collect()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.read().keys().copied().collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    /// Players registered in the 3x3 neighbourhood of `(x, z)`. Ids that are
    /// in a cell but already gone from the registry are skipped.
    pub fn players_near(&self, x: f32, z: f32) -> Vec<Arc<Player>> {
        let pids = self.aoi.player_ids_by_pos(x, z);
        let players = self.players.read();
        pids.iter()
            .filter_map(|pid| players.get(pid).cloned())
            .collect()
    }
}
