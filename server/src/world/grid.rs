// mmo_world_server/server/src/world/grid.rs
use crate::core::types::{GridBounds, GridId, PlayerId};
use ahash::AHashSet;
use std::fmt;

/// One AOI cell. Not synchronized; `AoiManager` wraps each grid in its own lock.
#[derive(Debug, Clone)]
pub struct Grid {
    pub gid: GridId,
    pub bounds: GridBounds,
    player_ids: AHashSet<PlayerId>,
}

impl Grid {
    pub fn new(gid: GridId, min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Grid {
            gid,
            bounds: GridBounds { min_x, max_x, min_y, max_y },
            player_ids: AHashSet::new(),
        }
    }

    pub fn add(&mut self, player_id: PlayerId) {
        self.player_ids.insert(player_id);
    }

    pub fn remove(&mut self, player_id: PlayerId) {
        self.player_ids.remove(&player_id);
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.player_ids.contains(&player_id)
    }

    /// Snapshot of the current occupants.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.player_ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.player_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.player_ids.is_empty()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids = self.player_ids();
        ids.sort_unstable();
        write!(
            f,
            "Grid id: {}, minX: {}, maxX: {}, minY: {}, maxY: {}, playerIDs: {:?}",
            self.gid, self.bounds.min_x, self.bounds.max_x, self.bounds.min_y, self.bounds.max_y, ids
        )
    }
}
