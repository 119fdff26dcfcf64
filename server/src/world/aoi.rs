// mmo_world_server/server/src/world/aoi.rs
use crate::core::config::AoiConfig;
use crate::core::constants::MAX_NEIGHBOR_GRIDS;
use crate::core::error::{ServerError, ServerResult};
use crate::core::types::{GridBounds, GridId, PlayerId};
use crate::world::grid::Grid;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::fmt;
use tracing::{debug, trace, warn};

pub type NeighborGrids = SmallVec<[GridId; MAX_NEIGHBOR_GRIDS]>;

/// Fixed grid of AOI cells over one rectangular region.
///
/// Cells are locked individually so that readers fanning out over a 3x3
/// neighbourhood only contend with writers touching the same cells.
pub struct AoiManager {
    config: AoiConfig,
    grid_width: i32,
    grid_height: i32,
    grids: Vec<RwLock<Grid>>,
}

impl AoiManager {
    pub fn new(config: AoiConfig) -> ServerResult<Self> {
        config.validate()?;

        let grid_width = config.grid_width();
        let grid_height = config.grid_height();
        let total = config
            .cell_count()
            .ok_or_else(|| ServerError::ConfigError("AOI cell count overflows".into()))? as usize;

        let mut grids = Vec::with_capacity(total);
        for row in 0..config.cnt_y {
            for col in 0..config.cnt_x {
                let gid = (row * config.cnt_x + col) as GridId;
                grids.push(RwLock::new(Grid::new(
                    gid,
                    config.min_x + col * grid_width,
                    config.min_x + (col + 1) * grid_width,
                    config.min_y + row * grid_height,
                    config.min_y + (row + 1) * grid_height,
                )));
            }
        }

        debug!(
            "AOI initialized: {}x{} grid, {} total cells, cell size: {}x{}",
            config.cnt_x, config.cnt_y, total, grid_width, grid_height
        );

        Ok(AoiManager {
            config,
            grid_width,
            grid_height,
            grids,
        })
    }

    pub fn config(&self) -> &AoiConfig {
        &self.config
    }

    pub fn grid_width(&self) -> i32 {
        self.grid_width
    }

    pub fn grid_height(&self) -> i32 {
        self.grid_height
    }

    pub fn grid_count(&self) -> usize {
        self.grids.len()
    }

    /// Maps a horizontal position to its cell. Positions outside the region
    /// (and the sliver left over by integer cell sizes) clamp to the nearest
    /// edge cell.
    #[inline]
    pub fn grid_id_by_pos(&self, x: f32, y: f32) -> GridId {
        let col = clamp_index((x - self.config.min_x as f32) / self.grid_width as f32, self.config.cnt_x);
        let row = clamp_index((y - self.config.min_y as f32) / self.grid_height as f32, self.config.cnt_y);
        (row * self.config.cnt_x as i64 + col) as GridId
    }

    /// The cell itself plus its row neighbours, then the column neighbours of
    /// each of those. Edges are cut off, never wrapped.
    pub fn surround_grids_by_gid(&self, gid: GridId) -> Option<NeighborGrids> {
        if gid >= self.grids.len() {
            return None;
        }

        let cnt_x = self.config.cnt_x as usize;
        let cnt_y = self.config.cnt_y as usize;

        let mut grids = NeighborGrids::new();
        grids.push(gid);

        let col = gid % cnt_x;
        if col > 0 {
            grids.push(gid - 1);
        }
        if col < cnt_x - 1 {
            grids.push(gid + 1);
        }

        let row_len = grids.len();
        for i in 0..row_len {
            let current = grids[i];
            let row = current / cnt_x;
            if row > 0 {
                grids.push(current - cnt_x);
            }
            if row < cnt_y - 1 {
                grids.push(current + cnt_x);
            }
        }

        Some(grids)
    }

    pub fn player_ids_by_gid(&self, gid: GridId) -> Option<Vec<PlayerId>> {
        self.grids.get(gid).map(|grid| grid.read().player_ids())
    }

    /// Everyone in the 3x3 neighbourhood around a position.
    pub fn player_ids_by_pos(&self, x: f32, y: f32) -> Vec<PlayerId> {
        let gid = self.grid_id_by_pos(x, y);
        let mut player_ids = Vec::new();
        if let Some(neighbors) = self.surround_grids_by_gid(gid) {
            for neighbor in neighbors {
                if let Some(grid) = self.grids.get(neighbor) {
                    player_ids.extend(grid.read().player_ids());
                }
            }
        }
        trace!("AOI query at ({:.1}, {:.1}) -> grid {}: {} players", x, y, gid, player_ids.len());
        player_ids
    }

    pub fn add_pid_to_grid(&self, player_id: PlayerId, gid: GridId) -> bool {
        match self.grids.get(gid) {
            Some(grid) => {
                grid.write().add(player_id);
                true
            }
            None => {
                warn!("Cannot add player {} to unknown grid {}", player_id, gid);
                false
            }
        }
    }

    pub fn remove_pid_from_grid(&self, player_id: PlayerId, gid: GridId) -> bool {
        match self.grids.get(gid) {
            Some(grid) => {
                grid.write().remove(player_id);
                true
            }
            None => {
                warn!("Cannot remove player {} from unknown grid {}", player_id, gid);
                false
            }
        }
    }

    pub fn add_to_grid_by_pos(&self, player_id: PlayerId, x: f32, y: f32) {
        let gid = self.grid_id_by_pos(x, y);
        self.add_pid_to_grid(player_id, gid);
    }

    pub fn remove_from_grid_by_pos(&self, player_id: PlayerId, x: f32, y: f32) {
        let gid = self.grid_id_by_pos(x, y);
        self.remove_pid_from_grid(player_id, gid);
    }

    /// Moves an occupant between cells. The old cell is released before the
    /// new one is taken, so the occupant is never in two cells at once.
    /// Returns whether the cell changed.
    pub fn move_by_pos(&self, player_id: PlayerId, old: (f32, f32), new: (f32, f32)) -> bool {
        let old_gid = self.grid_id_by_pos(old.0, old.1);
        let new_gid = self.grid_id_by_pos(new.0, new.1);
        if old_gid == new_gid {
            return false;
        }

        self.remove_pid_from_grid(player_id, old_gid);
        self.add_pid_to_grid(player_id, new_gid);
        trace!("Player {} moved from grid {} to grid {}", player_id, old_gid, new_gid);
        true
    }

    pub fn grid_bounds(&self, gid: GridId) -> Option<GridBounds> {
        self.grids.get(gid).map(|grid| grid.read().bounds)
    }

    /// Every occupant of every cell, duplicates included.
    pub fn all_player_ids(&self) -> Vec<PlayerId> {
        let mut player_ids = Vec::new();
        for grid in &self.grids {
            player_ids.extend(grid.read().player_ids());
        }
        player_ids
    }

    pub fn stats(&self) -> AoiStats {
        let mut total_occupants = 0;
        let mut occupied_cells = 0;
        let mut max_occupants_per_cell = 0;

        for grid in &self.grids {
            let count = grid.read().len();
            if count > 0 {
                occupied_cells += 1;
                total_occupants += count;
                max_occupants_per_cell = max_occupants_per_cell.max(count);
            }
        }

        AoiStats {
            total_occupants,
            occupied_cells,
            total_cells: self.grids.len(),
            max_occupants_per_cell,
        }
    }
}

#[inline]
fn clamp_index(scaled: f32, count: i32) -> i64 {
    // NaN casts to 0 and infinities saturate, so the clamp covers them too.
    (scaled.floor() as i64).clamp(0, count as i64 - 1)
}

impl fmt::Display for AoiManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "AOIManager: minX: {}, maxX: {}, cntsX: {}, minY: {}, maxY: {}, cntsY: {}",
            self.config.min_x,
            self.config.max_x,
            self.config.cnt_x,
            self.config.min_y,
            self.config.max_y,
            self.config.cnt_y
        )?;
        for grid in &self.grids {
            writeln!(f, "{}", grid.read())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AoiStats {
    pub total_occupants: usize,
    pub occupied_cells: usize,
    pub total_cells: usize,
    pub max_occupants_per_cell: usize,
}
