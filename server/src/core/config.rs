// mmo_world_server/server/src/core/config.rs
use super::constants::*;
use super::error::{ServerError, ServerResult};
use serde::Deserialize;
use std::path::Path;

/// Rectangular world region and how many cells it is cut into along each axis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    pub min_x: i32,
    pub max_x: i32,
    pub cnt_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub cnt_y: i32,
}

impl Default for AoiConfig {
    fn default() -> Self {
        AoiConfig {
            min_x: AOI_MIN_X,
            max_x: AOI_MAX_X,
            cnt_x: AOI_CNTS_X,
            min_y: AOI_MIN_Y,
            max_y: AOI_MAX_Y,
            cnt_y: AOI_CNTS_Y,
        }
    }
}

impl AoiConfig {
    pub fn new(min_x: i32, max_x: i32, cnt_x: i32, min_y: i32, max_y: i32, cnt_y: i32) -> Self {
        AoiConfig { min_x, max_x, cnt_x, min_y, max_y, cnt_y }
    }

    /// Cell width in world units. Only meaningful for a validated config.
    pub fn grid_width(&self) -> i32 {
        self.max_x.saturating_sub(self.min_x) / self.cnt_x.max(1)
    }

    pub fn grid_height(&self) -> i32 {
        self.max_y.saturating_sub(self.min_y) / self.cnt_y.max(1)
    }

    /// Number of cells, or `None` if it does not fit in an `i32`.
    pub fn cell_count(&self) -> Option<i32> {
        self.cnt_x.checked_mul(self.cnt_y)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.cnt_x <= 0 || self.cnt_y <= 0 {
            return Err(ServerError::ConfigError(format!(
                "grid counts must be positive (cnt_x={}, cnt_y={})",
                self.cnt_x, self.cnt_y
            )));
        }
        if self.max_x <= self.min_x || self.max_y <= self.min_y {
            return Err(ServerError::ConfigError(format!(
                "empty AOI region x:[{}, {}) y:[{}, {})",
                self.min_x, self.max_x, self.min_y, self.max_y
            )));
        }
        if self.max_x.checked_sub(self.min_x).is_none() || self.max_y.checked_sub(self.min_y).is_none() {
            return Err(ServerError::ConfigError(format!(
                "AOI region x:[{}, {}) y:[{}, {}) is wider than i32",
                self.min_x, self.max_x, self.min_y, self.max_y
            )));
        }
        if self.cell_count().is_none() {
            return Err(ServerError::ConfigError(format!(
                "{}x{} cells overflow the grid id range",
                self.cnt_x, self.cnt_y
            )));
        }
        if self.grid_width() == 0 || self.grid_height() == 0 {
            return Err(ServerError::ConfigError(format!(
                "AOI region too small for {}x{} cells",
                self.cnt_x, self.cnt_y
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub x: f32,
    pub z: f32,
    pub jitter_x: u32,
    pub jitter_z: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig {
            x: SPAWN_X,
            z: SPAWN_Z,
            jitter_x: SPAWN_JITTER_X,
            jitter_z: SPAWN_JITTER_Z,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    pub tcp_port: u16,
    pub max_conn: usize,
    pub max_packet_size: usize,
    /// Frames buffered per connection before sends start failing. 0 = unbounded.
    pub outbound_queue_len: usize,
    pub aoi: AoiConfig,
    pub spawn: SpawnConfig,
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            name: DEFAULT_SERVER_NAME.to_string(),
            host: DEFAULT_HOST.to_string(),
            tcp_port: DEFAULT_TCP_PORT,
            max_conn: DEFAULT_MAX_CONN,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            outbound_queue_len: DEFAULT_OUTBOUND_QUEUE_LEN,
            aoi: AoiConfig::default(),
            spawn: SpawnConfig::default(),
            metrics_port: None,
        }
    }
}

impl ServerConfig {
    /// Loads a config file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::from_json_str(&raw)?
        } else {
            Self::from_yaml_str(&raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> ServerResult<Self> {
        serde_yaml::from_str(raw).map_err(|e| ServerError::ConfigError(e.to_string()))
    }

    pub fn from_json_str(raw: &str) -> ServerResult<Self> {
        serde_json::from_str(raw).map_err(|e| ServerError::ConfigError(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        self.aoi.validate()?;
        if self.max_conn == 0 {
            return Err(ServerError::ConfigError("max_conn must be at least 1".into()));
        }
        if self.max_packet_size == 0 {
            return Err(ServerError::ConfigError("max_packet_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }
}
