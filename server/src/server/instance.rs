// mmo_world_server/server/src/server/instance.rs
use crate::core::config::ServerConfig;
use crate::core::constants::{MSG_MOVE, MSG_TALK, PROPERTY_PID};
use crate::core::error::ServerResult;
use crate::core::types::PlayerId;
use crate::entities::player::Player;
use crate::network::connection::Connection;
use crate::network::router::Router;
use crate::network::server::{ConnectionHooks, TcpServer};
use crate::server::apis::{MoveApi, WorldChatApi};
use crate::world::manager::WorldManager;
use metrics::gauge;
use std::sync::Arc;
use tracing::{info, warn};

/// Game side of the server: owns the world and reacts to connection events.
pub struct MmoGameServer {
    config: Arc<ServerConfig>,
    world: Arc<WorldManager>,
}

impl MmoGameServer {
    pub fn new(config: Arc<ServerConfig>) -> ServerResult<Arc<Self>> {
        info!("Initializing MmoGameServer...");
        let world = Arc::new(WorldManager::new(config.aoi.clone())?);
        let stats = world.aoi().stats();
        info!(
            "World initialized: {} cells of {}x{}",
            stats.total_cells,
            world.aoi().grid_width(),
            world.aoi().grid_height()
        );
        Ok(Arc::new(MmoGameServer { config, world }))
    }

    pub fn world(&self) -> &Arc<WorldManager> {
        &self.world
    }

    pub fn config(&self) -> &Arc<ServerConfig> {
        &self.config
    }

    pub fn build_router(&self) -> Router {
        let mut router = Router::new();
        router.add_route(MSG_TALK, Arc::new(WorldChatApi::new(self.world.clone())));
        router.add_route(MSG_MOVE, Arc::new(MoveApi::new(self.world.clone())));
        router
    }

    /// Binds the TCP listener with this instance wired in as router and hooks.
    pub async fn bind(self: &Arc<Self>) -> ServerResult<Arc<TcpServer>> {
        let router = Arc::new(self.build_router());
        let hooks: Arc<dyn ConnectionHooks> = self.clone();
        TcpServer::bind(self.config.clone(), router, hooks).await
    }
}

impl ConnectionHooks for MmoGameServer {
    fn on_connection_start(&self, conn: &Arc<Connection>) {
        let player = Arc::new(Player::spawn(&self.world, conn.clone(), &self.config.spawn));
        // bind before the player becomes visible so its first move is never orphaned
        conn.set_property(PROPERTY_PID, player.pid());
        player.online(&self.world);
        gauge!("world_players_connected").set(self.world.player_count() as f64);
        info!("=====> Player pid = {} arrived on conn {} ====", player.pid(), conn.conn_id());
    }

    fn on_connection_stop(&self, conn: &Arc<Connection>) {
        let Some(pid) = conn.get_property::<PlayerId>(PROPERTY_PID) else {
            warn!("[conn {}]: closed without a bound player", conn.conn_id());
            return;
        };
        match self.world.player_by_pid(pid) {
            Some(player) => {
                player.offline(&self.world);
                info!("======> Player pid = {} offline... <=======", pid);
            }
            None => warn!("[conn {}]: player {} already gone", conn.conn_id(), pid),
        }
        conn.remove_property(PROPERTY_PID);
        gauge!("world_players_connected").set(self.world.player_count() as f64);
    }
}
