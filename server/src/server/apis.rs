// mmo_world_server/server/src/server/apis.rs
use crate::core::constants::PROPERTY_PID;
use crate::core::types::{PlayerId, Position};
use crate::entities::player::Player;
use crate::network::protocol::{self, Talk};
use crate::network::router::{MessageHandler, Request};
use crate::world::manager::WorldManager;
use metrics::counter;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decodes the payload and resolves the sending player. Every failure is
/// logged and counted; the request is then dropped.
fn resolve<T: DeserializeOwned>(world: &WorldManager, request: &Request, api: &str) -> Option<(Arc<Player>, T)> {
    let conn_id = request.conn.conn_id();

    let payload = match protocol::decode::<T>(request.data()) {
        Ok(payload) => payload,
        Err(e) => {
            counter!("world_decode_errors_total").increment(1);
            warn!("[conn {}]: {}: {}", conn_id, api, e);
            return None;
        }
    };

    let pid = match request.conn.get_property::<PlayerId>(PROPERTY_PID) {
        Some(pid) => pid,
        None => {
            counter!("world_dropped_requests_total").increment(1);
            warn!("[conn {}]: {}: no player bound to connection", conn_id, api);
            return None;
        }
    };

    match world.player_by_pid(pid) {
        Some(player) => Some((player, payload)),
        None => {
            counter!("world_dropped_requests_total").increment(1);
            warn!("[conn {}]: {}: player {} is not online", conn_id, api, pid);
            None
        }
    }
}

/// Inbound world chat (msg 2).
pub struct WorldChatApi {
    world: Arc<WorldManager>,
}

impl WorldChatApi {
    pub fn new(world: Arc<WorldManager>) -> Self {
        WorldChatApi { world }
    }
}

impl MessageHandler for WorldChatApi {
    fn handle(&self, request: &Request) {
        if let Some((player, talk)) = resolve::<Talk>(&self.world, request, "chat") {
            debug!("Player {} says: {}", player.pid(), talk.content);
            player.talk(&self.world, &talk.content);
        }
    }
}

/// Inbound position update (msg 3).
pub struct MoveApi {
    world: Arc<WorldManager>,
}

impl MoveApi {
    pub fn new(world: Arc<WorldManager>) -> Self {
        MoveApi { world }
    }
}

impl MessageHandler for MoveApi {
    fn handle(&self, request: &Request) {
        if let Some((player, position)) = resolve::<Position>(&self.world, request, "move") {
            debug!(
                "Player {} move ({:.2}, {:.2}, {:.2}, {:.2})",
                player.pid(),
                position.x,
                position.y,
                position.z,
                position.v
            );
            player.update_pos(&self.world, position);
        }
    }
}
