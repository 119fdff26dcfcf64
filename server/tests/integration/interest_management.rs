// mmo_world_server/server/tests/integration/interest_management.rs

use bytes::Bytes;
use mmo_world_server_core::core::config::AoiConfig;
use mmo_world_server_core::core::constants::{MSG_BROADCAST, MSG_PLAYER_OFFLINE, MSG_SYNC_PLAYERS};
use mmo_world_server_core::core::error::ServerResult;
use mmo_world_server_core::core::types::{PlayerId, Position};
use mmo_world_server_core::entities::player::Player;
use mmo_world_server_core::network::connection::MessageSink;
use mmo_world_server_core::network::protocol::{self, BroadCast, BroadcastData, BroadcastKind, SyncPid, SyncPlayers};
use mmo_world_server_core::world::manager::WorldManager;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(u32, Bytes)>>,
}

impl MessageSink for RecordingSink {
    fn send_msg(&self, msg_id: u32, data: Bytes) -> ServerResult<()> {
        self.sent.lock().push((msg_id, data));
        Ok(())
    }
}

impl RecordingSink {
    fn clear(&self) {
        self.sent.lock().clear();
    }

    fn broadcasts(&self) -> Vec<BroadCast> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| *id == MSG_BROADCAST)
            .map(|(_, data)| protocol::decode(data).expect("broadcast payload"))
            .collect()
    }

    fn departures(&self) -> Vec<PlayerId> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| *id == MSG_PLAYER_OFFLINE)
            .map(|(_, data)| protocol::decode::<SyncPid>(data).expect("offline payload").pid)
            .collect()
    }

    fn snapshot(&self) -> Option<SyncPlayers> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| *id == MSG_SYNC_PLAYERS)
            .map(|(_, data)| protocol::decode(data).expect("snapshot payload"))
    }
}

struct Client {
    player: Arc<Player>,
    sink: Arc<RecordingSink>,
}

fn world() -> WorldManager {
    WorldManager::new(AoiConfig::default()).expect("default AOI config is valid")
}

fn join(world: &WorldManager, x: f32, z: f32) -> Client {
    let sink = Arc::new(RecordingSink::default());
    let player = Arc::new(Player::new(world.generate_pid(), sink.clone(), Position::new(x, 0.0, z, 0.0)));
    player.online(world);
    Client { player, sink }
}

fn assert_grid_matches_registry(world: &WorldManager) {
    let mut in_grids = world.aoi().all_player_ids();
    let total = in_grids.len();
    in_grids.sort_unstable();
    in_grids.dedup();
    assert_eq!(total, in_grids.len(), "a player sits in more than one grid");

    let mut registered = world.player_ids();
    registered.sort_unstable();
    assert_eq!(in_grids, registered);

    for pid in registered {
        let player = world.player_by_pid(pid).expect("registered player");
        let (x, z) = player.position().plane();
        let gid = world.aoi().grid_id_by_pos(x, z);
        assert!(world.aoi().player_ids_by_gid(gid).unwrap().contains(&pid));
    }
}

#[test]
fn mover_entering_a_crowd_is_seen_once_by_each() {
    let world = world();
    let crowd: Vec<Client> = (0..3).map(|i| join(&world, 160.0 + i as f32, 140.0 + i as f32)).collect();
    let stranger = join(&world, 100.0, 80.0);
    let mover = join(&world, 400.0, 390.0);

    for client in crowd.iter().chain([&stranger, &mover]) {
        client.sink.clear();
    }

    let target = Position::new(163.0, 1.0, 143.0, 30.0);
    let delivered = mover.player.update_pos(&world, target);
    // three in the crowd plus the mover itself
    assert_eq!(delivered, 4);

    for client in &crowd {
        let seen: Vec<BroadCast> = client
            .sink
            .broadcasts()
            .into_iter()
            .filter(|b| b.pid == mover.player.pid())
            .collect();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].tp, BroadcastKind::Moved);
        assert_eq!(seen[0].data, BroadcastData::Position(target));
    }
    assert!(stranger.sink.broadcasts().is_empty());
    assert_eq!(mover.sink.broadcasts().len(), 1);
    assert_grid_matches_registry(&world);
}

#[test]
fn newcomer_snapshot_lists_visible_players_only() {
    let world = world();
    let near = join(&world, 160.0, 140.0);
    let far = join(&world, 400.0, 390.0);
    let newcomer = join(&world, 165.0, 150.0);

    let snapshot = newcomer.sink.snapshot().expect("newcomer gets msg 202");
    let pids: HashSet<PlayerId> = snapshot.ps.iter().map(|s| s.pid).collect();
    assert_eq!(pids, HashSet::from([near.player.pid(), newcomer.player.pid()]));

    let spawns: Vec<PlayerId> = near
        .sink
        .broadcasts()
        .into_iter()
        .filter(|b| b.tp == BroadcastKind::Spawn)
        .map(|b| b.pid)
        .collect();
    assert!(spawns.contains(&newcomer.player.pid()));
    assert!(!far.sink.broadcasts().iter().any(|b| b.pid == newcomer.player.pid()));
}

#[test]
fn departure_is_announced_once_to_neighbours() {
    let world = world();
    let leaving = join(&world, 160.0, 140.0);
    let neighbour = join(&world, 161.0, 141.0);
    let far = join(&world, 400.0, 390.0);

    assert_eq!(leaving.player.offline(&world), 1);

    assert_eq!(neighbour.sink.departures(), vec![leaving.player.pid()]);
    assert!(far.sink.departures().is_empty());
    assert!(leaving.sink.departures().is_empty());

    assert!(world.player_by_pid(leaving.player.pid()).is_none());
    assert!(!world.aoi().player_ids_by_pos(160.0, 140.0).contains(&leaving.player.pid()));
    assert!(!world.players_near(161.0, 141.0).iter().any(|p| p.pid() == leaving.player.pid()));

    neighbour.sink.clear();
    assert_eq!(neighbour.player.talk(&world, "anyone?"), 2);
    assert!(leaving.sink.broadcasts().iter().all(|b| b.tp != BroadcastKind::Chat));
    assert_grid_matches_registry(&world);
}

#[test]
fn chat_reaches_every_player_exactly_once() {
    let world = world();
    let clients: Vec<Client> = [(90.0, 80.0), (160.0, 140.0), (400.0, 390.0), (250.0, 250.0)]
        .iter()
        .map(|&(x, z)| join(&world, x, z))
        .collect();
    for client in &clients {
        client.sink.clear();
    }

    let speaker = &clients[2];
    assert_eq!(speaker.player.talk(&world, "hello world"), clients.len());

    for client in &clients {
        let chats = client.sink.broadcasts();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].pid, speaker.player.pid());
        assert_eq!(chats[0].tp, BroadcastKind::Chat);
        assert_eq!(chats[0].data, BroadcastData::Content("hello world".into()));
    }
}

#[test]
fn off_map_positions_clamp_to_edge_grids() {
    let world = world();
    let outside = join(&world, -500.0, 10_000.0);
    let corner = world.aoi().grid_id_by_pos(85.0, 399.0);

    assert_eq!(world.aoi().player_ids_by_gid(corner).unwrap(), vec![outside.player.pid()]);

    outside.player.update_pos(&world, Position::new(f32::NAN, 0.0, f32::INFINITY, 0.0));
    assert_grid_matches_registry(&world);
}

#[test]
fn grid_and_registry_agree_through_churn() {
    let world = world();
    let mut clients: Vec<Client> = (0..40)
        .map(|i| join(&world, 85.0 + (i * 8) as f32, 75.0 + (i * 7) as f32))
        .collect();

    for (i, client) in clients.iter().enumerate() {
        let x = 410.0 - (i * 5) as f32;
        let z = 75.0 + (i * 3) as f32;
        client.player.update_pos(&world, Position::new(x, 0.0, z, 0.0));
    }
    assert_grid_matches_registry(&world);

    for client in clients.drain(..20) {
        client.player.offline(&world);
    }
    assert_eq!(world.player_count(), 20);
    assert_grid_matches_registry(&world);
}
