// mmo_world_server/server/tests/integration/tcp_session.rs

use mmo_world_server_core::core::config::ServerConfig;
use mmo_world_server_core::core::constants::{
    MSG_BROADCAST, MSG_MOVE, MSG_PLAYER_OFFLINE, MSG_SYNC_PID, MSG_SYNC_PLAYERS, MSG_TALK,
};
use mmo_world_server_core::core::types::{PlayerId, Position};
use mmo_world_server_core::network::codec::{self, Message};
use mmo_world_server_core::network::protocol::{
    self, BroadCast, BroadcastData, BroadcastKind, SyncPid, SyncPlayers, Talk,
};
use mmo_world_server_core::network::server::TcpServer;
use mmo_world_server_core::server::instance::MmoGameServer;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.tcp_port = 0;
    config.spawn.jitter_x = 0;
    config.spawn.jitter_z = 0;
    config
}

async fn start_server(config: ServerConfig) -> (Arc<MmoGameServer>, Arc<TcpServer>, SocketAddr) {
    let game = MmoGameServer::new(Arc::new(config)).expect("world");
    let tcp = game.bind().await.expect("bind");
    let addr = tcp.local_addr().expect("local addr");
    tokio::spawn(tcp.clone().run());
    (game, tcp, addr)
}

struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        TestClient {
            stream: TcpStream::connect(addr).await.expect("connect"),
        }
    }

    async fn send<T: Serialize>(&mut self, msg_id: u32, payload: &T) {
        let data = protocol::encode(payload).expect("encode");
        self.stream.write_all(&codec::pack(msg_id, &data)).await.expect("write");
    }

    async fn recv(&mut self) -> Message {
        timeout(READ_TIMEOUT, codec::read_message(&mut self.stream, 4096))
            .await
            .expect("timed out waiting for a frame")
            .expect("read")
            .expect("server closed the stream")
    }

    /// Reads the arrival sequence and returns the assigned id plus the snapshot.
    async fn handshake(&mut self) -> (PlayerId, SyncPlayers) {
        let sync = self.recv().await;
        assert_eq!(sync.id, MSG_SYNC_PID);
        let pid = protocol::decode::<SyncPid>(&sync.data).unwrap().pid;

        for _ in 0..2 {
            let start = self.recv().await;
            assert_eq!(start.id, MSG_BROADCAST);
            let spawn: BroadCast = protocol::decode(&start.data).unwrap();
            assert_eq!(spawn.pid, pid);
            assert_eq!(spawn.tp, BroadcastKind::Spawn);
        }

        let players = self.recv().await;
        assert_eq!(players.id, MSG_SYNC_PLAYERS);
        (pid, protocol::decode(&players.data).unwrap())
    }

    async fn recv_broadcast(&mut self) -> BroadCast {
        let msg = self.recv().await;
        assert_eq!(msg.id, MSG_BROADCAST);
        protocol::decode(&msg.data).unwrap()
    }
}

async fn wait_for_players(game: &MmoGameServer, count: usize) {
    timeout(READ_TIMEOUT, async {
        while game.world().player_count() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("player count never settled");
}

#[tokio::test]
async fn two_players_see_each_other_move_chat_and_leave() {
    let (game, tcp, addr) = start_server(test_config()).await;

    let mut alice = TestClient::connect(addr).await;
    let (alice_pid, snapshot) = alice.handshake().await;
    assert_eq!(snapshot.ps.len(), 1);
    assert_eq!(snapshot.ps[0].p.plane(), (160.0, 140.0));

    let mut bob = TestClient::connect(addr).await;
    let (bob_pid, snapshot) = bob.handshake().await;
    assert_ne!(alice_pid, bob_pid);
    let mut visible: Vec<PlayerId> = snapshot.ps.iter().map(|s| s.pid).collect();
    visible.sort_unstable();
    let mut expected = vec![alice_pid, bob_pid];
    expected.sort_unstable();
    assert_eq!(visible, expected);

    let arrival = alice.recv_broadcast().await;
    assert_eq!((arrival.pid, arrival.tp), (bob_pid, BroadcastKind::Spawn));

    let target = Position::new(170.0, 2.0, 150.0, 90.0);
    bob.send(MSG_MOVE, &target).await;
    let moved = alice.recv_broadcast().await;
    assert_eq!(moved.pid, bob_pid);
    assert_eq!(moved.tp, BroadcastKind::Moved);
    assert_eq!(moved.data, BroadcastData::Position(target));
    assert_eq!(bob.recv_broadcast().await.tp, BroadcastKind::Moved);

    bob.send(MSG_TALK, &Talk { content: "hi alice".into() }).await;
    for client in [&mut alice, &mut bob] {
        let chat = client.recv_broadcast().await;
        assert_eq!(chat.tp, BroadcastKind::Chat);
        assert_eq!(chat.data, BroadcastData::Content("hi alice".into()));
    }

    drop(bob);
    let departure = alice.recv().await;
    assert_eq!(departure.id, MSG_PLAYER_OFFLINE);
    assert_eq!(protocol::decode::<SyncPid>(&departure.data).unwrap().pid, bob_pid);

    wait_for_players(&game, 1).await;
    assert!(game.world().player_by_pid(bob_pid).is_none());
    assert_eq!(game.world().aoi().all_player_ids(), vec![alice_pid]);

    tcp.shutdown();
}

#[tokio::test]
async fn garbage_payload_and_unknown_ids_keep_the_session_alive() {
    let (game, tcp, addr) = start_server(test_config()).await;

    let mut client = TestClient::connect(addr).await;
    let (pid, _) = client.handshake().await;

    client.stream.write_all(&codec::pack(MSG_MOVE, &[1, 2, 3])).await.unwrap();
    client.stream.write_all(&codec::pack(77, &[])).await.unwrap();
    client.send(MSG_TALK, &Talk { content: "still here".into() }).await;

    let chat = client.recv_broadcast().await;
    assert_eq!(chat.pid, pid);
    assert_eq!(chat.data, BroadcastData::Content("still here".into()));
    assert_eq!(game.world().player_by_pid(pid).unwrap().position().plane(), (160.0, 140.0));

    tcp.shutdown();
}

#[tokio::test]
async fn oversized_frame_ends_the_session() {
    let mut config = test_config();
    config.max_packet_size = 64;
    let (game, tcp, addr) = start_server(config).await;

    let mut client = TestClient::connect(addr).await;
    client.handshake().await;
    wait_for_players(&game, 1).await;

    let huge = Talk { content: "x".repeat(512) };
    client.send(MSG_TALK, &huge).await;

    wait_for_players(&game, 0).await;
    assert!(game.world().aoi().all_player_ids().is_empty());

    tcp.shutdown();
}

#[tokio::test]
async fn connections_beyond_the_limit_are_refused() {
    let mut config = test_config();
    config.max_conn = 1;
    let (game, tcp, addr) = start_server(config).await;

    let mut first = TestClient::connect(addr).await;
    first.handshake().await;

    let mut second = TestClient::connect(addr).await;
    let closed = timeout(READ_TIMEOUT, codec::read_message(&mut second.stream, 4096))
        .await
        .expect("refused socket should close promptly");
    assert!(matches!(closed, Ok(None) | Err(_)));
    assert_eq!(game.world().player_count(), 1);

    tcp.shutdown();
}

#[tokio::test]
async fn shutdown_takes_silent_sessions_offline() {
    let (game, tcp, addr) = start_server(test_config()).await;

    let mut idle = TestClient::connect(addr).await;
    let mut other = TestClient::connect(addr).await;
    idle.handshake().await;
    other.handshake().await;
    wait_for_players(&game, 2).await;

    tcp.shutdown();

    for client in [&mut idle, &mut other] {
        let eof = timeout(READ_TIMEOUT, async {
            loop {
                match codec::read_message(&mut client.stream, 4096).await {
                    Ok(Some(_)) => continue,
                    end => break end,
                }
            }
        })
        .await
        .expect("server never closed the socket");
        assert!(matches!(eof, Ok(None) | Err(_)));
    }

    wait_for_players(&game, 0).await;
    assert!(game.world().aoi().all_player_ids().is_empty());
}
