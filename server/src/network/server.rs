// mmo_world_server/server/src/network/server.rs
use crate::core::config::ServerConfig;
use crate::core::error::ServerResult;
use crate::core::types::ConnectionId;
use crate::network::codec::read_message;
use crate::network::connection::{Connection, ConnectionManager, OutboundReceiver};
use crate::network::router::{Request, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Connection lifecycle callbacks. Each is invoked exactly once per
/// connection, start before stop.
pub trait ConnectionHooks: Send + Sync {
    fn on_connection_start(&self, conn: &Arc<Connection>);
    fn on_connection_stop(&self, conn: &Arc<Connection>);
}

pub struct TcpServer {
    config: Arc<ServerConfig>,
    listener: TcpListener,
    router: Arc<Router>,
    hooks: Arc<dyn ConnectionHooks>,
    connections: Arc<ConnectionManager>,
    next_conn_id: AtomicU32,
    shutdown: Notify,
}

impl TcpServer {
    pub async fn bind(
        config: Arc<ServerConfig>,
        router: Arc<Router>,
        hooks: Arc<dyn ConnectionHooks>,
    ) -> ServerResult<Arc<Self>> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!("[{}] listening on {}", config.name, listener.local_addr()?);

        Ok(Arc::new(TcpServer {
            connections: Arc::new(ConnectionManager::new(config.max_conn)),
            config,
            listener,
            router,
            hooks,
            next_conn_id: AtomicU32::new(1),
            shutdown: Notify::new(),
        }))
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Stops the accept loop. Live connections are closed by `run` on exit.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Accepts connections until `shutdown` is called.
    pub async fn run(self: Arc<Self>) -> ServerResult<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.accept(stream, addr),
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("[{}] shutting down, closing {} connections", self.config.name, self.connections.len());
                    break;
                }
            }
        }
        self.connections.clear_all();
        Ok(())
    }

    fn accept(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        if self.connections.is_full() {
            warn!("Connection limit {} reached, refusing {}", self.config.max_conn, addr);
            drop(stream);
            return;
        }
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
        }

        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (conn, outbound) = Connection::new(conn_id, addr, self.config.outbound_queue_len);
        let (reader, writer) = stream.into_split();

        self.connections.add(conn.clone());
        info!("[conn {}]: accepted from {}", conn_id, addr);

        tokio::spawn(write_loop(conn_id, writer, outbound));

        let server = Arc::clone(self);
        tokio::spawn(async move {
            server.hooks.on_connection_start(&conn);
            server.read_loop(&conn, reader).await;
            server.hooks.on_connection_stop(&conn);
            conn.close();
            server.connections.remove(conn.conn_id());
            info!("[conn {}]: stopped", conn.conn_id());
        });
    }

    async fn read_loop(&self, conn: &Arc<Connection>, mut reader: OwnedReadHalf) {
        loop {
            let next = tokio::select! {
                next = read_message(&mut reader, self.config.max_packet_size) => next,
                _ = conn.closed() => {
                    debug!("[conn {}]: closed locally, reader stopping", conn.conn_id());
                    break;
                }
            };
            match next {
                Ok(Some(msg)) => {
                    let request = Request::new(Arc::clone(conn), msg);
                    self.router.dispatch(&request);
                }
                Ok(None) => {
                    debug!("[conn {}]: peer closed", conn.conn_id());
                    break;
                }
                Err(e) => {
                    warn!("[conn {}]: read failed: {}", conn.conn_id(), e);
                    break;
                }
            }
        }
    }
}

async fn write_loop(conn_id: ConnectionId, mut writer: OwnedWriteHalf, mut outbound: OutboundReceiver) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            warn!("[conn {}]: write failed, terminating writer: {}", conn_id, e);
            break;
        }
    }
    let _ = writer.shutdown().await;
    debug!("[conn {}]: writer task ended", conn_id);
}
