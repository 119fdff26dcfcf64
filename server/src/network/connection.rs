// mmo_world_server/server/src/network/connection.rs
use crate::core::error::{ServerError, ServerResult};
use crate::core::types::ConnectionId;
use crate::network::codec::pack;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Outbound half of a client connection as seen by game code.
pub trait MessageSink: Send + Sync {
    /// Queues one message for delivery. Never blocks; a full or closed
    /// connection is reported as an error.
    fn send_msg(&self, msg_id: u32, data: Bytes) -> ServerResult<()>;
}

enum OutboundSender {
    Bounded(mpsc::Sender<Bytes>),
    Unbounded(mpsc::UnboundedSender<Bytes>),
}

pub enum OutboundReceiver {
    Bounded(mpsc::Receiver<Bytes>),
    Unbounded(mpsc::UnboundedReceiver<Bytes>),
}

impl OutboundReceiver {
    /// Next packed frame, or `None` once the connection is closed and drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        match self {
            OutboundReceiver::Bounded(rx) => rx.recv().await,
            OutboundReceiver::Unbounded(rx) => rx.recv().await,
        }
    }
}

pub struct Connection {
    conn_id: ConnectionId,
    remote_addr: SocketAddr,
    outbound: Mutex<Option<OutboundSender>>,
    closed: AtomicBool,
    close_signal: Notify,
    properties: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Connection {
    /// Creates a connection and the receiving end its writer task drains.
    /// `queue_len == 0` selects an unbounded outbound queue.
    pub fn new(conn_id: ConnectionId, remote_addr: SocketAddr, queue_len: usize) -> (Arc<Self>, OutboundReceiver) {
        let (sender, receiver) = if queue_len == 0 {
            let (tx, rx) = mpsc::unbounded_channel();
            (OutboundSender::Unbounded(tx), OutboundReceiver::Unbounded(rx))
        } else {
            let (tx, rx) = mpsc::channel(queue_len);
            (OutboundSender::Bounded(tx), OutboundReceiver::Bounded(rx))
        };

        let conn = Arc::new(Connection {
            conn_id,
            remote_addr,
            outbound: Mutex::new(Some(sender)),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
            properties: RwLock::new(HashMap::new()),
        });
        (conn, receiver)
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops accepting outbound messages and wakes anyone waiting in
    /// [`Connection::closed`]. Frames already queued are still flushed by the
    /// writer. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.outbound.lock().take();
        self.close_signal.notify_waiters();
        debug!("[conn {}]: closed", self.conn_id);
        true
    }

    /// Resolves once the connection is closed.
    pub async fn closed(&self) {
        // registered before the flag check so a concurrent close is not missed
        let notified = self.close_signal.notified();
        if self.is_closed() {
            return;
        }
        notified.await;
    }

    pub fn set_property<T: Any + Send + Sync>(&self, key: &str, value: T) {
        self.properties.write().insert(key.to_string(), Arc::new(value));
    }

    pub fn get_property<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        self.properties
            .read()
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub fn remove_property(&self, key: &str) {
        self.properties.write().remove(key);
    }
}

impl MessageSink for Connection {
    fn send_msg(&self, msg_id: u32, data: Bytes) -> ServerResult<()> {
        let frame = pack(msg_id, &data);
        let outbound = self.outbound.lock();
        match outbound.as_ref() {
            Some(OutboundSender::Bounded(tx)) => tx.try_send(frame).map_err(|e| match e {
                TrySendError::Full(_) => ServerError::NetworkError(format!(
                    "outbound queue full for connection {}",
                    self.conn_id
                )),
                TrySendError::Closed(_) => ServerError::ConnectionClosed(self.conn_id),
            }),
            Some(OutboundSender::Unbounded(tx)) => {
                tx.send(frame).map_err(|_| ServerError::ConnectionClosed(self.conn_id))
            }
            None => Err(ServerError::ConnectionClosed(self.conn_id)),
        }
    }
}

/// Live connections, capped at `max_conn`.
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Arc<Connection>>,
    max_conn: usize,
}

impl ConnectionManager {
    pub fn new(max_conn: usize) -> Self {
        ConnectionManager {
            connections: DashMap::new(),
            max_conn,
        }
    }

    pub fn is_full(&self) -> bool {
        self.connections.len() >= self.max_conn
    }

    pub fn add(&self, conn: Arc<Connection>) {
        self.connections.insert(conn.conn_id(), conn);
        debug!("Connection added; {} live", self.connections.len());
    }

    pub fn remove(&self, conn_id: ConnectionId) -> Option<Arc<Connection>> {
        let removed = self.connections.remove(&conn_id).map(|(_, conn)| conn);
        debug!("Connection {} removed; {} live", conn_id, self.connections.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn clear_all(&self) {
        let count = self.connections.len();
        for entry in self.connections.iter() {
            entry.value().close();
        }
        self.connections.clear();
        info!("Closed {} connections", count);
    }
}
