// mmo_world_server/server/src/network/router.rs
use crate::network::codec::Message;
use crate::network::connection::Connection;
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// An inbound message together with the connection it arrived on.
pub struct Request {
    pub conn: Arc<Connection>,
    pub msg: Message,
}

impl Request {
    pub fn new(conn: Arc<Connection>, msg: Message) -> Self {
        Request { conn, msg }
    }

    pub fn msg_id(&self) -> u32 {
        self.msg.id
    }

    pub fn data(&self) -> &[u8] {
        &self.msg.data
    }
}

pub trait MessageHandler: Send + Sync {
    fn handle(&self, request: &Request);
}

/// Maps message ids to their handlers.
#[derive(Default)]
pub struct Router {
    handlers: HashMap<u32, Arc<dyn MessageHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, msg_id: u32, handler: Arc<dyn MessageHandler>) {
        if self.handlers.insert(msg_id, handler).is_some() {
            warn!("Route for msg {} replaced", msg_id);
        }
    }

    pub fn has_route(&self, msg_id: u32) -> bool {
        self.handlers.contains_key(&msg_id)
    }

    /// Runs the handler for the request. Returns `false` when no route matches.
    pub fn dispatch(&self, request: &Request) -> bool {
        match self.handlers.get(&request.msg_id()) {
            Some(handler) => {
                trace!(
                    "[conn {}]: dispatching msg {} ({} bytes)",
                    request.conn.conn_id(),
                    request.msg_id(),
                    request.data().len()
                );
                handler.handle(request);
                true
            }
            None => {
                counter!("world_dropped_requests_total").increment(1);
                warn!(
                    "[conn {}]: no route for msg {}, dropped",
                    request.conn.conn_id(),
                    request.msg_id()
                );
                false
            }
        }
    }
}
