//! Connection registry.
//!
//! One map, keyed by [`ConnId`], holding everything the host knows about
//! a live socket: its address, its outbound queue, and the player name
//! it joined as (if any). Keeping it all in a single map means a
//! connection is present in full or not at all — there is no way for the
//! address book and the name book to disagree.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use quizwire_protocol::{Envelope, MessageBody};
use tokio::sync::mpsc;

/// Counter for generating unique connection IDs.
static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for an accepted connection.
///
/// Stable for the life of the socket, unlike the player name (bound only
/// after a successful join) or the remote address (shared when several
/// players sit behind one NAT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl ConnId {
    /// Mints the next process-unique id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What the registry tracks for one live connection.
#[derive(Debug)]
pub(crate) struct Peer {
    pub(crate) addr: SocketAddr,
    /// The host's IP on this connection, used as the envelope sender.
    /// Taken from the accepted socket, not the listener — a listener
    /// bound to 0.0.0.0 has no meaningful address to put on the wire.
    pub(crate) local_ip: String,
    /// Queue drained by this connection's writer task.
    pub(crate) outbound: mpsc::UnboundedSender<Envelope>,
    /// Player name this connection joined as, once the join succeeded.
    pub(crate) bound_name: Option<String>,
}

/// All live connections.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    peers: HashMap<ConnId, Peer>,
}

impl Registry {
    pub(crate) fn insert(
        &mut self,
        id: ConnId,
        addr: SocketAddr,
        local_ip: String,
        outbound: mpsc::UnboundedSender<Envelope>,
    ) {
        self.peers.insert(
            id,
            Peer {
                addr,
                local_ip,
                outbound,
                bound_name: None,
            },
        );
    }

    pub(crate) fn remove(&mut self, id: ConnId) -> Option<Peer> {
        self.peers.remove(&id)
    }

    /// Records which player this connection authenticated as.
    pub(crate) fn bind_name(&mut self, id: ConnId, name: &str) {
        if let Some(peer) = self.peers.get_mut(&id) {
            peer.bound_name = Some(name.to_string());
        }
    }

    pub(crate) fn bound_name(&self, id: ConnId) -> Option<&str> {
        self.peers.get(&id)?.bound_name.as_deref()
    }

    pub(crate) fn len(&self) -> usize {
        self.peers.len()
    }

    /// Queues a message for one connection.
    ///
    /// Returns false if the connection is unknown or its writer task has
    /// already hung up; the caller decides whether that matters.
    pub(crate) fn send_to(&self, id: ConnId, body: MessageBody) -> bool {
        let Some(peer) = self.peers.get(&id) else {
            return false;
        };
        let envelope = Envelope::new(body, peer.local_ip.clone(), peer.addr.ip().to_string());
        peer.outbound.send(envelope).is_ok()
    }

    /// Queues a message for every connection.
    ///
    /// Each peer gets a freshly built envelope addressed to it, so no
    /// two connections ever share one. Peers whose writer task has hung
    /// up are skipped; the disconnect event that follows cleans them out.
    pub(crate) fn broadcast(&self, body: &MessageBody) {
        for (id, peer) in &self.peers {
            let envelope = Envelope::new(
                body.clone(),
                peer.local_ip.clone(),
                peer.addr.ip().to_string(),
            );
            if peer.outbound.send(envelope).is_err() {
                tracing::trace!(conn_id = %id, "skipping closed connection in broadcast");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn test_conn_id_display() {
        let id = ConnId(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_conn_id_mint_is_unique() {
        let a = ConnId::next();
        let b = ConnId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }

    const HOST_IP: &str = "10.0.0.1";

    #[test]
    fn test_insert_and_bind_name() {
        let mut registry = Registry::default();
        let id = ConnId::next();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.insert(id, test_addr(5000), HOST_IP.to_string(), tx);

        assert_eq!(registry.bound_name(id), None);
        registry.bind_name(id, "alice");
        assert_eq!(registry.bound_name(id), Some("alice"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_returns_peer() {
        let mut registry = Registry::default();
        let id = ConnId::next();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.insert(id, test_addr(5001), HOST_IP.to_string(), tx);
        registry.bind_name(id, "bob");

        let peer = registry.remove(id).unwrap();
        assert_eq!(peer.bound_name.as_deref(), Some("bob"));
        assert_eq!(registry.len(), 0);
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn test_send_to_addresses_the_peer() {
        let mut registry = Registry::default();
        let id = ConnId::next();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.insert(id, test_addr(5002), HOST_IP.to_string(), tx);

        let sent = registry.send_to(id, MessageBody::MoveOn("go".to_string()));
        assert!(sent);

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.sender, "10.0.0.1");
        assert_eq!(envelope.recipient, "127.0.0.1");
        assert!(matches!(envelope.body, MessageBody::MoveOn(_)));
    }

    #[test]
    fn test_sender_is_the_connection_local_ip() {
        // Two peers reached over different interfaces each see the
        // host address their own socket connected to, not whatever
        // the listener was bound on.
        let mut registry = Registry::default();
        let id_lan = ConnId::next();
        let id_lo = ConnId::next();
        let (tx_lan, mut rx_lan) = mpsc::unbounded_channel();
        let (tx_lo, mut rx_lo) = mpsc::unbounded_channel();
        registry.insert(id_lan, "192.168.1.9:6000".parse().unwrap(), "192.168.1.2".to_string(), tx_lan);
        registry.insert(id_lo, test_addr(6001), "127.0.0.1".to_string(), tx_lo);

        registry.broadcast(&MessageBody::MoveOn("next".to_string()));

        assert_eq!(rx_lan.try_recv().unwrap().sender, "192.168.1.2");
        assert_eq!(rx_lo.try_recv().unwrap().sender, "127.0.0.1");
    }

    #[test]
    fn test_send_to_unknown_conn_is_false() {
        let registry = Registry::default();
        assert!(!registry.send_to(ConnId::next(), MessageBody::MoveOn("go".to_string())));
    }

    #[test]
    fn test_broadcast_builds_fresh_envelope_per_peer() {
        let mut registry = Registry::default();
        let id_a = ConnId::next();
        let id_b = ConnId::next();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.insert(id_a, test_addr(5003), HOST_IP.to_string(), tx_a);
        registry.insert(id_b, "192.168.1.9:6000".parse().unwrap(), HOST_IP.to_string(), tx_b);

        registry.broadcast(&MessageBody::MoveOn("next".to_string()));

        let env_a = rx_a.try_recv().unwrap();
        let env_b = rx_b.try_recv().unwrap();
        assert_eq!(env_a.recipient, "127.0.0.1");
        assert_eq!(env_b.recipient, "192.168.1.9");
        assert_eq!(env_a.sender, "10.0.0.1");
        assert_eq!(env_b.sender, "10.0.0.1");
    }

    #[test]
    fn test_broadcast_skips_closed_peers() {
        let mut registry = Registry::default();
        let id_live = ConnId::next();
        let id_dead = ConnId::next();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        drop(rx_dead);
        registry.insert(id_live, test_addr(5004), HOST_IP.to_string(), tx_live);
        registry.insert(id_dead, test_addr(5005), HOST_IP.to_string(), tx_dead);

        registry.broadcast(&MessageBody::MoveOn("next".to_string()));
        assert!(rx_live.try_recv().is_ok());
    }
}
