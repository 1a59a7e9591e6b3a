//! The host actor.
//!
//! Every piece of mutable host state — the game snapshot and the
//! connection registry — is owned by one task and touched by message
//! passing only. Connection tasks feed it [`NetEvent`]s, the embedding
//! application feeds it [`HostCommand`]s, and neither ever holds a
//! lock, because there is no lock to hold.

use quizwire_protocol::{Bot, Envelope, GameSnapshot, MessageBody, Player};
use tokio::sync::{mpsc, oneshot, watch};

use crate::registry::{ConnId, Registry};
use crate::state::{HostState, JoinDecision};

/// Network-side input, produced by connection tasks.
#[derive(Debug)]
pub(crate) enum NetEvent {
    /// A socket was accepted. `outbound` is the queue its writer task
    /// drains; `local_ip` is the host's address as this peer sees it.
    Connected {
        conn_id: ConnId,
        addr: std::net::SocketAddr,
        local_ip: String,
        outbound: mpsc::UnboundedSender<Envelope>,
    },
    /// A complete frame arrived and decoded.
    Frame { conn_id: ConnId, envelope: Envelope },
    /// The socket is gone, for whatever reason.
    Disconnected { conn_id: ConnId },
}

/// Application-side input, produced by [`QuizHost`](crate::QuizHost)
/// methods. Each variant carries the oneshot its reply travels back on.
#[derive(Debug)]
pub(crate) enum HostCommand {
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    UpdatePlayer {
        player: Player,
        reply: oneshot::Sender<()>,
    },
    UpdateBots {
        bots: Vec<Bot>,
        reply: oneshot::Sender<()>,
    },
    StartGame {
        reply: oneshot::Sender<GameSnapshot>,
    },
    WaitAllAnswered {
        reply: oneshot::Sender<GameSnapshot>,
    },
}

pub(crate) struct HostActor {
    state: HostState,
    registry: Registry,
    events: mpsc::UnboundedReceiver<NetEvent>,
    commands: mpsc::Receiver<HostCommand>,
    shutdown: watch::Receiver<bool>,
    /// A parked `advance_turn` call, resolved when the turn barrier
    /// releases. At most one waiter at a time.
    pending_barrier: Option<oneshot::Sender<GameSnapshot>>,
}

impl HostActor {
    pub(crate) fn new(
        state: HostState,
        events: mpsc::UnboundedReceiver<NetEvent>,
        commands: mpsc::Receiver<HostCommand>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            state,
            registry: Registry::default(),
            events,
            commands,
            shutdown,
            pending_barrier: None,
        }
    }

    /// Runs until shutdown is signalled or both input channels close.
    pub(crate) async fn run(mut self) {
        tracing::debug!("host actor started");
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.on_event(event),
                    None => break,
                },
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                _ = self.shutdown.changed() => break,
            }
        }
        tracing::debug!("host actor stopped");
    }

    // ---------------------------------------------------------------
    // Network events
    // ---------------------------------------------------------------

    fn on_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Connected {
                conn_id,
                addr,
                local_ip,
                outbound,
            } => {
                self.registry.insert(conn_id, addr, local_ip, outbound);
                tracing::debug!(
                    %conn_id,
                    %addr,
                    connections = self.registry.len(),
                    "connection registered"
                );
            }
            NetEvent::Frame { conn_id, envelope } => self.on_frame(conn_id, envelope),
            NetEvent::Disconnected { conn_id } => {
                let Some(peer) = self.registry.remove(conn_id) else {
                    return;
                };
                match peer.bound_name {
                    Some(name) => {
                        tracing::info!(%conn_id, player = %name, "player disconnected");
                        self.state.mark_disconnected(&name);
                        // The departed player may have been the last one
                        // a parked turn was waiting on.
                        self.try_release_barrier();
                    }
                    None => tracing::debug!(%conn_id, "connection closed before joining"),
                }
            }
        }
    }

    fn on_frame(&mut self, conn_id: ConnId, envelope: Envelope) {
        match envelope.body {
            MessageBody::ClientJoin(player) => self.on_join(conn_id, player),
            MessageBody::SyncPlayer(player) => self.on_sync_player(conn_id, player),
            MessageBody::Unknown => {
                tracing::debug!(%conn_id, "ignoring message with unknown tag");
            }
            other => {
                // join_ack, sync_game and the rest flow host-to-participant.
                // A participant sending one is confused, not dangerous.
                tracing::debug!(%conn_id, tag = other.tag(), "ignoring unexpected message");
            }
        }
    }

    fn on_join(&mut self, conn_id: ConnId, proposed: Player) {
        // A connection holds at most one seat. If it joins again, the
        // earlier binding is vacated first — otherwise that name would
        // stay connected with no socket behind it, never answer, and
        // hold the turn barrier open forever. (Re-sending the same
        // name lands on the rejoin path and is acked again.)
        if let Some(old) = self.registry.bound_name(conn_id).map(str::to_string) {
            tracing::info!(%conn_id, player = %old, "connection joining again, vacating its seat");
            self.state.mark_disconnected(&old);
            self.try_release_barrier();
        }

        let proposed_name = proposed.name.clone();
        match self.state.handle_join(proposed) {
            JoinDecision::Accepted(player) => {
                self.registry.bind_name(conn_id, &player.name);
                tracing::info!(%conn_id, player = %player.name, "player joined");
                self.send_to(conn_id, MessageBody::JoinAck(player));
            }
            JoinDecision::Rejoined(player) => {
                self.registry.bind_name(conn_id, &player.name);
                tracing::info!(%conn_id, player = %player.name, "player rejoined");
                self.send_to(conn_id, MessageBody::JoinAck(player));
                // Their mirror is stale or empty; hand them the whole game.
                self.send_to(conn_id, MessageBody::SyncGame(self.state.snapshot().clone()));
            }
            JoinDecision::Rejected(reason) => {
                tracing::info!(%conn_id, player = %proposed_name, reason, "join rejected");
                self.send_to(conn_id, MessageBody::ServerError(reason.to_string()));
                // The socket stays open so the client can retry under
                // another name.
            }
        }
    }

    fn on_sync_player(&mut self, conn_id: ConnId, player: Player) {
        let Some(name) = self.registry.bound_name(conn_id) else {
            tracing::warn!(%conn_id, "sync_player from a connection that never joined");
            return;
        };
        let name = name.to_string();
        if self.state.apply_player_update(&name, player) {
            tracing::debug!(%conn_id, player = %name, "player state updated");
            self.try_release_barrier();
        } else {
            tracing::warn!(%conn_id, player = %name, "sync_player for a pruned record");
        }
    }

    // ---------------------------------------------------------------
    // Application commands
    // ---------------------------------------------------------------

    fn on_command(&mut self, command: HostCommand) {
        match command {
            HostCommand::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot().clone());
            }
            HostCommand::UpdatePlayer { player, reply } => {
                self.state.update_host_player(player);
                let _ = reply.send(());
                // The host answering may complete the turn.
                self.try_release_barrier();
            }
            HostCommand::UpdateBots { bots, reply } => {
                self.state.update_bots(bots);
                let _ = reply.send(());
            }
            HostCommand::StartGame { reply } => {
                let pruned = self.state.start_game();
                let snapshot = self.state.snapshot().clone();
                tracing::info!(
                    players = snapshot.players.len(),
                    bots = snapshot.bots.len(),
                    pruned,
                    "game started"
                );
                // The snapshot carries `started`, so this one broadcast
                // is both the state sync and the starting gun.
                self.broadcast(MessageBody::SyncGame(snapshot.clone()));
                let _ = reply.send(snapshot);
            }
            HostCommand::WaitAllAnswered { reply } => {
                if self.pending_barrier.is_some() {
                    tracing::warn!("replacing an earlier turn waiter");
                }
                self.pending_barrier = Some(reply);
                // Everyone may have answered already; a solo host always has.
                self.try_release_barrier();
            }
        }
    }

    // ---------------------------------------------------------------
    // Turn barrier
    // ---------------------------------------------------------------

    /// Releases a parked `advance_turn` once every connected player has
    /// answered the current question.
    ///
    /// Answer flags are cleared and the question index advanced before
    /// anything goes out, so the `sync_players` broadcast that ends the
    /// turn already shows the next turn's clean slate, and a rejoiner
    /// arriving a moment later gets a `sync_game` pointing at the right
    /// question. The broadcasts go out back to back; framing keeps them
    /// apart on the wire.
    fn try_release_barrier(&mut self) {
        if self.pending_barrier.is_none() || !self.state.all_answered() {
            return;
        }
        self.state.clear_answers();
        self.state.advance_question();
        let snapshot = self.state.snapshot().clone();
        self.broadcast(MessageBody::SyncPlayers(snapshot.players.clone()));
        self.broadcast(MessageBody::SyncBots(snapshot.bots.clone()));
        self.broadcast(MessageBody::MoveOn("all players have answered".to_string()));
        if let Some(reply) = self.pending_barrier.take() {
            let _ = reply.send(snapshot);
        }
        tracing::debug!("turn barrier released");
    }

    // ---------------------------------------------------------------
    // Outbound helpers
    // ---------------------------------------------------------------

    fn send_to(&self, conn_id: ConnId, body: MessageBody) {
        if !self.registry.send_to(conn_id, body) {
            tracing::debug!(%conn_id, "dropping message for a vanished connection");
        }
    }

    fn broadcast(&self, body: MessageBody) {
        self.registry.broadcast(&body);
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quizwire_protocol::{GameSettings, GameSnapshot};
    use std::time::Duration;

    struct Harness {
        events: mpsc::UnboundedSender<NetEvent>,
        commands: mpsc::Sender<HostCommand>,
        // Dropping this would shut the actor down, so hold it.
        _shutdown: watch::Sender<bool>,
    }

    fn spawn_actor(max_players: usize) -> Harness {
        let settings = GameSettings {
            max_players,
            ..GameSettings::default()
        };
        let mut snapshot = GameSnapshot::new(settings);
        let mut host = Player::new("Quinn", "Blue", "star");
        host.is_host = true;
        snapshot.players.push(host);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let actor = HostActor::new(
            HostState::new(snapshot, false),
            event_rx,
            command_rx,
            shutdown_rx,
        );
        tokio::spawn(actor.run());
        Harness {
            events: event_tx,
            commands: command_tx,
            _shutdown: shutdown_tx,
        }
    }

    /// Connects a fake socket and returns its outbound queue.
    fn connect(harness: &Harness, port: u16) -> (ConnId, mpsc::UnboundedReceiver<Envelope>) {
        let conn_id = ConnId::next();
        let (tx, rx) = mpsc::unbounded_channel();
        harness
            .events
            .send(NetEvent::Connected {
                conn_id,
                addr: format!("127.0.0.1:{port}").parse().unwrap(),
                local_ip: "10.0.0.1".to_string(),
                outbound: tx,
            })
            .unwrap();
        (conn_id, rx)
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Envelope {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("channel closed")
    }

    fn join_frame(conn_id: ConnId, name: &str) -> NetEvent {
        NetEvent::Frame {
            conn_id,
            envelope: Envelope::new(
                MessageBody::ClientJoin(Player::new(name, "Red", "moon")),
                "127.0.0.1",
                "10.0.0.1",
            ),
        }
    }

    #[tokio::test]
    async fn test_join_is_acked() {
        let harness = spawn_actor(4);
        let (conn_id, mut rx) = connect(&harness, 4001);
        harness.events.send(join_frame(conn_id, "alice")).unwrap();

        let envelope = recv(&mut rx).await;
        match envelope.body {
            MessageBody::JoinAck(player) => {
                assert_eq!(player.name, "alice");
                assert!(player.is_connected);
            }
            other => panic!("expected join_ack, got {}", other.tag()),
        }
        assert_eq!(envelope.sender, "10.0.0.1");
        assert_eq!(envelope.recipient, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_rejected_join_keeps_connection_usable() {
        let harness = spawn_actor(4);
        let (conn_a, mut rx_a) = connect(&harness, 4002);
        let (conn_b, mut rx_b) = connect(&harness, 4003);

        harness.events.send(join_frame(conn_a, "alice")).unwrap();
        assert!(matches!(recv(&mut rx_a).await.body, MessageBody::JoinAck(_)));

        // Same name from another socket: refused, socket stays open.
        harness.events.send(join_frame(conn_b, "alice")).unwrap();
        match recv(&mut rx_b).await.body {
            MessageBody::ServerError(reason) => assert_eq!(reason, "Username is taken"),
            other => panic!("expected server_error, got {}", other.tag()),
        }

        // A second attempt under a fresh name goes through.
        harness.events.send(join_frame(conn_b, "bob")).unwrap();
        assert!(matches!(recv(&mut rx_b).await.body, MessageBody::JoinAck(_)));
    }

    #[tokio::test]
    async fn test_rejoin_gets_ack_then_full_sync() {
        let harness = spawn_actor(4);
        let (conn_a, mut rx_a) = connect(&harness, 4004);
        harness.events.send(join_frame(conn_a, "alice")).unwrap();
        assert!(matches!(recv(&mut rx_a).await.body, MessageBody::JoinAck(_)));

        harness
            .events
            .send(NetEvent::Disconnected { conn_id: conn_a })
            .unwrap();

        let (conn_b, mut rx_b) = connect(&harness, 4005);
        harness.events.send(join_frame(conn_b, "alice")).unwrap();
        assert!(matches!(recv(&mut rx_b).await.body, MessageBody::JoinAck(_)));
        assert!(matches!(recv(&mut rx_b).await.body, MessageBody::SyncGame(_)));
    }

    #[tokio::test]
    async fn test_turn_barrier_clears_flags_then_broadcasts_in_order() {
        let harness = spawn_actor(4);
        let (conn_id, mut rx) = connect(&harness, 4006);
        harness.events.send(join_frame(conn_id, "alice")).unwrap();
        assert!(matches!(recv(&mut rx).await.body, MessageBody::JoinAck(_)));

        // Start the game; the participant sees one sync_game whose
        // snapshot carries the started flag.
        let (reply_tx, reply_rx) = oneshot::channel();
        harness
            .commands
            .send(HostCommand::StartGame { reply: reply_tx })
            .await
            .unwrap();
        reply_rx.await.unwrap();
        match recv(&mut rx).await.body {
            MessageBody::SyncGame(snapshot) => assert!(snapshot.started),
            other => panic!("expected sync_game, got {}", other.tag()),
        }

        // Park the barrier, then answer: host first, then alice.
        let (barrier_tx, barrier_rx) = oneshot::channel();
        harness
            .commands
            .send(HostCommand::WaitAllAnswered { reply: barrier_tx })
            .await
            .unwrap();

        let mut quinn = Player::new("Quinn", "Blue", "star");
        quinn.has_answered = true;
        let (reply_tx, reply_rx) = oneshot::channel();
        harness
            .commands
            .send(HostCommand::UpdatePlayer {
                player: quinn,
                reply: reply_tx,
            })
            .await
            .unwrap();
        reply_rx.await.unwrap();

        let mut alice = Player::new("alice", "Red", "moon");
        alice.has_answered = true;
        alice.points = 1.0;
        harness
            .events
            .send(NetEvent::Frame {
                conn_id,
                envelope: Envelope::new(
                    MessageBody::SyncPlayer(alice),
                    "127.0.0.1",
                    "10.0.0.1",
                ),
            })
            .unwrap();

        // Release order on the wire: sync_players, sync_bots, move_on.
        match recv(&mut rx).await.body {
            MessageBody::SyncPlayers(players) => {
                // Flags were cleared before the broadcast went out.
                assert!(players.iter().all(|p| !p.has_answered));
                let alice = players.iter().find(|p| p.name == "alice").unwrap();
                assert_eq!(alice.points, 1.0);
            }
            other => panic!("expected sync_players, got {}", other.tag()),
        }
        assert!(matches!(recv(&mut rx).await.body, MessageBody::SyncBots(_)));
        assert!(matches!(recv(&mut rx).await.body, MessageBody::MoveOn(_)));

        // And the parked advance_turn resolves with the same state,
        // already pointing at the next question.
        let snapshot = tokio::time::timeout(Duration::from_secs(1), barrier_rx)
            .await
            .expect("barrier never released")
            .unwrap();
        assert!(snapshot.players.iter().all(|p| !p.has_answered));
        assert_eq!(snapshot.current_question, 1);
    }

    #[tokio::test]
    async fn test_second_join_on_same_socket_vacates_the_old_seat() {
        let harness = spawn_actor(4);
        let (conn_id, mut rx) = connect(&harness, 4010);

        // One socket joins twice under different names; the first seat
        // must not linger as a connected ghost.
        harness.events.send(join_frame(conn_id, "alice")).unwrap();
        assert!(matches!(recv(&mut rx).await.body, MessageBody::JoinAck(_)));
        harness.events.send(join_frame(conn_id, "alex")).unwrap();
        match recv(&mut rx).await.body {
            MessageBody::JoinAck(player) => assert_eq!(player.name, "alex"),
            other => panic!("expected join_ack, got {}", other.tag()),
        }

        // Quinn answers, the barrier parks, then alex answers. If the
        // abandoned "alice" still counted as connected, this turn
        // could never complete.
        let mut quinn = Player::new("Quinn", "Blue", "star");
        quinn.has_answered = true;
        let (reply_tx, reply_rx) = oneshot::channel();
        harness
            .commands
            .send(HostCommand::UpdatePlayer {
                player: quinn,
                reply: reply_tx,
            })
            .await
            .unwrap();
        reply_rx.await.unwrap();

        let (barrier_tx, barrier_rx) = oneshot::channel();
        harness
            .commands
            .send(HostCommand::WaitAllAnswered { reply: barrier_tx })
            .await
            .unwrap();

        let mut alex = Player::new("alex", "Red", "moon");
        alex.has_answered = true;
        harness
            .events
            .send(NetEvent::Frame {
                conn_id,
                envelope: Envelope::new(
                    MessageBody::SyncPlayer(alex),
                    "127.0.0.1",
                    "10.0.0.1",
                ),
            })
            .unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(2), barrier_rx)
            .await
            .expect("barrier wedged on the abandoned seat")
            .unwrap();
        assert!(!snapshot.player("alice").unwrap().is_connected);
        assert!(snapshot.player("alex").unwrap().is_connected);
    }

    #[tokio::test]
    async fn test_rejoining_same_name_on_same_socket_is_acked_again() {
        let harness = spawn_actor(4);
        let (conn_id, mut rx) = connect(&harness, 4011);

        harness.events.send(join_frame(conn_id, "alice")).unwrap();
        assert!(matches!(recv(&mut rx).await.body, MessageBody::JoinAck(_)));

        // A duplicate join from the same socket is its own retry, not
        // an imposter: it lands on the rejoin path.
        harness.events.send(join_frame(conn_id, "alice")).unwrap();
        assert!(matches!(recv(&mut rx).await.body, MessageBody::JoinAck(_)));
        assert!(matches!(recv(&mut rx).await.body, MessageBody::SyncGame(_)));
    }

    #[tokio::test]
    async fn test_disconnect_releases_a_held_barrier() {
        let harness = spawn_actor(4);
        let (conn_id, mut rx) = connect(&harness, 4007);
        harness.events.send(join_frame(conn_id, "alice")).unwrap();
        assert!(matches!(recv(&mut rx).await.body, MessageBody::JoinAck(_)));

        // Host has answered; alice never will.
        let mut quinn = Player::new("Quinn", "Blue", "star");
        quinn.has_answered = true;
        let (reply_tx, reply_rx) = oneshot::channel();
        harness
            .commands
            .send(HostCommand::UpdatePlayer {
                player: quinn,
                reply: reply_tx,
            })
            .await
            .unwrap();
        reply_rx.await.unwrap();

        let (barrier_tx, barrier_rx) = oneshot::channel();
        harness
            .commands
            .send(HostCommand::WaitAllAnswered { reply: barrier_tx })
            .await
            .unwrap();

        harness
            .events
            .send(NetEvent::Disconnected { conn_id })
            .unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(1), barrier_rx)
            .await
            .expect("barrier never released")
            .unwrap();
        assert!(!snapshot.player("alice").unwrap().is_connected);
    }
}
