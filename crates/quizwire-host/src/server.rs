//! TCP listener and the public host handle.
//!
//! [`QuizHost::bind`] stands up three kinds of task: the host actor
//! (one), the accept loop (one), and a reader/writer pair per
//! connection. Sockets never touch game state directly — readers turn
//! frames into [`NetEvent`]s for the actor, writers drain the outbound
//! queue the actor fills through the registry.

use std::net::SocketAddr;

use quizwire_protocol::{
    read_frame, write_frame, Bot, Codec, Envelope, GameSnapshot, JsonCodec, Player,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};

use crate::actor::{HostActor, HostCommand, NetEvent};
use crate::config::HostConfig;
use crate::error::HostError;
use crate::registry::ConnId;
use crate::state::HostState;

/// How many application commands may queue before callers wait.
const COMMAND_QUEUE: usize = 32;

/// Handle to a running host.
///
/// Cheap to clone; every clone talks to the same actor. Dropping the
/// last clone shuts the host down, as does [`kill`](QuizHost::kill).
#[derive(Debug, Clone)]
pub struct QuizHost {
    commands: mpsc::Sender<HostCommand>,
    shutdown: watch::Sender<bool>,
    local_addr: SocketAddr,
}

impl QuizHost {
    /// Binds the listener and starts hosting `snapshot`.
    ///
    /// The snapshot's session flags are reset on the way in, because
    /// whatever connections and half-answered turns it remembers
    /// belonged to an earlier process. The hosting player's own record
    /// is marked connected.
    pub async fn bind(config: HostConfig, snapshot: GameSnapshot) -> Result<Self, HostError> {
        let listener = TcpListener::bind(config.socket_addr()).await?;
        let local_addr = listener.local_addr()?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = HostState::new(snapshot, config.resumed_from_save);
        let actor = HostActor::new(state, event_rx, command_rx, shutdown_rx.clone());
        tokio::spawn(actor.run());
        tokio::spawn(accept_loop(listener, event_tx, shutdown_rx));

        tracing::info!(%local_addr, "quiz host listening");
        Ok(Self {
            commands: command_tx,
            shutdown: shutdown_tx,
            local_addr,
        })
    }

    /// The address the listener actually bound, useful when the config
    /// asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a copy of the authoritative game state.
    pub async fn snapshot(&self) -> Result<GameSnapshot, HostError> {
        self.command(|reply| HostCommand::Snapshot { reply }).await
    }

    /// Replaces the hosting player's own record, typically after the
    /// host answered the current question.
    pub async fn update_player(&self, player: Player) -> Result<(), HostError> {
        self.command(|reply| HostCommand::UpdatePlayer { player, reply })
            .await
    }

    /// Replaces the bot roster, typically after the bots took their
    /// turns.
    pub async fn update_bots(&self, bots: Vec<Bot>) -> Result<(), HostError> {
        self.command(|reply| HostCommand::UpdateBots { bots, reply })
            .await
    }

    /// Locks the roster, prunes lobby dropouts, and broadcasts a
    /// `sync_game` whose snapshot carries the started flag, so every
    /// participant starts from the same state. Returns that state.
    pub async fn start_game(&self) -> Result<GameSnapshot, HostError> {
        self.command(|reply| HostCommand::StartGame { reply }).await
    }

    /// Waits until every connected player has answered the current
    /// question, then returns the snapshot with answer flags already
    /// cleared for the next turn.
    ///
    /// Resolves immediately if everyone has answered by the time the
    /// call reaches the actor. Participants learn about the release
    /// from the `sync_players`, `sync_bots`, `move_on` broadcast.
    pub async fn advance_turn(&self) -> Result<GameSnapshot, HostError> {
        self.command(|reply| HostCommand::WaitAllAnswered { reply })
            .await
    }

    /// Stops the accept loop, the actor, and every connection task.
    /// In-flight broadcasts are not guaranteed to be delivered.
    pub fn kill(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn command<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> HostCommand,
    ) -> Result<T, HostError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| HostError::HostGone)?;
        reply_rx.await.map_err(|_| HostError::HostGone)
    }
}

// ---------------------------------------------------------------------------
// Socket tasks
// ---------------------------------------------------------------------------

async fn accept_loop(
    listener: TcpListener,
    events: mpsc::UnboundedSender<NetEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let conn_id = ConnId::next();
                    tracing::debug!(%conn_id, %addr, "accepted connection");

                    // The envelope sender: our address as this peer
                    // sees it. The listener itself may be bound to
                    // 0.0.0.0, which means nothing on the wire.
                    let local_ip = stream
                        .local_addr()
                        .map(|a| a.ip().to_string())
                        .unwrap_or_else(|_| "0.0.0.0".to_string());

                    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                    if events
                        .send(NetEvent::Connected {
                            conn_id,
                            addr,
                            local_ip,
                            outbound: outbound_tx,
                        })
                        .is_err()
                    {
                        // Actor is gone; stop accepting.
                        break;
                    }
                    let (read_half, write_half) = stream.into_split();
                    tokio::spawn(connection_reader(
                        conn_id,
                        read_half,
                        events.clone(),
                        shutdown.clone(),
                    ));
                    tokio::spawn(connection_writer(
                        conn_id,
                        write_half,
                        outbound_rx,
                        shutdown.clone(),
                    ));
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept connection");
                }
            },
            _ = shutdown.changed() => break,
        }
    }
    tracing::debug!("accept loop stopped");
}

/// Reads frames off one socket and forwards them to the actor.
///
/// Exits on clean close, read error, malformed frame, or shutdown; in
/// every case a `Disconnected` event follows so the actor can vacate
/// the seat.
async fn connection_reader(
    conn_id: ConnId,
    mut read_half: OwnedReadHalf,
    events: mpsc::UnboundedSender<NetEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let codec = JsonCodec;
    loop {
        tokio::select! {
            next = read_frame(&mut read_half) => match next {
                Ok(Some(frame)) => match codec.decode::<Envelope>(&frame) {
                    Ok(envelope) => {
                        if events.send(NetEvent::Frame { conn_id, envelope }).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // A peer that frames garbage will keep framing
                        // garbage. Cut it loose rather than guess.
                        tracing::warn!(%conn_id, error = %e, "malformed frame, dropping connection");
                        break;
                    }
                },
                Ok(None) => {
                    tracing::debug!(%conn_id, "connection closed by peer");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "read failed");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
    let _ = events.send(NetEvent::Disconnected { conn_id });
}

/// Drains one connection's outbound queue onto its socket.
async fn connection_writer(
    conn_id: ConnId,
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Envelope>,
    mut shutdown: watch::Receiver<bool>,
) {
    let codec = JsonCodec;
    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(envelope) => {
                    let bytes = match codec.encode(&envelope) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            tracing::error!(%conn_id, error = %e, "failed to encode outgoing message");
                            continue;
                        }
                    };
                    if let Err(e) = write_frame(&mut write_half, &bytes).await {
                        tracing::debug!(%conn_id, error = %e, "write failed");
                        break;
                    }
                }
                // Queue sender dropped: the actor removed this peer.
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}
