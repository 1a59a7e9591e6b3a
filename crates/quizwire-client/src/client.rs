//! The participant session.
//!
//! One reader task owns the inbound half of the socket and dispatches
//! every message as it arrives; the foreground (whoever drives the game
//! loop) calls the methods on [`QuizClient`]. The two sides meet only
//! at the [`SessionView`] mutex, taken for one message at a time, and
//! at a few signals: a [`Notify`] for `move_on`, a watch value that
//! latches once the game has started, and a watch value for "this
//! session is over, and here is why".

use std::sync::Arc;
use std::time::Duration;

use quizwire_protocol::{
    read_frame, write_frame, Codec, Envelope, GameSnapshot, JsonCodec, MessageBody, Player,
};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch, Mutex, Notify};

use crate::error::ClientError;
use crate::state::SessionView;

/// How long `join` waits for the host's verdict.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// A connection to a game host.
///
/// Cheap to clone; all clones share one session. Dropping every clone
/// drops the socket and lets the reader task wind down.
#[derive(Clone)]
pub struct QuizClient {
    inner: Arc<Inner>,
}

struct Inner {
    view: Mutex<SessionView>,
    writer: Mutex<OwnedWriteHalf>,
    /// Resolved by the reader when the host answers our `client_join`.
    pending_join: Mutex<Option<oneshot::Sender<Result<Player, ClientError>>>>,
    /// One permit per `move_on` received; consumed by
    /// [`QuizClient::wait_for_move_on`].
    move_on: Notify,
    /// Latches to true on the first `sync_game` whose snapshot says the
    /// game is under way. Never goes back to false.
    started: watch::Sender<bool>,
    /// `Some(reason)` once the session has ended.
    session_over: watch::Sender<Option<String>>,
    my_ip: String,
    host_ip: String,
    codec: JsonCodec,
}

impl QuizClient {
    /// Opens a TCP connection to the host and starts the reader task.
    ///
    /// `my_name` is the display name this session will join under; it
    /// is how we find ourselves in every synced player list.
    pub async fn connect(addr: &str, my_name: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let my_ip = stream.local_addr()?.ip().to_string();
        let host_ip = stream.peer_addr()?.ip().to_string();
        let (read_half, write_half) = stream.into_split();

        let (session_over, _) = watch::channel(None);
        let (started, _) = watch::channel(false);
        let inner = Arc::new(Inner {
            view: Mutex::new(SessionView::new(my_name)),
            writer: Mutex::new(write_half),
            pending_join: Mutex::new(None),
            move_on: Notify::new(),
            started,
            session_over,
            my_ip,
            host_ip,
            codec: JsonCodec,
        });
        tokio::spawn(reader_loop(Arc::clone(&inner), read_half));

        tracing::info!(%addr, name = %my_name, "connected to host");
        Ok(Self { inner })
    }

    /// Asks the host for a seat and waits for its verdict.
    ///
    /// On success, returns our record exactly as the host stored it —
    /// on a rejoin that includes the score the seat kept for us. A
    /// refusal surfaces as [`ClientError::Rejected`] with the host's
    /// reason; a host that never answers, as [`ClientError::Timeout`].
    pub async fn join(&self, player: Player) -> Result<Player, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        *self.inner.pending_join.lock().await = Some(reply_tx);

        self.send(MessageBody::ClientJoin(player)).await?;

        match tokio::time::timeout(JOIN_TIMEOUT, reply_rx).await {
            Ok(Ok(verdict)) => verdict,
            // Reader gone without answering: the session died first.
            Ok(Err(_)) => Err(ClientError::SessionOver(
                self.session_over()
                    .unwrap_or_else(|| "host closed the session".to_string()),
            )),
            Err(_) => {
                self.inner.pending_join.lock().await.take();
                Err(ClientError::Timeout)
            }
        }
    }

    /// Reports our player's state to the host (`sync_player`), which is
    /// also how the host learns we answered the current question.
    pub async fn send_player_state(&self, player: Player) -> Result<(), ClientError> {
        self.send(MessageBody::SyncPlayer(player)).await
    }

    /// Waits for the host's next `move_on`.
    ///
    /// A `move_on` that arrived before this call is not lost — it left
    /// a permit behind and the wait returns at once. If the session is
    /// over (or ends mid-wait), returns the recorded reason instead.
    pub async fn wait_for_move_on(&self) -> Result<(), ClientError> {
        let notified = self.inner.move_on.notified();
        let mut over = self.inner.session_over.subscribe();
        if let Some(reason) = over.borrow_and_update().clone() {
            return Err(ClientError::SessionOver(reason));
        }
        tokio::select! {
            // Consume a pending move_on even if the session died right
            // after it; the final turn still counts.
            biased;
            _ = notified => Ok(()),
            _ = over.changed() => {
                let reason = over
                    .borrow()
                    .clone()
                    .unwrap_or_else(|| "session ended".to_string());
                Err(ClientError::SessionOver(reason))
            }
        }
    }

    /// Waits until the host starts the game.
    ///
    /// Resolves on the first `sync_game` that says play is under way —
    /// immediately if one already arrived, which is what a mid-game
    /// rejoiner sees. If the session is over (or ends mid-wait),
    /// returns the recorded reason instead.
    pub async fn wait_for_start(&self) -> Result<(), ClientError> {
        let mut started = self.inner.started.subscribe();
        let mut over = self.inner.session_over.subscribe();
        if let Some(reason) = over.borrow_and_update().clone() {
            return Err(ClientError::SessionOver(reason));
        }
        if *started.borrow_and_update() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = started.changed() => Ok(()),
            _ = over.changed() => {
                let reason = over
                    .borrow()
                    .clone()
                    .unwrap_or_else(|| "session ended".to_string());
                Err(ClientError::SessionOver(reason))
            }
        }
    }

    /// A copy of the mirrored game state.
    pub async fn snapshot(&self) -> GameSnapshot {
        self.inner.view.lock().await.snapshot.clone()
    }

    /// A copy of our own record in the mirror, if present.
    pub async fn my_player(&self) -> Option<Player> {
        self.inner.view.lock().await.my_player().cloned()
    }

    /// True once the host has acknowledged our join.
    pub async fn joined(&self) -> bool {
        self.inner.view.lock().await.joined()
    }

    /// Why the session ended, if it has.
    pub fn session_over(&self) -> Option<String> {
        self.inner.session_over.borrow().clone()
    }

    /// Closes our half of the connection. The host notices and vacates
    /// the seat; the record stays, so a later [`join`](Self::join) under
    /// the same name gets it back.
    pub async fn close(&self) {
        let mut writer = self.inner.writer.lock().await;
        let _ = writer.shutdown().await;
    }

    async fn send(&self, body: MessageBody) -> Result<(), ClientError> {
        let envelope = Envelope::new(body, self.inner.my_ip.clone(), self.inner.host_ip.clone());
        let bytes = self.inner.codec.encode(&envelope)?;
        let mut writer = self.inner.writer.lock().await;
        write_frame(&mut *writer, &bytes).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reader task
// ---------------------------------------------------------------------------

async fn reader_loop(inner: Arc<Inner>, mut read_half: OwnedReadHalf) {
    let reason = loop {
        match read_frame(&mut read_half).await {
            Ok(Some(frame)) => match inner.codec.decode::<Envelope>(&frame) {
                Ok(envelope) => {
                    if let Some(reason) = inner.dispatch(envelope).await {
                        break reason;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed message from host");
                    break "malformed message from host".to_string();
                }
            },
            Ok(None) => break "host closed the session".to_string(),
            Err(e) => break format!("connection lost: {e}"),
        }
    };

    // A join still waiting for its verdict learns the session died.
    if let Some(tx) = inner.pending_join.lock().await.take() {
        let _ = tx.send(Err(ClientError::SessionOver(reason.clone())));
    }
    tracing::info!(%reason, "session over");
    inner.session_over.send_replace(Some(reason));
}

impl Inner {
    /// Applies one host message. Returns `Some(reason)` when the
    /// session must end.
    async fn dispatch(&self, envelope: Envelope) -> Option<String> {
        let tag = envelope.body.tag();
        match envelope.body {
            MessageBody::JoinAck(player) => {
                tracing::debug!(player = %player.name, "join acknowledged");
                self.view.lock().await.apply_join_ack(player.clone());
                match self.pending_join.lock().await.take() {
                    Some(tx) => {
                        let _ = tx.send(Ok(player));
                    }
                    None => tracing::debug!("join_ack with no join pending"),
                }
                None
            }
            MessageBody::SyncGame(snapshot) => {
                tracing::debug!(
                    players = snapshot.players.len(),
                    question = snapshot.current_question,
                    "game state replaced"
                );
                let under_way = snapshot.started;
                self.view.lock().await.apply_sync_game(snapshot);
                // Latch after the mirror is updated, so a waiter woken
                // by this already sees the synced state.
                if under_way {
                    self.started.send_replace(true);
                }
                None
            }
            MessageBody::SyncPlayers(players) => {
                self.view.lock().await.apply_sync_players(players);
                None
            }
            MessageBody::SyncBots(bots) => {
                self.view.lock().await.apply_sync_bots(bots);
                None
            }
            MessageBody::MoveOn(note) => {
                tracing::debug!(%note, "move on");
                self.move_on.notify_one();
                None
            }
            MessageBody::ServerError(reason) => {
                tracing::warn!(%reason, "server error from host");
                if let Some(tx) = self.pending_join.lock().await.take() {
                    let _ = tx.send(Err(ClientError::Rejected(reason.clone())));
                }
                Some(reason)
            }
            MessageBody::ClientJoin(_) | MessageBody::SyncPlayer(_) => {
                // These flow participant-to-host; a host sending one is
                // confused, not fatal.
                tracing::debug!(tag, "ignoring unexpected message");
                None
            }
            MessageBody::Unknown => {
                tracing::debug!("ignoring message with unknown tag");
                None
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
