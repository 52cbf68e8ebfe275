//! Reconnecting observer connections, one per watched game.
//!
//! Each game gets a supervisor task that owns its socket. The task walks
//! `Connecting -> Open -> Backoff -> Connecting ...` and only stops when
//! watching is stopped or the retry budget runs out (`Failed`). A
//! successful open resets the budget. The delay before a retry grows
//! linearly with the number of consecutive failures.
//!
//! `connect()` callers never touch the socket. They watch the task's
//! progress and resolve on the next open, so concurrent callers for one
//! game share a single socket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rando_proto::{ObserverPacket, decode, encode};
use rando_types::{GameId, Match, UserId};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::ObserverConfig;
use crate::error::ObserverError;
use crate::fetch::MatchFetcher;
use crate::state::MatchTable;

type ObserverSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Where a game's connection currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening the socket. `attempt` counts from 1 since the last open.
    Connecting {
        /// Attempt number.
        attempt: u32,
    },
    /// Subscribed and receiving updates.
    Open,
    /// Waiting to retry after attempt `attempt` ended.
    Backoff {
        /// Attempt that just ended.
        attempt: u32,
    },
    /// Retry budget exhausted. Nothing further is attempted.
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Progress {
    state: ConnectionState,
    /// Successful opens so far in this chain.
    opens: u64,
}

struct ConnectionHandle {
    progress: Arc<watch::Sender<Progress>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    fn is_active(&self) -> bool {
        !self.task.is_finished() && self.progress.borrow().state != ConnectionState::Failed
    }
}

enum SocketEnd {
    Cancelled,
    Closed { opened: bool },
}

/// State the connection tasks share with the client.
#[derive(Clone)]
struct Shared {
    config: Arc<ObserverConfig>,
    matches: Arc<RwLock<MatchTable>>,
    updates: broadcast::Sender<GameId>,
}

impl Shared {
    async fn handle_frame(&self, game_id: GameId, frame: &[u8]) {
        let packet = match decode::<ObserverPacket>(frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(%game_id, error = %e, "Dropping malformed observer packet");
                return;
            }
        };
        let changed = self.matches.write().await.apply(game_id, packet);
        if changed {
            self.notify(game_id);
        }
    }

    fn notify(&self, game_id: GameId) {
        if self.updates.send(game_id).is_err() {
            trace!(%game_id, "Match updated with no subscribers");
        }
    }
}

/// Watches remote matches and keeps a local projection of each.
pub struct ObserverClient {
    shared: Shared,
    fetcher: MatchFetcher,
    connections: Mutex<HashMap<GameId, ConnectionHandle>>,
}

impl ObserverClient {
    /// Create a client. Nothing is watched until [`connect`](Self::connect).
    pub fn new(config: ObserverConfig) -> Self {
        let fetcher = MatchFetcher::new(config.api_base_url.clone());
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            shared: Shared {
                config: Arc::new(config),
                matches: Arc::new(RwLock::new(MatchTable::new())),
                updates,
            },
            fetcher,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ObserverConfig {
        &self.shared.config
    }

    /// Watch `game_id` as `user_id` and resolve once the socket is open.
    ///
    /// If the game already has a live connection chain the call joins it
    /// instead of opening a second socket; it resolves immediately when
    /// that socket is open, otherwise on its next open. Once resolved,
    /// disconnects are handled in the background.
    ///
    /// # Errors
    ///
    /// [`ObserverError::RetryExhausted`] if the retry budget runs out
    /// before an open, [`ObserverError::Stopped`] if
    /// [`stop_watching`](Self::stop_watching) is called first.
    pub async fn connect(&self, game_id: GameId, user_id: &UserId) -> Result<(), ObserverError> {
        let (mut progress, seen_opens) = {
            let mut connections = self.connections.lock().await;
            match connections.get(&game_id) {
                Some(handle) if handle.is_active() => {
                    debug!(%game_id, "Joining existing observer connection");
                    let progress = handle.progress.subscribe();
                    let seen = progress.borrow().opens;
                    (progress, seen)
                }
                _ => {
                    if let Some(stale) = connections.remove(&game_id) {
                        stale.cancel.cancel();
                    }
                    let handle = self.spawn_connection(game_id, user_id.clone());
                    let progress = handle.progress.subscribe();
                    connections.insert(game_id, handle);
                    (progress, 0)
                }
            }
        };

        let outcome = progress
            .wait_for(|p| {
                p.state == ConnectionState::Open
                    || p.opens > seen_opens
                    || p.state == ConnectionState::Failed
            })
            .await
            .map(|p| *p);

        match outcome {
            Ok(p) if p.opens > seen_opens || p.state == ConnectionState::Open => Ok(()),
            Ok(_) => Err(ObserverError::RetryExhausted {
                game_id,
                attempts: self.shared.config.max_retries,
            }),
            Err(_closed) => Err(ObserverError::Stopped { game_id }),
        }
    }

    fn spawn_connection(&self, game_id: GameId, user_id: UserId) -> ConnectionHandle {
        let (progress, _) = watch::channel(Progress {
            state: ConnectionState::Connecting { attempt: 1 },
            opens: 0,
        });
        let progress = Arc::new(progress);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_connection(
            self.shared.clone(),
            game_id,
            user_id,
            Arc::clone(&progress),
            cancel.clone(),
        ));
        ConnectionHandle {
            progress,
            cancel,
            task,
        }
    }

    /// Stop watching a game: close its socket and cancel any scheduled
    /// reconnect. The projected match is kept.
    ///
    /// Returns whether the game was being watched.
    pub async fn stop_watching(&self, game_id: GameId) -> bool {
        let handle = self.connections.lock().await.remove(&game_id);
        let Some(handle) = handle else {
            return false;
        };
        handle.cancel.cancel();
        if let Err(e) = handle.task.await {
            warn!(%game_id, error = %e, "Observer task ended abnormally");
        }
        info!(%game_id, "Stopped watching game");
        true
    }

    /// Stop watching every game.
    pub async fn stop_all(&self) {
        let games: Vec<GameId> = self.connections.lock().await.keys().copied().collect();
        for game_id in games {
            self.stop_watching(game_id).await;
        }
    }

    /// Forget the projected match of a game.
    pub async fn evict_match(&self, game_id: GameId) -> Option<Match> {
        let evicted = self.shared.matches.write().await.remove(game_id);
        if evicted.is_some() {
            debug!(%game_id, "Match evicted");
            self.shared.notify(game_id);
        }
        evicted
    }

    /// Connection state of a game, if it has ever been connected.
    pub async fn connection_state(&self, game_id: GameId) -> Option<ConnectionState> {
        self.connections
            .lock()
            .await
            .get(&game_id)
            .map(|handle| handle.progress.borrow().state)
    }

    /// Snapshot of the projected match.
    pub async fn match_state(&self, game_id: GameId) -> Option<Match> {
        self.shared.matches.read().await.get(game_id).cloned()
    }

    /// Ids of every projected match.
    pub async fn known_games(&self) -> Vec<GameId> {
        self.shared.matches.read().await.game_ids()
    }

    /// Receive the id of every match that changes.
    pub fn subscribe(&self) -> broadcast::Receiver<GameId> {
        self.shared.updates.subscribe()
    }

    /// Seed a match from the REST API.
    ///
    /// Teams are always replaced. The board and standings are replaced
    /// only when the game has a board.
    pub async fn refresh_match(&self, game_id: GameId) -> Result<(), ObserverError> {
        let fetched = self.fetcher.fetch_match(game_id).await?;
        {
            let mut matches = self.shared.matches.write().await;
            matches.set_teams(game_id, fetched.teams);
            if let Some(bingo) = fetched.bingo {
                matches.set_board(game_id, bingo.board);
                matches.set_bingo_teams(game_id, bingo.teams);
            }
        }
        debug!(%game_id, "Match seeded from REST");
        self.shared.notify(game_id);
        Ok(())
    }
}

impl Drop for ObserverClient {
    fn drop(&mut self) {
        for handle in self.connections.get_mut().values() {
            handle.cancel.cancel();
        }
    }
}

/// Supervisor for one game's connection chain.
async fn run_connection(
    shared: Shared,
    game_id: GameId,
    user_id: UserId,
    progress: Arc<watch::Sender<Progress>>,
    cancel: CancellationToken,
) {
    let url = shared.config.observer_url(game_id);
    let max_retries = shared.config.max_retries;
    let mut retries: u32 = 0;

    loop {
        if retries >= max_retries {
            error!(%game_id, attempts = retries, "Observer retry budget exhausted");
            progress.send_modify(|p| p.state = ConnectionState::Failed);
            return;
        }

        let attempt = retries.saturating_add(1);
        progress.send_modify(|p| p.state = ConnectionState::Connecting { attempt });
        debug!(%game_id, attempt, %url, "Connecting observer");

        let connected = tokio::select! {
            () = cancel.cancelled() => return,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((socket, _)) => {
                match watch_socket(&shared, game_id, &user_id, socket, &progress, &cancel).await {
                    SocketEnd::Cancelled => return,
                    SocketEnd::Closed { opened: true } => retries = 0,
                    SocketEnd::Closed { opened: false } => {}
                }
            }
            Err(e) => warn!(%game_id, attempt, error = %e, "Observer connection failed"),
        }

        let delay_ms = shared
            .config
            .retry_delay_ms
            .saturating_mul(u64::from(retries));
        retries = retries.saturating_add(1);
        if retries >= max_retries {
            continue;
        }

        progress.send_modify(|p| {
            p.state = ConnectionState::Backoff {
                attempt: retries,
            };
        });
        info!(%game_id, delay_ms, "Observer reconnect scheduled");
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
        }
    }
}

/// Subscribe on a freshly opened socket and pump it until it closes.
async fn watch_socket(
    shared: &Shared,
    game_id: GameId,
    user_id: &UserId,
    socket: ObserverSocket,
    progress: &watch::Sender<Progress>,
    cancel: &CancellationToken,
) -> SocketEnd {
    let (mut sink, mut stream) = socket.split();

    let subscribe = match encode(&ObserverPacket::RequestUpdates {
        player_id: user_id.clone(),
    }) {
        Ok(frame) => frame,
        Err(e) => {
            error!(%game_id, error = %e, "Failed to encode subscribe request");
            return SocketEnd::Closed { opened: false };
        }
    };
    if let Err(e) = sink.send(Message::Binary(subscribe)).await {
        warn!(%game_id, error = %e, "Subscribe request not delivered");
        return SocketEnd::Closed { opened: false };
    }

    progress.send_modify(|p| {
        p.state = ConnectionState::Open;
        p.opens = p.opens.saturating_add(1);
    });
    info!(%game_id, player = %user_id, "Observer connection open");

    loop {
        let message = tokio::select! {
            () = cancel.cancelled() => {
                if sink.send(Message::Close(None)).await.is_err() {
                    debug!(%game_id, "Close frame not delivered");
                }
                return SocketEnd::Cancelled;
            }
            message = stream.next() => message,
        };

        match message {
            Some(Ok(Message::Binary(frame))) => shared.handle_frame(game_id, &frame).await,
            Some(Ok(Message::Close(_))) | None => {
                info!(%game_id, "Observer connection closed");
                return SocketEnd::Closed { opened: true };
            }
            Some(Ok(Message::Text(_))) => debug!(%game_id, "Ignoring text frame"),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(%game_id, error = %e, "Observer socket error");
                return SocketEnd::Closed { opened: true };
            }
        }
    }
}
