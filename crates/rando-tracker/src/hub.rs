//! The tracker hub: single fan-out point from the game to tracker clients.
//!
//! # Baseline before incremental
//!
//! A client must see `Reset` and a full snapshot before any incremental
//! update. Each client slot is therefore in one of two modes:
//!
//! - **Syncing** -- a snapshot is being fetched. Incremental updates are
//!   parked in the slot (latest value per tracking id).
//! - **Live** -- incremental updates go straight to the client's queue.
//!
//! A sync marks its target slots as syncing, reads every tracked value in
//! one batch, then, under the client lock, queues `Reset`, the snapshot,
//! the flags and finally the parked updates before flipping the slot to
//! live. Each sync carries a generation number so an older, slower sync
//! never lands on top of a newer one.
//!
//! If the batch read fails, clients that already had a baseline go back
//! to live with their parked updates replayed. Clients that never had
//! one keep parking until a later sync succeeds.
//!
//! Every client has its own bounded queue drained by its socket task,
//! so packets reach a client in the order the hub queued them and one
//! slow or dead client never holds up the others. A client whose queue
//! fills up is dropped; its socket closes once the backlog is written
//! and the tracker reconnects for a fresh baseline.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use rando_proto::{TrackerPacket, encode};
use rando_types::StateId;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::error::HubError;
use crate::registry::{TRACKED_STATES, TrackedStateDefinition, TrackedStateRegistry};
use crate::router::build_router;
use crate::server::{self, HubConfig};
use crate::source::{GameStateSource, SourceError, StateEvent};

/// Identifier the hub assigns to each connected tracker client.
pub type ClientId = u64;

/// Frames a client may have queued before it is dropped.
pub const CLIENT_QUEUE_CAPACITY: usize = 1024;

/// Work queued for one client's socket writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// An encoded packet frame.
    Frame(Bytes),
    /// Close the socket.
    Close,
}

/// Handle given to the socket task of a newly registered client.
#[derive(Debug)]
pub struct ClientSession {
    /// The client's id inside the hub.
    pub id: ClientId,
    /// Frames to write to the socket, in order.
    pub outbound: mpsc::Receiver<Outbound>,
}

/// Updates parked while a client waits for its baseline.
///
/// Holds at most one frame per tracking id; a newer value replaces the
/// older one and moves to the back.
#[derive(Debug, Default)]
struct PendingUpdates(Vec<(&'static str, Bytes)>);

impl PendingUpdates {
    fn push(&mut self, tracking_id: &'static str, frame: Bytes) {
        self.0.retain(|(id, _)| *id != tracking_id);
        self.0.push((tracking_id, frame));
    }
}

#[derive(Debug)]
enum SyncState {
    Syncing(PendingUpdates),
    Live,
}

/// A client queue is closed or full.
#[derive(Debug)]
struct ClientGone;

#[derive(Debug)]
struct ClientSlot {
    tx: mpsc::Sender<Outbound>,
    sync: SyncState,
    generation: u64,
    /// The client has received at least one full baseline.
    baselined: bool,
}

impl ClientSlot {
    fn new(tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            tx,
            sync: SyncState::Syncing(PendingUpdates::default()),
            generation: 0,
            baselined: false,
        }
    }

    /// Enter syncing mode and return the generation of this sync.
    fn begin_sync(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        if matches!(self.sync, SyncState::Live) {
            self.sync = SyncState::Syncing(PendingUpdates::default());
        }
        self.generation
    }

    /// Queue the baseline, replay parked updates and go live.
    ///
    /// Returns the number of replayed updates.
    fn finish_sync(&mut self, baseline: &[Bytes]) -> Result<usize, ClientGone> {
        for frame in baseline {
            self.send(frame.clone())?;
        }
        let parked = match std::mem::replace(&mut self.sync, SyncState::Live) {
            SyncState::Syncing(pending) => pending.0,
            SyncState::Live => Vec::new(),
        };
        let replayed = parked.len();
        for (_, frame) in parked {
            self.send(frame)?;
        }
        self.baselined = true;
        Ok(replayed)
    }

    /// Give up on a sync whose snapshot could not be read.
    ///
    /// A client that already holds a baseline goes live again with its
    /// parked updates; one that never had a baseline keeps parking.
    fn abandon_sync(&mut self) -> Result<usize, ClientGone> {
        if !self.baselined {
            return Ok(0);
        }
        self.finish_sync(&[])
    }

    fn send(&self, frame: Bytes) -> Result<(), ClientGone> {
        self.tx
            .try_send(Outbound::Frame(frame))
            .map_err(|_full_or_closed| ClientGone)
    }
}

/// The bound server task.
#[derive(Debug)]
struct ServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

/// Fans game state out to every connected tracker client.
///
/// Construct one per process and share it behind an [`Arc`]; the server
/// task and every socket task hold a clone.
pub struct TrackerHub<S> {
    config: HubConfig,
    source: Arc<S>,
    definitions: Vec<TrackedStateDefinition>,
    registry: RwLock<Arc<TrackedStateRegistry>>,
    clients: Mutex<BTreeMap<ClientId, ClientSlot>>,
    next_client_id: AtomicU64,
    server: Mutex<Option<ServerHandle>>,
    running: watch::Sender<bool>,
}

impl<S: GameStateSource> TrackerHub<S> {
    /// Create a hub tracking the standard [`TRACKED_STATES`].
    pub fn new(config: HubConfig, source: Arc<S>) -> Result<Self, HubError> {
        Self::with_definitions(config, source, TRACKED_STATES.iter().copied())
    }

    /// Create a hub tracking a custom definition list.
    pub fn with_definitions(
        config: HubConfig,
        source: Arc<S>,
        definitions: impl IntoIterator<Item = TrackedStateDefinition>,
    ) -> Result<Self, HubError> {
        let definitions: Vec<TrackedStateDefinition> = definitions.into_iter().collect();
        let registry = TrackedStateRegistry::new(definitions.iter().copied())?;
        let (running, _) = watch::channel(false);
        Ok(Self {
            config,
            source,
            definitions,
            registry: RwLock::new(Arc::new(registry)),
            clients: Mutex::new(BTreeMap::new()),
            next_client_id: AtomicU64::new(1),
            server: Mutex::new(None),
            running,
        })
    }

    /// The game state source this hub reads from.
    pub const fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// The hub configuration.
    pub const fn config(&self) -> &HubConfig {
        &self.config
    }

    /// The current registry.
    pub async fn registry(&self) -> Arc<TrackedStateRegistry> {
        Arc::clone(&*self.registry.read().await)
    }

    /// Rebuild the registry from the hub's definitions and swap it in.
    pub async fn rebuild_registry(&self) -> Result<usize, HubError> {
        let registry = TrackedStateRegistry::new(self.definitions.iter().copied())?;
        let tracked = registry.len();
        *self.registry.write().await = Arc::new(registry);
        Ok(tracked)
    }

    // -- lifecycle ---------------------------------------------------------

    /// Bind the tracker server and start accepting clients.
    ///
    /// Rebuilds the registry, then flips the running state to `true` once
    /// the socket is bound. Returns the bound address.
    ///
    /// # Errors
    ///
    /// [`HubError::Bind`] if the port is taken (no retry),
    /// [`HubError::AlreadyRunning`] if the server is already up.
    pub async fn start(self: &Arc<Self>) -> Result<SocketAddr, HubError> {
        let mut server = self.server.lock().await;
        if let Some(handle) = server.as_ref() {
            if !handle.task.is_finished() {
                return Err(HubError::AlreadyRunning(handle.addr));
            }
        }

        let tracked = self.rebuild_registry().await?;
        let listener = server::bind(&self.config).await?;
        let addr = listener.local_addr().map_err(|source| HubError::Bind {
            addr: self.config.socket_addr().to_string(),
            source,
        })?;
        let router = build_router(Arc::clone(self), self.config.debug_routes);

        self.running.send_replace(true);
        info!(%addr, tracked, "Tracker hub ready");

        let hub = Arc::clone(self);
        let task = tokio::spawn(async move {
            if let Err(e) = server::serve(listener, router).await {
                error!(error = %e, "Tracker server exited with error");
            }
            hub.running.send_replace(false);
        });

        *server = Some(ServerHandle { addr, task });
        Ok(addr)
    }

    /// Close every client socket, then the server.
    ///
    /// Queued frames that have not been written yet are dropped.
    pub async fn stop(&self) {
        let clients = {
            let mut clients = self.clients.lock().await;
            // Flipped under the client lock so a late registration sees it.
            self.running.send_replace(false);
            std::mem::take(&mut *clients)
        };
        for (client_id, slot) in clients {
            // A full queue still closes: dropping the sender ends the writer.
            if slot.tx.try_send(Outbound::Close).is_err() {
                debug!(client_id, "Client writer gone or backed up");
            }
        }

        let server = self.server.lock().await.take();
        if let Some(handle) = server {
            handle.task.abort();
        }
        info!("Tracker hub stopped");
    }

    /// Whether the server is bound and ready.
    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Watch ready / not-ready transitions.
    pub fn subscribe_running(&self) -> watch::Receiver<bool> {
        self.running.subscribe()
    }

    /// The bound address, or the configured one when not running.
    pub async fn local_addr(&self) -> SocketAddr {
        self.server
            .lock()
            .await
            .as_ref()
            .map_or_else(|| self.config.socket_addr(), |handle| handle.addr)
    }

    // -- clients -----------------------------------------------------------

    /// Register a new client. It starts out waiting for its baseline.
    ///
    /// While the hub is stopped the client is not registered and its
    /// queue holds a single [`Outbound::Close`].
    pub async fn register_client(&self) -> ClientSession {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, outbound) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
        let mut clients = self.clients.lock().await;
        if !self.is_running() {
            drop(clients);
            if tx.try_send(Outbound::Close).is_err() {
                debug!(client_id = id, "Close not queued");
            }
            debug!(client_id = id, "Tracker client refused, hub stopped");
            return ClientSession { id, outbound };
        }
        clients.insert(id, ClientSlot::new(tx));
        info!(client_id = id, clients = clients.len(), "Tracker client connected");
        ClientSession { id, outbound }
    }

    /// Forget a client.
    pub async fn disconnect_client(&self, id: ClientId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(&id).is_some() {
            info!(client_id = id, clients = clients.len(), "Tracker client disconnected");
        }
    }

    /// Number of registered clients.
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Send the connect-time baseline to a registered client:
    /// `Reset`, one update per tracked state, then the seed flags.
    ///
    /// # Errors
    ///
    /// [`HubError::SourceUnavailable`] if the snapshot could not be read.
    /// The client stays registered and keeps parking updates until a
    /// later sync succeeds.
    pub async fn on_client_connected(&self, id: ClientId) -> Result<(), HubError> {
        self.sync_clients(&[id]).await
    }

    /// Replay the baseline to every connected client.
    ///
    /// Returns the number of clients that were resynchronized.
    pub async fn refresh_all(&self) -> Result<usize, HubError> {
        let targets: Vec<ClientId> = self.clients.lock().await.keys().copied().collect();
        self.sync_clients(&targets).await?;
        Ok(targets.len())
    }

    async fn sync_clients(&self, targets: &[ClientId]) -> Result<(), HubError> {
        let generations: Vec<(ClientId, u64)> = {
            let mut clients = self.clients.lock().await;
            targets
                .iter()
                .filter_map(|id| clients.get_mut(id).map(|slot| (*id, slot.begin_sync())))
                .collect()
        };
        if generations.is_empty() {
            return Ok(());
        }

        let registry = self.registry().await;
        let baseline = match self.baseline_frames(&registry).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(clients = generations.len(), error = %e, "Baseline unavailable");
                self.abandon_sync(generations).await;
                return Err(e);
            }
        };

        let mut clients = self.clients.lock().await;
        let mut gone = Vec::new();
        for (client_id, generation) in generations {
            let Some(slot) = clients.get_mut(&client_id) else {
                continue;
            };
            if slot.generation != generation {
                debug!(client_id, "Baseline superseded by a newer sync");
                continue;
            }
            match slot.finish_sync(&baseline) {
                Ok(replayed) => debug!(
                    client_id,
                    tracked = registry.len(),
                    replayed,
                    "Baseline sent"
                ),
                Err(ClientGone) => gone.push(client_id),
            }
        }
        for client_id in gone {
            debug!(client_id, "Dropping client during baseline (queue closed or full)");
            clients.remove(&client_id);
        }
        Ok(())
    }

    /// Put previously live clients back on the live path after a failed
    /// snapshot read.
    async fn abandon_sync(&self, generations: Vec<(ClientId, u64)>) {
        let mut clients = self.clients.lock().await;
        let mut gone = Vec::new();
        for (client_id, generation) in generations {
            let Some(slot) = clients.get_mut(&client_id) else {
                continue;
            };
            if slot.generation != generation {
                continue;
            }
            match slot.abandon_sync() {
                Ok(replayed) if slot.baselined => {
                    debug!(client_id, replayed, "Kept previous baseline");
                }
                Ok(_) => {}
                Err(ClientGone) => gone.push(client_id),
            }
        }
        for client_id in gone {
            debug!(client_id, "Dropping client (queue closed or full)");
            clients.remove(&client_id);
        }
    }

    /// Encode `Reset`, the snapshot and the flags from one batch read.
    async fn baseline_frames(
        &self,
        registry: &TrackedStateRegistry,
    ) -> Result<Vec<Bytes>, HubError> {
        let ids = registry.state_ids();
        let values = self.source.get_values(&ids).await?;
        if values.len() != ids.len() {
            return Err(SourceError::BatchMismatch {
                requested: ids.len(),
                returned: values.len(),
            }
            .into());
        }
        let flags = self.source.get_flags().await?;

        let mut frames = Vec::with_capacity(ids.len().saturating_add(2));
        frames.push(encode(&TrackerPacket::Reset)?);
        for (definition, raw) in registry.definitions().iter().zip(values) {
            frames.push(encode(&TrackerPacket::Update(definition.tracker_update(raw)))?);
        }
        frames.push(encode(&TrackerPacket::Flags(flags))?);
        Ok(frames)
    }

    // -- state changes -----------------------------------------------------

    /// Forward a raw state change to every client.
    ///
    /// Untracked states are dropped. Returns how many live clients the
    /// update was queued for; clients still waiting for their baseline
    /// park it instead.
    pub async fn on_game_state_changed(&self, id: StateId, raw: i64) -> usize {
        let registry = self.registry().await;
        let Some(definition) = registry.lookup(id) else {
            trace!(state = %id, "Untracked state ignored");
            return 0;
        };

        let update = definition.tracker_update(raw);
        let frame = match encode(&TrackerPacket::Update(update)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(state = %id, error = %e, "Failed to encode tracker update");
                return 0;
            }
        };

        let mut clients = self.clients.lock().await;
        let mut delivered: usize = 0;
        let mut gone = Vec::new();
        for (&client_id, slot) in clients.iter_mut() {
            match &mut slot.sync {
                SyncState::Live => {
                    if slot.send(frame.clone()).is_ok() {
                        delivered = delivered.saturating_add(1);
                    } else {
                        gone.push(client_id);
                    }
                }
                SyncState::Syncing(pending) => pending.push(definition.tracking_id, frame.clone()),
            }
        }
        for client_id in gone {
            debug!(client_id, "Dropping client (queue closed or full)");
            clients.remove(&client_id);
        }

        trace!(tracking_id = definition.tracking_id, raw, delivered, "Tracker update sent");
        delivered
    }

    /// Write a tracked value back to the game by its tracking id.
    ///
    /// Debug hook; the change comes back through the normal update path.
    pub async fn debug_set_state(&self, tracking_id: &str, value: i64) -> Result<StateId, HubError> {
        let registry = self.registry().await;
        let definition = registry
            .find_by_tracking_id(tracking_id)
            .ok_or_else(|| HubError::UnknownTrackingId(tracking_id.to_owned()))?;
        self.source.set_value(definition.id, value).await?;
        info!(tracking_id, state = %definition.id, value, "Debug state written");
        Ok(definition.id)
    }

    /// Pump a source's event stream into the hub.
    ///
    /// Changes are forwarded; a reconnect or a lagged receiver triggers a
    /// full refresh. The task ends when the stream closes.
    pub fn follow(self: &Arc<Self>, mut events: broadcast::Receiver<StateEvent>) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(StateEvent::Changed { id, value }) => {
                        hub.on_game_state_changed(id, value).await;
                    }
                    Ok(StateEvent::Reconnected) => {
                        info!("Game state source reconnected, refreshing trackers");
                        hub.refresh_logged().await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "State events lagged, refreshing trackers");
                        hub.refresh_logged().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("State event stream closed");
                        return;
                    }
                }
            }
        })
    }

    async fn refresh_logged(&self) {
        match self.refresh_all().await {
            Ok(clients) => debug!(clients, "Trackers refreshed"),
            Err(e) => warn!(error = %e, "Tracker refresh failed"),
        }
    }
}
