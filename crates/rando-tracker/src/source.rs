//! The game state source contract and an in-memory implementation.
//!
//! The hub never talks to the game process directly. It reads values,
//! writes debug values and queries seed flags through a
//! [`GameStateSource`], and learns about changes through a stream of
//! [`StateEvent`]s (see [`TrackerHub::follow`](crate::hub::TrackerHub::follow)).
//!
//! [`MemorySource`] keeps everything in memory. It stands in for the game
//! when testing trackers or running without a game process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use rando_types::StateId;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::debug;

/// Capacity of the [`MemorySource`] event channel.
const EVENT_CAPACITY: usize = 1024;

/// Errors reported by a game state source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The game process cannot be reached.
    #[error("game state source unavailable: {0}")]
    Unavailable(String),

    /// A batch read returned the wrong number of values.
    #[error("batch read returned {returned} values for {requested} ids")]
    BatchMismatch {
        /// Number of ids asked for.
        requested: usize,
        /// Number of values returned.
        returned: usize,
    },
}

/// Change notifications emitted by a game state source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// An uber state changed to a new raw value.
    Changed {
        /// The state that changed.
        id: StateId,
        /// Its new raw value.
        value: i64,
    },
    /// The source re-established its link to the game; cached views
    /// should be rebuilt.
    Reconnected,
}

/// Read/write access to the running game's state.
pub trait GameStateSource: Send + Sync + 'static {
    /// Read the current raw values of `ids` in one batch.
    ///
    /// The result is index-aligned with `ids`.
    fn get_values(
        &self,
        ids: &[StateId],
    ) -> impl Future<Output = Result<Vec<i64>, SourceError>> + Send;

    /// Overwrite a raw value.
    fn set_value(
        &self,
        id: StateId,
        value: i64,
    ) -> impl Future<Output = Result<(), SourceError>> + Send;

    /// Flags of the currently loaded seed.
    fn get_flags(&self) -> impl Future<Output = Result<Vec<String>, SourceError>> + Send;

    /// Best-effort command to the game process. `false` if unreachable.
    fn try_send(&self, command: &str) -> impl Future<Output = bool> + Send;
}

/// In-memory [`GameStateSource`].
///
/// Unset states read as `0`. Writes through [`GameStateSource::set_value`]
/// are echoed as [`StateEvent::Changed`], the same way the game reports a
/// value it was told to change.
#[derive(Debug)]
pub struct MemorySource {
    values: RwLock<HashMap<StateId, i64>>,
    flags: RwLock<Vec<String>>,
    commands: Mutex<Vec<String>>,
    available: AtomicBool,
    events: broadcast::Sender<StateEvent>,
}

impl MemorySource {
    /// Create an empty, available source.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            values: RwLock::new(HashMap::new()),
            flags: RwLock::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            events,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    /// Record a change made by the game and notify subscribers.
    pub async fn apply_change(&self, id: StateId, value: i64) {
        self.values.write().await.insert(id, value);
        self.publish(StateEvent::Changed { id, value });
    }

    /// Replace the seed flags.
    pub async fn set_flags(&self, flags: Vec<String>) {
        *self.flags.write().await = flags;
    }

    /// Simulate the game going away or coming back.
    ///
    /// Coming back publishes [`StateEvent::Reconnected`].
    pub fn set_available(&self, available: bool) {
        let was = self.available.swap(available, Ordering::AcqRel);
        if available && !was {
            self.publish(StateEvent::Reconnected);
        }
    }

    /// Whether the source currently answers queries.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Commands accepted by [`GameStateSource::try_send`], oldest first.
    pub async fn commands(&self) -> Vec<String> {
        self.commands.lock().await.clone()
    }

    fn publish(&self, event: StateEvent) {
        // Err only means nobody is subscribed.
        let receivers = self.events.send(event).unwrap_or(0);
        debug!(?event, receivers, "State event published");
    }

    fn ensure_available(&self) -> Result<(), SourceError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(SourceError::Unavailable(String::from(
                "in-memory source switched off",
            )))
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStateSource for MemorySource {
    async fn get_values(&self, ids: &[StateId]) -> Result<Vec<i64>, SourceError> {
        self.ensure_available()?;
        let values = self.values.read().await;
        Ok(ids
            .iter()
            .map(|id| values.get(id).copied().unwrap_or(0))
            .collect())
    }

    async fn set_value(&self, id: StateId, value: i64) -> Result<(), SourceError> {
        self.ensure_available()?;
        self.apply_change(id, value).await;
        Ok(())
    }

    async fn get_flags(&self) -> Result<Vec<String>, SourceError> {
        self.ensure_available()?;
        Ok(self.flags.read().await.clone())
    }

    async fn try_send(&self, command: &str) -> bool {
        if !self.is_available() {
            return false;
        }
        self.commands.lock().await.push(command.to_owned());
        true
    }
}
