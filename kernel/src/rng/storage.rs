//! Phase-gated registry of named random streams
//!
//! # Lifecycle
//!
//! ```text
//! Open ──freeze()──▶ Frozen
//!  register/deregister    get/require
//! ```
//!
//! The owning controller freezes the registry right after the model's setup
//! returns. Freezing happens before any replication starts, which is what
//! makes lock-free reads afterwards safe.

use super::RandomStream;
use crate::error::{LifecycleError, SimulationError};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Registry phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePhase {
    /// Registration allowed, reads forbidden
    Open,
    /// Reads allowed, registration forbidden
    Frozen,
}

/// Named random streams shared by every replication of a controller
///
/// # Example
/// ```
/// use des_kernel::rng::{RandomStorage, RandomStream, XorShiftStream};
///
/// let mut storage = RandomStorage::new();
/// storage.register("arrivals", XorShiftStream::new(7)).unwrap();
/// assert!(storage.get("arrivals").is_err()); // still open
///
/// storage.freeze().unwrap();
/// let draw = storage.get("arrivals").unwrap().unwrap().next_f64();
/// assert!((0.0..1.0).contains(&draw));
/// assert!(storage.get("missing").unwrap().is_none());
/// ```
pub struct RandomStorage {
    streams: BTreeMap<String, Box<dyn RandomStream>>,
    phase: StoragePhase,
}

impl RandomStorage {
    /// Create an empty, open registry
    pub fn new() -> Self {
        Self {
            streams: BTreeMap::new(),
            phase: StoragePhase::Open,
        }
    }

    /// Register `stream` under `key`, replacing any stream already there
    ///
    /// # Errors
    /// `AlreadyInitialized` once the registry is frozen; nothing is stored.
    pub fn register<R>(&mut self, key: impl Into<String>, stream: R) -> Result<(), LifecycleError>
    where
        R: RandomStream + 'static,
    {
        self.ensure_open()?;
        let key = key.into();
        debug!(key = %key, "Registered random stream");
        self.streams.insert(key, Box::new(stream));
        Ok(())
    }

    /// Remove and return the stream under `key`
    ///
    /// # Errors
    /// `AlreadyInitialized` once the registry is frozen; nothing is removed.
    pub fn deregister(&mut self, key: &str) -> Result<Option<Box<dyn RandomStream>>, LifecycleError> {
        self.ensure_open()?;
        Ok(self.streams.remove(key))
    }

    /// Stream registered under `key`, or `None` for unknown keys
    ///
    /// # Errors
    /// `NotYetInitialized` while the registry is still open.
    pub fn get(&mut self, key: &str) -> Result<Option<&mut dyn RandomStream>, LifecycleError> {
        if self.phase == StoragePhase::Open {
            return Err(LifecycleError::NotYetInitialized);
        }
        Ok(self.streams.get_mut(key).map(|stream| stream.as_mut() as &mut dyn RandomStream))
    }

    /// Like [`get`](Self::get), but an unknown key is an error
    pub fn require(&mut self, key: &str) -> Result<&mut dyn RandomStream, SimulationError> {
        self.get(key)?
            .ok_or_else(|| SimulationError::UnknownStream(key.to_string()))
    }

    /// Close the registry to changes and open it for reads
    ///
    /// # Errors
    /// `AlreadyInitialized` if the registry was frozen before.
    pub fn freeze(&mut self) -> Result<(), LifecycleError> {
        self.ensure_open()?;
        self.phase = StoragePhase::Frozen;
        debug!(streams = self.streams.len(), "Random storage frozen");
        Ok(())
    }

    pub fn phase(&self) -> StoragePhase {
        self.phase
    }

    pub fn is_frozen(&self) -> bool {
        self.phase == StoragePhase::Frozen
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.streams.contains_key(key)
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    fn ensure_open(&self) -> Result<(), LifecycleError> {
        match self.phase {
            StoragePhase::Open => Ok(()),
            StoragePhase::Frozen => Err(LifecycleError::AlreadyInitialized),
        }
    }
}

impl Default for RandomStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomStorage")
            .field("keys", &self.streams.keys().collect::<Vec<_>>())
            .field("phase", &self.phase)
            .finish()
    }
}
