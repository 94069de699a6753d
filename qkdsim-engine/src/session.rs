//! In-process registry of independent BB84 sessions, the seam a transport
//! wrapper or multi-round driver builds on. Sessions share nothing; each
//! holds its own engine, state, and RNG.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::bb84::Bb84Simulator;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} already exists")]
    SessionExists(String),
    #[error("session {0} not found")]
    SessionNotFound(String),
}

/// Named collection of [`Bb84Simulator`] instances.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<String, Bb84Simulator>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session under `name`, seeded deterministically when a seed
    /// is given. Names must be unique.
    pub fn create(
        &mut self,
        name: &str,
        seed: Option<u64>,
    ) -> Result<&mut Bb84Simulator, SessionError> {
        if self.sessions.contains_key(name) {
            return Err(SessionError::SessionExists(name.to_owned()));
        }
        let simulator = match seed {
            Some(seed) => Bb84Simulator::with_seed(seed),
            None => Bb84Simulator::new(),
        };
        Ok(self.sessions.entry(name.to_owned()).or_insert(simulator))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Bb84Simulator, SessionError> {
        self.sessions
            .get_mut(name)
            .ok_or_else(|| SessionError::SessionNotFound(name.to_owned()))
    }

    /// Remove and return a session, tearing down its observers with it.
    pub fn remove(&mut self, name: &str) -> Result<Bb84Simulator, SessionError> {
        self.sessions
            .remove(name)
            .ok_or_else(|| SessionError::SessionNotFound(name.to_owned()))
    }

    pub fn names(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
