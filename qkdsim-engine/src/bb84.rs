//! BB84 protocol engine: photon batch generation, channel transmission with
//! an optional intercept-resend eavesdropper, basis sifting, and error-rate
//! evaluation. Single-threaded and synchronous; callers drive the phases.
//!
//! # Example
//! ```
//! use qkdsim_engine::Bb84Simulator;
//!
//! let mut sim = Bb84Simulator::with_seed(7);
//! sim.generate_bits(64);
//! sim.transmit_and_measure(false);
//! let key = sim.sift_key();
//! let state = sim.complete();
//! assert_eq!(state.shared_key, key);
//! assert_eq!(state.error_rate, 0.0);
//! ```

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{
    Basis, HackerConfig, HackerConfigPatch, Phase, QuantumBit, SimulationState,
};

/// Logical gap between consecutive photon emissions, in milliseconds.
pub const EMISSION_INTERVAL_MS: u64 = 100;
/// Fixed channel propagation delay applied to every received photon.
pub const TRANSMISSION_DELAY_MS: u64 = 50;

/// Handle returned by [`Bb84Simulator::subscribe`]; removal is idempotent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriberId(u64);

type Observer = Box<dyn FnMut(SimulationState) + Send>;

/// One BB84 session. Owns its state, eavesdropper parameters, and RNG;
/// concurrent sessions each get their own instance, nothing is shared.
pub struct Bb84Simulator {
    state: SimulationState,
    hacker_config: HackerConfig,
    rng: ChaCha20Rng,
    observers: Vec<(SubscriberId, Observer)>,
    next_subscriber: u64,
}

impl Bb84Simulator {
    /// Engine seeded from ambient entropy; outcomes are not reproducible.
    pub fn new() -> Self {
        Self::from_rng(ChaCha20Rng::from_entropy())
    }

    /// Deterministic engine: identical seeds and call sequences reproduce
    /// identical bits, keys, and error rates.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: ChaCha20Rng) -> Self {
        let session_id = session_id(&mut rng, "QKD");
        Self {
            state: SimulationState::fresh(session_id),
            hacker_config: HackerConfig::default(),
            rng,
            observers: Vec::new(),
            next_subscriber: 0,
        }
    }

    /// Merge eavesdropper parameters; unspecified fields keep prior values.
    pub fn configure_hacker(&mut self, patch: HackerConfigPatch) {
        self.hacker_config.apply(patch);
    }

    /// Value copy of the current eavesdropper parameters.
    pub fn hacker_config(&self) -> HackerConfig {
        self.hacker_config
    }

    /// Draw a fresh batch of sender photons: value and basis uniform and
    /// independent per index, polarization derived, timestamps strictly
    /// increasing. Replaces any prior batch and advances to transmission.
    pub fn generate_bits(&mut self, count: usize) -> Vec<QuantumBit> {
        let base = now_ms();
        let mut bits = Vec::with_capacity(count);
        for i in 0..count {
            let value = self.coin_bit();
            let basis = self.coin_basis();
            bits.push(QuantumBit::new(
                format!("sender-{i}"),
                value,
                basis,
                base + (i as u64) * EMISSION_INTERVAL_MS,
            ));
        }

        self.state.sender_bits = bits.clone();
        self.state.phase = Phase::Transmission;
        self.state.start_time = base;
        self.notify();
        bits
    }

    /// Send the current sender batch through the channel and measure it at
    /// the receiver, with the intercept-resend eavesdropper in the middle
    /// when `hacker_present` is set.
    ///
    /// Each index is processed independently: interception decision, the
    /// eavesdropper's own-basis measurement (misread with her configured
    /// error rate), her resend (randomized with her resend error rate, in
    /// her basis), then the receiver's uniform basis draw. A matched basis
    /// reads the incoming photon exactly; a mismatch is a fair coin. The
    /// receiver adds no noise of his own.
    pub fn transmit_and_measure(&mut self, hacker_present: bool) -> Vec<QuantumBit> {
        let sender_bits = self.state.sender_bits.clone();
        let config = self.hacker_config;
        let mut receiver_bits = Vec::with_capacity(sender_bits.len());
        let mut intercepted_bits = Vec::new();

        for (index, sender_bit) in sender_bits.iter().enumerate() {
            let mut incoming_value = sender_bit.value;
            let mut incoming_basis = sender_bit.basis;

            if hacker_present && self.rng.gen::<f64>() < config.interception_rate {
                let hacker_basis = self.coin_basis();
                // Matched basis reads the true value; a mismatch collapses to
                // a fair coin. Either way her detector can still misread.
                let mut hacker_value = if hacker_basis == sender_bit.basis {
                    sender_bit.value
                } else {
                    self.coin_bit()
                };
                if self.rng.gen::<f64>() < config.measurement_error_rate {
                    hacker_value ^= 1;
                }

                intercepted_bits.push(QuantumBit::new(
                    format!("hacker-{index}"),
                    hacker_value,
                    hacker_basis,
                    sender_bit.timestamp,
                ));

                let resend_value = if self.rng.gen::<f64>() < config.resend_error_rate {
                    self.coin_bit()
                } else {
                    hacker_value
                };

                // The resent photon, not the original, travels onward.
                incoming_value = resend_value;
                incoming_basis = hacker_basis;
            }

            let receiver_basis = self.coin_basis();
            let receiver_value = if receiver_basis == incoming_basis {
                incoming_value
            } else {
                self.coin_bit()
            };

            receiver_bits.push(QuantumBit::new(
                format!("receiver-{index}"),
                receiver_value,
                receiver_basis,
                sender_bit.timestamp + TRANSMISSION_DELAY_MS,
            ));
        }

        self.state.receiver_bits = receiver_bits.clone();
        self.state.intercepted_bits = intercepted_bits;
        self.state.is_hacker_present = hacker_present;
        self.state.phase = Phase::Sifting;
        self.notify();
        receiver_bits
    }

    /// Keep only basis-matched positions as key material and derive the
    /// observed error rate from value disagreements among them. Positions
    /// without a receiver counterpart are skipped, so sifting before
    /// transmission yields an empty key and a 0% rate.
    pub fn sift_key(&mut self) -> String {
        let mut sifted = String::new();
        let mut errors = 0usize;
        let mut comparisons = 0usize;

        for (index, sender_bit) in self.state.sender_bits.iter().enumerate() {
            if let Some(receiver_bit) = self.state.receiver_bits.get(index) {
                if sender_bit.basis == receiver_bit.basis {
                    sifted.push(if sender_bit.value == 0 { '0' } else { '1' });
                    if sender_bit.value != receiver_bit.value {
                        errors += 1;
                    }
                    comparisons += 1;
                }
            }
        }

        self.state.error_rate = if comparisons > 0 {
            (errors as f64 / comparisons as f64) * 100.0
        } else {
            0.0
        };
        self.state.shared_key = sifted;
        self.state.phase = Phase::ErrorCheck;
        self.notify();
        self.state.shared_key.clone()
    }

    /// Close the session and return the final snapshot.
    pub fn complete(&mut self) -> SimulationState {
        self.state.phase = Phase::Complete;
        self.state.end_time = now_ms();
        self.notify();
        self.state.clone()
    }

    /// Discard all accumulated data and return to preparation under a fresh
    /// session id.
    pub fn reset(&mut self) {
        let session_id = session_id(&mut self.rng, "QKD");
        self.state = SimulationState::fresh(session_id);
        self.notify();
    }

    /// Register an observer; it receives a state clone after every mutating
    /// operation, synchronously and in registration order.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriberId
    where
        F: FnMut(SimulationState) + Send + 'static,
    {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.observers.retain(|(existing, _)| *existing != id);
    }

    /// Defensive snapshot copy, safe to retain.
    pub fn state(&self) -> SimulationState {
        self.state.clone()
    }

    fn notify(&mut self) {
        for (_, observer) in self.observers.iter_mut() {
            observer(self.state.clone());
        }
    }

    fn coin_bit(&mut self) -> u8 {
        u8::from(self.rng.gen_bool(0.5))
    }

    fn coin_basis(&mut self) -> Basis {
        if self.rng.gen_bool(0.5) {
            Basis::Rectilinear
        } else {
            Basis::Diagonal
        }
    }
}

impl std::fmt::Debug for Bb84Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bb84Simulator")
            .field("state", &self.state)
            .field("hacker_config", &self.hacker_config)
            .field("next_subscriber", &self.next_subscriber)
            .finish_non_exhaustive()
    }
}

impl Default for Bb84Simulator {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn session_id(rng: &mut ChaCha20Rng, prefix: &str) -> String {
    let mut tag = [0u8; 6];
    rng.fill_bytes(&mut tag);
    format!("{prefix}-{}", hex::encode(tag))
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}
