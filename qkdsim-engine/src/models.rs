//! Shared data model for the QKD simulators: photon records, eavesdropper
//! parameters, channel noise knobs, and the per-session state aggregate.

use serde::{Deserialize, Serialize};

/// Measurement basis for a polarization-encoded photon.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Basis {
    /// The `+` basis: 0 deg / 90 deg.
    Rectilinear,
    /// The `x` basis: 45 deg / 135 deg.
    Diagonal,
}

impl Basis {
    /// Polarization angle (degrees) carried by a photon encoding `value` in
    /// this basis. This is the single source of the (basis, value) mapping;
    /// every constructed bit derives its angle from here.
    pub fn polarization(self, value: u8) -> u16 {
        match (self, value) {
            (Basis::Rectilinear, 0) => 0,
            (Basis::Rectilinear, _) => 90,
            (Basis::Diagonal, 0) => 45,
            (Basis::Diagonal, _) => 135,
        }
    }
}

/// Protocol phase. Strict forward sequence; `reset` is the only way back.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Preparation,
    Transmission,
    Sifting,
    ErrorCheck,
    Complete,
}

/// A single simulated photon measurement event.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuantumBit {
    /// Role-scoped identifier, e.g. `sender-17` or `hacker-3`.
    pub id: String,
    /// The encoded bit, 0 or 1.
    pub value: u8,
    pub basis: Basis,
    /// Derived angle in degrees; always `basis.polarization(value)` except
    /// where a noise model drifts it.
    pub polarization: u16,
    /// Logical emission order in milliseconds, monotonic within a batch.
    pub timestamp: u64,
}

impl QuantumBit {
    /// Build a photon record with the polarization derived from the
    /// (basis, value) pair, upholding the mapping invariant.
    pub fn new(id: String, value: u8, basis: Basis, timestamp: u64) -> Self {
        Self {
            id,
            value,
            basis,
            polarization: basis.polarization(value),
            timestamp,
        }
    }
}

/// Intercept-resend eavesdropper parameters. All probabilities in [0, 1];
/// the engine does not validate them (see the lab config boundary for that).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct HackerConfig {
    /// Probability the eavesdropper acts on a given photon at all.
    pub interception_rate: f64,
    /// Probability her measurement misreads the bit, even on a matched basis.
    pub measurement_error_rate: f64,
    /// Probability her resent photon carries a randomized value.
    pub resend_error_rate: f64,
}

impl Default for HackerConfig {
    fn default() -> Self {
        Self {
            interception_rate: 0.5,
            measurement_error_rate: 0.1,
            resend_error_rate: 0.1,
        }
    }
}

impl HackerConfig {
    /// Merge a partial update; unspecified fields retain their prior values.
    pub fn apply(&mut self, patch: HackerConfigPatch) {
        if let Some(rate) = patch.interception_rate {
            self.interception_rate = rate;
        }
        if let Some(rate) = patch.measurement_error_rate {
            self.measurement_error_rate = rate;
        }
        if let Some(rate) = patch.resend_error_rate {
            self.resend_error_rate = rate;
        }
    }
}

/// Partial [`HackerConfig`] update.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct HackerConfigPatch {
    pub interception_rate: Option<f64>,
    pub measurement_error_rate: Option<f64>,
    pub resend_error_rate: Option<f64>,
}

/// Channel and detector noise knobs, consumed by the SARG04 variant only.
/// The BB84 engine stays noise-free on the receiver side so its observed
/// error rate remains calibrated against the 12.5% intercept reference.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct NoiseModel {
    /// Probability the receiver's detector fires correctly.
    pub detector_efficiency: f64,
    /// Probability of a spurious detection with no incoming photon.
    pub dark_count_rate: f64,
    /// Polarization drift in degrees per emitted photon.
    pub polarization_drift: f64,
    /// Probability a photon is lost in the channel.
    pub loss_probability: f64,
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self {
            detector_efficiency: 1.0,
            dark_count_rate: 0.0,
            polarization_drift: 0.0,
            loss_probability: 0.0,
        }
    }
}

/// Aggregate session snapshot. The engine owns the live instance; observers
/// and callers only ever receive clones.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationState {
    pub sender_bits: Vec<QuantumBit>,
    pub receiver_bits: Vec<QuantumBit>,
    /// The eavesdropper's recorded measurements; empty when she is absent.
    pub intercepted_bits: Vec<QuantumBit>,
    /// Sifted key as a string of '0'/'1' characters.
    pub shared_key: String,
    /// Observed error rate in percent, meaningful once sifting has run.
    pub error_rate: f64,
    pub is_hacker_present: bool,
    pub phase: Phase,
    pub session_id: String,
    pub start_time: u64,
    pub end_time: u64,
}

impl SimulationState {
    /// Fresh state in the preparation phase under the given session id.
    pub fn fresh(session_id: String) -> Self {
        Self {
            sender_bits: Vec::new(),
            receiver_bits: Vec::new(),
            intercepted_bits: Vec::new(),
            shared_key: String::new(),
            error_rate: 0.0,
            is_hacker_present: false,
            phase: Phase::Preparation,
            session_id,
            start_time: 0,
            end_time: 0,
        }
    }
}
