//! Simulation engine for quantum key distribution protocols.
//!
//! Two honest parties exchange polarization-encoded bits over a simulated
//! quantum channel, optionally intercepted by an eavesdropper running an
//! intercept-resend attack, then sift their keys and compare error rates to
//! decide whether the channel was compromised. The engine is synchronous and
//! single-threaded: an external driver (CLI, test harness, transport
//! wrapper) invokes the phase operations in order and receives state
//! snapshots through the observer registry.
//!
//! [`bb84`] is the reference protocol with a noise-free receiver; [`sarg04`]
//! adds a configurable channel noise model on the same phase machine.

pub mod analysis;
pub mod bb84;
pub mod models;
pub mod sarg04;
pub mod session;

pub use analysis::{
    analyze_channel, eavesdropping_detected, format_binary_key, ChannelAnalysis,
    INTERCEPT_REFERENCE_ERROR_RATE, SECURE_ERROR_THRESHOLD,
};
pub use bb84::{Bb84Simulator, SubscriberId};
pub use models::{
    Basis, HackerConfig, HackerConfigPatch, NoiseModel, Phase, QuantumBit, SimulationState,
};
pub use sarg04::Sarg04Simulator;
pub use session::{SessionError, SessionRegistry};
