//! SARG04 protocol variant. Same four-state encoding and phase machine as
//! BB84, but the channel carries a configurable [`NoiseModel`]: photon loss,
//! detector dark counts, polarization drift, detector inefficiency, and a
//! small intrinsic receiver misread. The noisy channel lives here so the
//! BB84 engine's error rate stays calibrated against its clean reference.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::bb84::{now_ms, session_id, EMISSION_INTERVAL_MS, TRANSMISSION_DELAY_MS};
use crate::models::{
    Basis, HackerConfig, HackerConfigPatch, NoiseModel, Phase, QuantumBit, SimulationState,
};

/// Probability the receiver's detector misreads even a clean photon.
const INTRINSIC_FLIP_RATE: f64 = 0.01;

/// One SARG04 session with a noisy channel model.
pub struct Sarg04Simulator {
    state: SimulationState,
    hacker_config: HackerConfig,
    noise_model: NoiseModel,
    rng: ChaCha20Rng,
}

impl Sarg04Simulator {
    pub fn new() -> Self {
        Self::from_rng(ChaCha20Rng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: ChaCha20Rng) -> Self {
        let session_id = session_id(&mut rng, "SARG04");
        Self {
            state: SimulationState::fresh(session_id),
            hacker_config: HackerConfig::default(),
            noise_model: NoiseModel::default(),
            rng,
        }
    }

    /// Replace the channel noise parameters.
    pub fn configure_noise(&mut self, noise_model: NoiseModel) {
        self.noise_model = noise_model;
    }

    pub fn noise_model(&self) -> NoiseModel {
        self.noise_model
    }

    /// Merge eavesdropper parameters, as in the BB84 engine.
    pub fn configure_hacker(&mut self, patch: HackerConfigPatch) {
        self.hacker_config.apply(patch);
    }

    pub fn hacker_config(&self) -> HackerConfig {
        self.hacker_config
    }

    /// Draw a sender batch. Polarization drift accumulates with the emission
    /// index, modeling a slowly rotating optical path.
    pub fn generate_bits(&mut self, count: usize) -> Vec<QuantumBit> {
        let base = now_ms();
        let drift = self.noise_model.polarization_drift;
        let mut bits = Vec::with_capacity(count);
        for i in 0..count {
            let value = self.coin_bit();
            let basis = self.coin_basis();
            let mut bit = QuantumBit::new(
                format!("sender-{i}"),
                value,
                basis,
                base + (i as u64) * EMISSION_INTERVAL_MS,
            );
            if drift != 0.0 {
                bit.polarization =
                    ((bit.polarization as f64 + drift * i as f64).round() as u16) % 180;
            }
            bits.push(bit);
        }

        self.state.sender_bits = bits.clone();
        self.state.phase = Phase::Transmission;
        self.state.start_time = base;
        bits
    }

    /// Transmit through the noisy channel. Loss and dark counts preempt the
    /// measurement entirely; otherwise the intercept-resend pipeline and the
    /// receiver's basis draw run as in BB84, with detector inefficiency and
    /// the intrinsic misread layered on top.
    pub fn transmit_and_measure(&mut self, hacker_present: bool) -> Vec<QuantumBit> {
        let sender_bits = self.state.sender_bits.clone();
        let config = self.hacker_config;
        let noise = self.noise_model;
        let mut receiver_bits = Vec::with_capacity(sender_bits.len());
        let mut intercepted_bits = Vec::new();

        for (index, sender_bit) in sender_bits.iter().enumerate() {
            if self.rng.gen::<f64>() < noise.loss_probability {
                // Lost in the channel; the receiver records a blank detection.
                receiver_bits.push(QuantumBit::new(
                    format!("receiver-{index}"),
                    0,
                    Basis::Rectilinear,
                    sender_bit.timestamp + TRANSMISSION_DELAY_MS,
                ));
                continue;
            }

            if self.rng.gen::<f64>() < noise.dark_count_rate {
                // Spurious click with no incoming photon.
                let dark_basis = self.coin_basis();
                let dark_value = self.coin_bit();
                receiver_bits.push(QuantumBit::new(
                    format!("receiver-{index}"),
                    dark_value,
                    dark_basis,
                    sender_bit.timestamp + TRANSMISSION_DELAY_MS,
                ));
                continue;
            }

            let mut incoming_value = sender_bit.value;
            let mut incoming_basis = sender_bit.basis;

            if hacker_present && self.rng.gen::<f64>() < config.interception_rate {
                let hacker_basis = self.coin_basis();
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
                incoming_value = resend_value;
                incoming_basis = hacker_basis;
            }

            let receiver_basis = self.coin_basis();
            let mut receiver_value = if self.rng.gen::<f64>() > noise.detector_efficiency {
                // Detector failed to resolve the photon; the click is random.
                self.coin_bit()
            } else if receiver_basis == incoming_basis {
                incoming_value
            } else {
                self.coin_bit()
            };
            if self.rng.gen::<f64>() < INTRINSIC_FLIP_RATE {
                receiver_value ^= 1;
            }

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
        receiver_bits
    }

    /// Basis sifting, identical in shape to BB84: the receiver announces his
    /// bases, matched positions become key material, mismatches are dropped.
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
        self.state.shared_key.clone()
    }

    pub fn complete(&mut self) -> SimulationState {
        self.state.phase = Phase::Complete;
        self.state.end_time = now_ms();
        self.state.clone()
    }

    pub fn reset(&mut self) {
        let session_id = session_id(&mut self.rng, "SARG04");
        self.state = SimulationState::fresh(session_id);
    }

    pub fn state(&self) -> SimulationState {
        self.state.clone()
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

impl Default for Sarg04Simulator {
    fn default() -> Self {
        Self::new()
    }
}
