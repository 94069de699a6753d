//! Campaign driver: runs full protocol rounds against engine sessions,
//! records telemetry, and classifies each round as secure or compromised.
//!
//! # Example
//! ```
//! use qkdsim_lab::config::Config;
//! use qkdsim_lab::service::{LabService, Verdict};
//! use qkdsim_telemetry::TelemetryHandle;
//!
//! let mut cfg = Config::sample();
//! cfg.lab.seed = Some(7);
//! let telemetry = TelemetryHandle::from_config(cfg.telemetry.clone());
//! let mut service = LabService::new(cfg, telemetry);
//! let report = service.run_round(false).unwrap();
//! assert_eq!(report.verdict, Verdict::Secure);
//! ```

use std::fmt;
use std::time::Instant;

use qkdsim_engine::{
    analyze_channel, eavesdropping_detected, HackerConfig, HackerConfigPatch, Sarg04Simulator,
    SessionError, SessionRegistry, SimulationState,
};
use qkdsim_telemetry::{TelemetryError, TelemetryHandle};
use thiserror::Error;

use crate::config::{Config, Protocol};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Secure,
    Compromised,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Secure => write!(f, "secure"),
            Verdict::Compromised => write!(f, "COMPROMISED"),
        }
    }
}

/// Outcome of one protocol round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundReport {
    pub session_id: String,
    pub protocol: Protocol,
    pub photon_count: usize,
    pub sifted_key: String,
    /// Observed error rate in percent.
    pub error_rate: f64,
    pub basis_matching_rate: f64,
    pub theoretical_error_rate: f64,
    pub verdict: Verdict,
}

pub struct LabService {
    config: Config,
    telemetry: TelemetryHandle,
    registry: SessionRegistry,
    rounds_completed: u64,
}

impl LabService {
    pub fn new(config: Config, telemetry: TelemetryHandle) -> Self {
        Self {
            config,
            telemetry,
            registry: SessionRegistry::new(),
            rounds_completed: 0,
        }
    }

    /// Run one round: generate, transmit, sift, complete. A dry run stops
    /// after photon generation, leaving the channel untouched.
    pub fn run_round(&mut self, dry_run: bool) -> Result<RoundReport, ServiceError> {
        let round = self.rounds_completed;
        self.rounds_completed += 1;

        let count = self.config.lab.photon_count;
        let hacker_present = self.config.lab.hacker_present;
        // Offset the base seed per round so sessions stay deterministic
        // without replaying each other bit for bit.
        let seed = self.config.lab.seed.map(|seed| seed.wrapping_add(round));
        let patch = full_patch(self.config.hacker);

        let started = Instant::now();
        let state = match self.config.lab.protocol {
            Protocol::Bb84 => {
                let session = self.registry.create(&format!("round-{round}"), seed)?;
                session.configure_hacker(patch);
                session.generate_bits(count);
                if dry_run {
                    session.state()
                } else {
                    session.transmit_and_measure(hacker_present);
                    session.sift_key();
                    session.complete()
                }
            }
            Protocol::Sarg04 => {
                let mut session = match seed {
                    Some(seed) => Sarg04Simulator::with_seed(seed),
                    None => Sarg04Simulator::new(),
                };
                session.configure_hacker(patch);
                session.configure_noise(self.config.noise);
                session.generate_bits(count);
                if dry_run {
                    session.state()
                } else {
                    session.transmit_and_measure(hacker_present);
                    session.sift_key();
                    session.complete()
                }
            }
        };

        if dry_run {
            self.telemetry.record_counter("lab.dry-run", 1)?;
        } else {
            self.telemetry.record_counter("lab.rounds", 1)?;
            self.telemetry.record_gauge("lab.qber", state.error_rate);
            self.telemetry
                .record_latency_ms("lab.round-ms", started.elapsed().as_millis() as u64);
        }

        Ok(report_from(&state, self.config.lab.protocol, count))
    }

    /// Sessions retained from completed BB84 rounds.
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }
}

fn full_patch(config: HackerConfig) -> HackerConfigPatch {
    HackerConfigPatch {
        interception_rate: Some(config.interception_rate),
        measurement_error_rate: Some(config.measurement_error_rate),
        resend_error_rate: Some(config.resend_error_rate),
    }
}

fn report_from(state: &SimulationState, protocol: Protocol, photon_count: usize) -> RoundReport {
    let analysis = analyze_channel(state);
    let verdict = if eavesdropping_detected(state.error_rate) {
        Verdict::Compromised
    } else {
        Verdict::Secure
    };
    RoundReport {
        session_id: state.session_id.clone(),
        protocol,
        photon_count,
        sifted_key: state.shared_key.clone(),
        error_rate: state.error_rate,
        basis_matching_rate: analysis.basis_matching_rate,
        theoretical_error_rate: analysis.theoretical_error_rate,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn service(mutate: impl FnOnce(&mut Config)) -> (LabService, TelemetryHandle) {
        let mut config = Config::sample();
        config.lab.seed = Some(99);
        config.lab.photon_count = 2_000;
        mutate(&mut config);
        let telemetry = TelemetryHandle::from_config(config.telemetry.clone());
        (LabService::new(config, telemetry.clone()), telemetry)
    }

    #[test]
    fn clean_round_is_secure_and_instrumented() {
        let (mut service, telemetry) = service(|_| {});
        let report = service.run_round(false).unwrap();
        assert_eq!(report.verdict, Verdict::Secure);
        assert_eq!(report.error_rate, 0.0);
        assert!(!report.sifted_key.is_empty());
        assert_eq!(service.session_count(), 1);

        let snapshot = telemetry.flush();
        assert_eq!(snapshot.counters["lab.rounds"], 1);
        assert_eq!(snapshot.gauges["lab.qber"], vec![0.0]);
    }

    #[test]
    fn full_interception_is_flagged_compromised() {
        let (mut service, _) = service(|config| {
            config.lab.hacker_present = true;
            config.hacker.interception_rate = 1.0;
            config.hacker.measurement_error_rate = 0.0;
            config.hacker.resend_error_rate = 0.0;
        });
        let report = service.run_round(false).unwrap();
        assert_eq!(report.verdict, Verdict::Compromised);
        assert!(report.error_rate > 11.0);
        assert_eq!(report.theoretical_error_rate, 12.5);
    }

    #[test]
    fn dry_run_stops_before_the_channel() {
        let (mut service, telemetry) = service(|_| {});
        let report = service.run_round(true).unwrap();
        assert!(report.sifted_key.is_empty());
        assert_eq!(report.error_rate, 0.0);

        let snapshot = telemetry.flush();
        assert_eq!(snapshot.counters["lab.dry-run"], 1);
        assert!(!snapshot.counters.contains_key("lab.rounds"));
    }

    #[test]
    fn sarg04_rounds_use_their_own_sessions() {
        let (mut service, _) = service(|config| {
            config.lab.protocol = Protocol::Sarg04;
        });
        let report = service.run_round(false).unwrap();
        assert!(report.session_id.starts_with("SARG04-"));
        // SARG04 engines live outside the BB84 registry.
        assert_eq!(service.session_count(), 0);
    }

    #[test]
    fn rounds_get_distinct_sessions() {
        let (mut service, _) = service(|_| {});
        let first = service.run_round(false).unwrap();
        let second = service.run_round(false).unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert_ne!(first.sifted_key, second.sifted_key);
        assert_eq!(service.session_count(), 2);
    }
}
