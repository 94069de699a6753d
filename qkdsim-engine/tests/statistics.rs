//! Seeded large-batch runs checking that observed error rates converge to
//! the probabilities the intercept-resend model predicts.

use qkdsim_engine::{
    eavesdropping_detected, Bb84Simulator, HackerConfigPatch, INTERCEPT_REFERENCE_ERROR_RATE,
};

const BATCH: usize = 10_000;

fn seeded_run(seed: u64, patch: HackerConfigPatch, hacker_present: bool) -> f64 {
    let mut sim = Bb84Simulator::with_seed(seed);
    sim.configure_hacker(patch);
    sim.generate_bits(BATCH);
    sim.transmit_and_measure(hacker_present);
    sim.sift_key();
    sim.state().error_rate
}

#[test]
fn clean_channel_has_exactly_zero_errors() {
    let rate = seeded_run(31337, HackerConfigPatch::default(), false);
    assert_eq!(rate, 0.0);
}

#[test]
fn half_interception_converges_to_the_reference_rate() {
    // Half the photons intercepted, no detector errors on the
    // eavesdropper's side: the textbook 12.5% expectation.
    let patch = HackerConfigPatch {
        measurement_error_rate: Some(0.0),
        resend_error_rate: Some(0.0),
        ..HackerConfigPatch::default()
    };
    let rate = seeded_run(8, patch, true);
    assert!(
        (rate - INTERCEPT_REFERENCE_ERROR_RATE).abs() < 2.0,
        "rate was {rate}"
    );
    assert!(eavesdropping_detected(rate));
}

#[test]
fn full_interception_converges_to_a_quarter() {
    let patch = HackerConfigPatch {
        interception_rate: Some(1.0),
        measurement_error_rate: Some(0.0),
        resend_error_rate: Some(0.0),
    };
    let rate = seeded_run(9, patch, true);
    assert!((22.0..28.0).contains(&rate), "rate was {rate}");
}

#[test]
fn default_eavesdropper_errors_push_the_rate_past_the_reference() {
    // With the default 10% measurement and resend error rates layered on,
    // the expected rate rises to 16% (0.5 * (0.14 + 0.5) / 2): still well
    // past the security threshold.
    let rate = seeded_run(10, HackerConfigPatch::default(), true);
    assert!((13.0..19.0).contains(&rate), "rate was {rate}");
    assert!(eavesdropping_detected(rate));
}
