use qkdsim_engine::{
    analyze_channel, eavesdropping_detected, Bb84Simulator, HackerConfigPatch, Phase,
};

#[test]
fn full_round_walks_every_phase() {
    let mut sim = Bb84Simulator::with_seed(1001);
    assert_eq!(sim.state().phase, Phase::Preparation);

    sim.generate_bits(50);
    assert_eq!(sim.state().phase, Phase::Transmission);

    sim.transmit_and_measure(false);
    assert_eq!(sim.state().phase, Phase::Sifting);

    sim.sift_key();
    assert_eq!(sim.state().phase, Phase::ErrorCheck);

    let state = sim.complete();
    assert_eq!(state.phase, Phase::Complete);
    assert!(state.end_time >= state.start_time);
}

#[test]
fn session_ids_are_prefixed_and_rotate_on_reset() {
    let mut sim = Bb84Simulator::with_seed(5);
    let first = sim.state().session_id;
    assert!(first.starts_with("QKD-"));
    sim.reset();
    assert_ne!(sim.state().session_id, first);
}

#[test]
fn analysis_agrees_with_sifted_key() {
    let mut sim = Bb84Simulator::with_seed(404);
    sim.generate_bits(300);
    sim.transmit_and_measure(true);
    let key = sim.sift_key();
    let state = sim.complete();

    let analysis = analyze_channel(&state);
    assert_eq!(analysis.sifted_key_length, key.len());
    assert!(analysis.basis_matching_rate >= 0.0 && analysis.basis_matching_rate <= 100.0);
    assert!(state.error_rate >= 0.0 && state.error_rate <= 100.0);
}

#[test]
fn disabling_the_eavesdropper_keeps_the_channel_clean() {
    let mut sim = Bb84Simulator::with_seed(2024);
    sim.configure_hacker(HackerConfigPatch {
        interception_rate: Some(0.0),
        ..HackerConfigPatch::default()
    });
    sim.generate_bits(500);
    sim.transmit_and_measure(true);
    sim.sift_key();
    let state = sim.state();
    assert!(state.intercepted_bits.is_empty());
    assert_eq!(state.error_rate, 0.0);
    assert!(!eavesdropping_detected(state.error_rate));
}

#[test]
fn snapshots_survive_serialization() {
    let mut sim = Bb84Simulator::with_seed(77);
    sim.generate_bits(20);
    sim.transmit_and_measure(true);
    sim.sift_key();
    let state = sim.complete();

    let json = serde_json::to_string(&state).unwrap();
    let decoded: qkdsim_engine::SimulationState = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, state);
}
