use qkdsim_engine::{analyze_channel, eavesdropping_detected, format_binary_key, Bb84Simulator};

fn main() {
    let mut sim = Bb84Simulator::with_seed(1337);
    sim.subscribe(|state| println!("[observer] phase => {:?}", state.phase));

    sim.generate_bits(50);
    sim.transmit_and_measure(true);
    let key = sim.sift_key();
    let state = sim.complete();
    let analysis = analyze_channel(&state);

    println!(
        "session {} :: {} photons sent, {} intercepted",
        state.session_id,
        state.sender_bits.len(),
        state.intercepted_bits.len()
    );
    println!(
        "basis matching {:.1}% :: sifted key {} bits :: {}",
        analysis.basis_matching_rate,
        analysis.sifted_key_length,
        format_binary_key(&key, 8)
    );
    println!(
        "observed QBER {:.2}% (reference {:.1}%) => {}",
        state.error_rate,
        analysis.theoretical_error_rate,
        if eavesdropping_detected(state.error_rate) {
            "COMPROMISED"
        } else {
            "secure"
        }
    );
}
