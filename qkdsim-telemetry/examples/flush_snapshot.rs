use qkdsim_telemetry::{TelemetryConfig, TelemetryHandle};

fn main() {
    let telemetry = TelemetryHandle::from_config(TelemetryConfig::sample("http://localhost:4318"));

    for _ in 0..3 {
        telemetry
            .record_counter("rounds.completed", 1)
            .expect("within u64 range");
    }
    telemetry.record_gauge("qber.percent", 12.5);
    telemetry.record_gauge("qber.percent", 0.0);
    telemetry.record_latency_ms("round", 42);

    let snapshot = telemetry.flush();
    println!(
        "[qkdsim-telemetry] counters={:?} gauges={:?} latencies={:?}",
        snapshot.counters, snapshot.gauges, snapshot.latencies_ms
    );
}
