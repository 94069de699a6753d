use qkdsim_lab::config::Config;
use qkdsim_lab::service::LabService;
use qkdsim_telemetry::TelemetryHandle;

fn main() {
    let mut cfg = Config::sample();
    cfg.lab.seed = Some(2026);
    cfg.lab.photon_count = 500;
    cfg.lab.hacker_present = true;
    let telemetry = TelemetryHandle::from_config(cfg.telemetry.clone());

    let mut service = LabService::new(cfg, telemetry.clone());
    let report = service.run_round(false).expect("round runs");
    let snapshot = telemetry.flush();

    println!(
        "[qkdsim-lab] session {} => QBER {:.2}% ({})",
        report.session_id, report.error_rate, report.verdict
    );
    println!(
        "[qkdsim-lab] counters={:?} gauges={:?}",
        snapshot.counters, snapshot.gauges
    );
}
