use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use qkdsim_engine::format_binary_key;
use qkdsim_lab::config::{load_config, ConfigFormat, Protocol};
use qkdsim_lab::service::LabService;
use qkdsim_telemetry::TelemetryHandle;

#[cfg(any(
    all(feature = "dev", feature = "test"),
    all(feature = "dev", feature = "prod"),
    all(feature = "test", feature = "prod")
))]
compile_error!(
    "Only one of the `dev`, `test`, or `prod` features may be enabled for qkdsim-lab."
);

#[derive(Debug, Parser)]
#[command(
    name = "qkdsim-lab",
    version,
    about = "Runs QKD protocol simulation rounds and reports channel security"
)]
struct Cli {
    /// Path to configuration file (TOML or YAML).
    #[arg(long, default_value = "configs/qkdsim-lab.toml")]
    config: PathBuf,
    /// Explicit configuration format override.
    #[arg(long, value_enum, default_value_t = ConfigFormat::Auto)]
    config_format: ConfigFormat,
    /// Number of rounds to execute before exiting.
    #[arg(long, default_value_t = 1)]
    rounds: u16,
    /// Override the configured protocol variant.
    #[arg(long, value_enum)]
    protocol: Option<Protocol>,
    /// Override the configured photons per round.
    #[arg(long)]
    photons: Option<usize>,
    /// Force the eavesdropper on regardless of configuration.
    #[arg(long)]
    hacker: bool,
    /// Deterministic seed override for reproducible campaigns.
    #[arg(long)]
    seed: Option<u64>,
    /// Stop each round after photon generation; no transmission.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let mut config = load_config(&cli.config, cli.config_format)?;
    if let Some(protocol) = cli.protocol {
        config.lab.protocol = protocol;
    }
    if let Some(photons) = cli.photons {
        config.lab.photon_count = photons;
    }
    if cli.hacker {
        config.lab.hacker_present = true;
    }
    if let Some(seed) = cli.seed {
        config.lab.seed = Some(seed);
    }
    let key_group_size = config.lab.key_group_size;

    let telemetry = TelemetryHandle::from_config(config.telemetry.clone());
    let mut service = LabService::new(config, telemetry.clone());

    for round in 0..cli.rounds {
        let report = service.run_round(cli.dry_run)?;
        println!(
            "round {} [{}] session {} :: {} photons, basis match {:.1}%",
            round + 1,
            report.protocol,
            report.session_id,
            report.photon_count,
            report.basis_matching_rate
        );
        println!(
            "  QBER {:.2}% (reference {:.1}%) => {}",
            report.error_rate, report.theoretical_error_rate, report.verdict
        );
        if !report.sifted_key.is_empty() {
            println!(
                "  key ({} bits) {}",
                report.sifted_key.len(),
                format_binary_key(&report.sifted_key, key_group_size)
            );
        }
    }

    let snapshot = telemetry.flush();
    println!("telemetry {}", snapshot.to_json()?);
    Ok(())
}
