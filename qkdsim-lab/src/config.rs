use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use qkdsim_engine::{HackerConfig, NoiseModel};
use qkdsim_telemetry::TelemetryConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConfigFormat {
    Auto,
    Toml,
    Yaml,
}

/// Which protocol variant a campaign drives.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    Bb84,
    Sarg04,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Bb84 => write!(f, "bb84"),
            Protocol::Sarg04 => write!(f, "sarg04"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format:?} config: {details}")]
    Parse {
        format: ConfigFormat,
        details: String,
    },
    #[error("configuration invalid: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub lab: LabSection,
    /// Eavesdropper parameters; engine defaults apply when omitted.
    #[serde(default)]
    pub hacker: HackerConfig,
    /// Channel noise, consumed by the sarg04 protocol only.
    #[serde(default)]
    pub noise: NoiseModel,
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LabSection {
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
    /// Photons per round.
    #[serde(default = "default_photon_count")]
    pub photon_count: usize,
    /// Run the eavesdropper during transmission.
    #[serde(default)]
    pub hacker_present: bool,
    /// Display grouping for the sifted key.
    #[serde(default = "default_key_group_size")]
    pub key_group_size: usize,
    /// Deterministic seed; rounds offset it so each session still differs.
    #[serde(default)]
    pub seed: Option<u64>,
}

const fn default_protocol() -> Protocol {
    Protocol::Bb84
}

const fn default_photon_count() -> usize {
    50
}

const fn default_key_group_size() -> usize {
    8
}

impl Config {
    /// The engine itself never validates its inputs, so ill-formed
    /// probabilities are rejected here, at the configuration boundary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lab.photon_count == 0 {
            return Err(ConfigError::Validation(
                "photon-count must be at least 1".into(),
            ));
        }
        probability("hacker.interception-rate", self.hacker.interception_rate)?;
        probability(
            "hacker.measurement-error-rate",
            self.hacker.measurement_error_rate,
        )?;
        probability("hacker.resend-error-rate", self.hacker.resend_error_rate)?;
        probability("noise.detector-efficiency", self.noise.detector_efficiency)?;
        probability("noise.dark-count-rate", self.noise.dark_count_rate)?;
        probability("noise.loss-probability", self.noise.loss_probability)?;
        Ok(())
    }

    pub fn sample() -> Self {
        Self {
            lab: LabSection {
                protocol: default_protocol(),
                photon_count: default_photon_count(),
                hacker_present: false,
                key_group_size: default_key_group_size(),
                seed: None,
            },
            hacker: HackerConfig::default(),
            noise: NoiseModel::default(),
            telemetry: TelemetryConfig::sample("http://localhost:4318"),
        }
    }
}

fn probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{name} must lie in [0, 1], got {value}"
        )));
    }
    Ok(())
}

pub fn load_config(path: &Path, format: ConfigFormat) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = resolve_format(path, format);
    let config: Config = match format {
        ConfigFormat::Toml => toml::from_str(&contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
        ConfigFormat::Yaml => serde_yaml::from_str(&contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
        ConfigFormat::Auto => unreachable!("auto variant resolved earlier"),
    }?;
    config.validate()?;
    Ok(config)
}

fn resolve_format(path: &Path, format: ConfigFormat) -> ConfigFormat {
    match format {
        ConfigFormat::Auto => match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => ConfigFormat::Toml,
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        },
        _ => format,
    }
}
