//! Command-line surface: `-c/--cluster` (repeatable, max
//! [`MAX_CLUSTERS`]), `-s/--scan`, `-m/--dump-mac` (default no),
//! `-d/--dump-dlc` (default no), `-n/--dump-nwk` (default yes),
//! `-p/--auth-pin` (default `"0000"`).

use clap::Parser;

use crate::error::ConfigError;

pub const MAX_CLUSTERS: usize = 16;

#[derive(Debug, Parser)]
#[command(name = "dectmon", about = "Passive protocol monitor for the DECT air interface")]
pub struct Cli {
    /// Bind to a named capture cluster. May be given up to MAX_CLUSTERS times.
    #[arg(short = 'c', long = "cluster")]
    pub clusters: Vec<String>,

    /// Initiate scanning on each bound cluster at startup.
    #[arg(short = 's', long = "scan")]
    pub scan: bool,

    #[arg(short = 'm', long = "dump-mac", default_value = "no")]
    pub dump_mac: YesNo,

    #[arg(short = 'd', long = "dump-dlc", default_value = "no")]
    pub dump_dlc: YesNo,

    #[arg(short = 'n', long = "dump-nwk", default_value = "yes")]
    pub dump_nwk: YesNo,

    /// ASCII digits used as the key-allocation PIN.
    #[arg(short = 'p', long = "auth-pin", default_value = "0000")]
    pub auth_pin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

impl Cli {
    /// Validates the parsed arguments beyond what `clap` itself enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clusters.len() > MAX_CLUSTERS {
            return Err(ConfigError::TooManyClusters { max: MAX_CLUSTERS });
        }
        if self.clusters.is_empty() {
            return Err(ConfigError::InvalidArgument {
                flag: "cluster",
                value: "at least one --cluster is required".into(),
            });
        }
        Ok(())
    }

    /// Builds the `tracing_subscriber::EnvFilter` directive string that
    /// reproduces this run's `--dump-*` gating.
    pub fn filter_directives(&self) -> String {
        let mut parts = vec!["dectmon::handle=info".to_string()];
        parts.push(format!(
            "dectmon::mac={}",
            if self.dump_mac.is_yes() { "debug" } else { "off" }
        ));
        parts.push(format!(
            "dectmon::dlc={}",
            if self.dump_dlc.is_yes() { "debug" } else { "off" }
        ));
        parts.push(format!(
            "dectmon::nwk={}",
            if self.dump_nwk.is_yes() { "info" } else { "off" }
        ));
        parts.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_more_than_max_clusters() {
        let cli = Cli {
            clusters: (0..17).map(|i| format!("c{i}")).collect(),
            scan: false,
            dump_mac: YesNo::No,
            dump_dlc: YesNo::No,
            dump_nwk: YesNo::Yes,
            auth_pin: "0000".into(),
        };
        assert!(matches!(
            cli.validate(),
            Err(ConfigError::TooManyClusters { max: MAX_CLUSTERS })
        ));
    }

    #[test]
    fn default_filter_only_enables_nwk_dump() {
        let cli = Cli {
            clusters: vec!["a".into()],
            scan: false,
            dump_mac: YesNo::No,
            dump_dlc: YesNo::No,
            dump_nwk: YesNo::Yes,
            auth_pin: "0000".into(),
        };
        let filter = cli.filter_directives();
        assert!(filter.contains("dectmon::mac=off"));
        assert!(filter.contains("dectmon::dlc=off"));
        assert!(filter.contains("dectmon::nwk=info"));
    }
}
