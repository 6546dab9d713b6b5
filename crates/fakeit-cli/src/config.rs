use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fakeit_generate::OutputFormat;
use fakeit_generate::model::DEFAULT_SEED;
use fakeit_model::SamplePolicy;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "fakeit.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("toml decode error in {path}: {source}")]
    TomlDecode {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    #[default]
    Directory,
    Console,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub destination: DestinationKind,
    pub directory: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            destination: DestinationKind::Directory,
            directory: PathBuf::from("out"),
        }
    }
}

/// Resolved settings: defaults, then `fakeit.toml`, then CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub seed: u64,
    /// Worker threads per model phase; absent uses available parallelism.
    pub concurrency: Option<usize>,
    pub inputs_dir: PathBuf,
    pub run_dir: PathBuf,
    pub sampling: SamplePolicy,
    pub output: OutputSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            concurrency: None,
            inputs_dir: PathBuf::from("inputs"),
            run_dir: PathBuf::from("runs"),
            sampling: SamplePolicy::default(),
            output: OutputSettings::default(),
        }
    }
}

/// Load settings from `explicit`, or from `fakeit.toml` when it exists.
///
/// An explicit path must exist; the implicit file is optional.
pub fn load_settings(explicit: Option<&Path>) -> ConfigResult<Settings> {
    match explicit {
        Some(path) if !path.exists() => Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => read_settings(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                read_settings(path)
            } else {
                Ok(Settings::default())
            }
        }
    }
}

fn read_settings(path: &Path) -> ConfigResult<Settings> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&content).map_err(|source| ConfigError::TomlDecode {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_settings(content: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use fakeit_model::{InputOverflow, Rounding};

    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let settings = parse_settings("").expect("parse");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.seed, DEFAULT_SEED);
        assert_eq!(settings.output.format, OutputFormat::Json);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = parse_settings(
            r#"
seed = 7
concurrency = 2

[sampling]
input_overflow = "cycle"

[output]
format = "csv"
destination = "console"
"#,
        )
        .expect("parse");
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.concurrency, Some(2));
        assert_eq!(settings.sampling.rounding, Rounding::Nearest);
        assert_eq!(settings.sampling.input_overflow, InputOverflow::Cycle);
        assert_eq!(settings.output.format, OutputFormat::Csv);
        assert_eq!(settings.output.destination, DestinationKind::Console);
        assert_eq!(settings.output.directory, PathBuf::from("out"));
        assert_eq!(settings.run_dir, PathBuf::from("runs"));
    }

    #[test]
    fn rejects_unknown_enum_values() {
        assert!(parse_settings("[output]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn demo_config_parses() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/fakeit.toml");
        let settings = read_settings(&path).expect("demo config");
        assert_eq!(settings.output.format, OutputFormat::Ndjson);
        assert_eq!(settings.concurrency, Some(4));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("fakeit_{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(
            load_settings(Some(&path)),
            Err(ConfigError::NotFound(_))
        ));
    }
}
