// TOML config adapter - Pipeline configuration from file, environment and defaults

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::{ProfileTable, ProjectionMultipliers};
use crate::output::{PackageSettings, TileGrid};
use crate::utils::logging::LoggingConfig;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SPHERECAST_";

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "spherecast.toml";

/// External tool locations and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Wall-clock limit for one encoder pass
    pub pass_timeout_secs: u64,
    /// Wall-clock limit for probes and frame grabs
    pub probe_timeout_secs: u64,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            pass_timeout_secs: 4 * 60 * 60,
            probe_timeout_secs: 120,
        }
    }
}

impl FfmpegConfig {
    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub preset: QualityPreset,
    pub formats: Vec<OutputFormat>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            preset: QualityPreset::Medium,
            formats: vec![OutputFormat::Mp4],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the per-job working directories
    pub work_dir: PathBuf,
    /// Temporary storage shared by running jobs
    pub temp_budget_mib: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("spherecast"),
            temp_budget_mib: 20 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub max_concurrent_jobs: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: num_cpus::get().max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,
    pub fov: f64,
    /// Seconds between sprite frames when no hints are given
    pub sprite_interval: f64,
    pub sprite_columns: u32,
    pub sprite_tile_width: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            fov: 90.0,
            sprite_interval: 10.0,
            sprite_columns: 10,
            sprite_tile_width: 160,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub formats: Vec<StreamingFormat>,
    pub codecs: Vec<Codec>,
    pub segment_duration: u32,
    pub tile_columns: u32,
    pub tile_rows: u32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            formats: vec![StreamingFormat::Hls, StreamingFormat::Dash],
            codecs: vec![Codec::H264],
            segment_duration: 6,
            tile_columns: 4,
            tile_rows: 2,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ffmpeg: FfmpegConfig,
    pub encoding: EncodingConfig,
    pub storage: StorageConfig,
    pub workers: WorkersConfig,
    pub thumbnails: ThumbnailConfig,
    pub streaming: StreamingConfig,
    pub logging: LoggingConfig,
    /// Replacement rows for the built-in profile table
    pub profiles: Vec<EncodingProfile>,
    /// Projection name to bitrate multiplier
    pub multipliers: BTreeMap<String, f64>,
}

impl PipelineConfig {
    /// Check values a run cannot start with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.encoding.formats.is_empty() {
            return Err(DomainError::ConfigInvalid("encoding.formats cannot be empty".to_string()));
        }
        if self.streaming.formats.is_empty() || self.streaming.codecs.is_empty() {
            return Err(DomainError::ConfigInvalid(
                "streaming.formats and streaming.codecs cannot be empty".to_string(),
            ));
        }
        if self.streaming.segment_duration == 0 {
            return Err(DomainError::ConfigInvalid(
                "streaming.segment_duration must be at least 1".to_string(),
            ));
        }
        if self.storage.temp_budget_mib == 0 {
            return Err(DomainError::ConfigInvalid(
                "storage.temp_budget_mib must be positive".to_string(),
            ));
        }
        if self.ffmpeg.pass_timeout_secs == 0 || self.ffmpeg.probe_timeout_secs == 0 {
            return Err(DomainError::ConfigInvalid("ffmpeg timeouts must be positive".to_string()));
        }
        if self.workers.max_concurrent_jobs == 0 {
            return Err(DomainError::ConfigInvalid(
                "workers.max_concurrent_jobs must be positive".to_string(),
            ));
        }
        if self.thumbnails.width == 0 || self.thumbnails.height == 0 || self.thumbnails.sprite_tile_width == 0 {
            return Err(DomainError::ConfigInvalid("thumbnail sizes must be positive".to_string()));
        }
        if !(self.thumbnails.sprite_interval > 0.0) {
            return Err(DomainError::ConfigInvalid(
                "thumbnails.sprite_interval must be positive".to_string(),
            ));
        }
        self.tile_grid()
            .map_err(|e| DomainError::ConfigInvalid(format!("streaming tile grid: {}", e)))?;
        self.profile_table()?;
        self.projection_multipliers()?;
        Ok(())
    }

    /// Built-in profiles with this config's rows applied on top
    pub fn profile_table(&self) -> Result<ProfileTable, DomainError> {
        self.profiles
            .iter()
            .cloned()
            .try_fold(ProfileTable::standard(), |table, profile| table.with_override(profile))
    }

    pub fn projection_multipliers(&self) -> Result<ProjectionMultipliers, DomainError> {
        self.multipliers
            .iter()
            .try_fold(ProjectionMultipliers::standard(), |table, (name, value)| {
                let projection: ProjectionType = name
                    .parse()
                    .map_err(|_| DomainError::ConfigInvalid(format!("unknown projection '{}' in multipliers", name)))?;
                table.with(projection, *value)
            })
    }

    pub fn tile_grid(&self) -> Result<TileGrid, DomainError> {
        TileGrid::new(self.streaming.tile_columns, self.streaming.tile_rows)
    }

    pub fn package_settings(&self) -> Result<PackageSettings, DomainError> {
        Ok(PackageSettings {
            segment_duration: self.streaming.segment_duration,
            tile_grid: self.tile_grid()?,
        })
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Defaults, then the file (explicit path or `spherecast.toml` if present),
    /// then `SPHERECAST_*` variables. Command-line flags are applied by the caller.
    pub fn load(path: Option<&Path>) -> Result<PipelineConfig, DomainError> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => PipelineConfig::default(),
        };
        Self::apply_env(&mut config, std::env::vars())?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<PipelineConfig, DomainError> {
        if !path.exists() {
            return Err(DomainError::FsFail(format!(
                "Config file does not exist: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::FsFail(format!("Failed to read config file: {}", e)))?;
        let config = Self::parse(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<PipelineConfig, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::ConfigInvalid(format!("Failed to parse TOML config: {}", e)))
    }

    pub fn to_toml(config: &PipelineConfig) -> Result<String, DomainError> {
        toml::to_string_pretty(config)
            .map_err(|e| DomainError::ConfigInvalid(format!("Failed to serialize config: {}", e)))
    }

    /// Apply `SPHERECAST_*` overrides from `vars`
    pub fn apply_env(
        config: &mut PipelineConfig,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), DomainError> {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "FFMPEG" => config.ffmpeg.ffmpeg_path = PathBuf::from(&value),
                "FFPROBE" => config.ffmpeg.ffprobe_path = PathBuf::from(&value),
                "PASS_TIMEOUT" => config.ffmpeg.pass_timeout_secs = parse_number(&key, &value)?,
                "WORK_DIR" => config.storage.work_dir = PathBuf::from(&value),
                "TEMP_BUDGET_MIB" => config.storage.temp_budget_mib = parse_number(&key, &value)?,
                "MAX_JOBS" => config.workers.max_concurrent_jobs = parse_number(&key, &value)?,
                "PRESET" => config.encoding.preset = value.parse()?,
                "FORMATS" => config.encoding.formats = parse_list(&value)?,
                "SEGMENT_DURATION" => config.streaming.segment_duration = parse_number(&key, &value)?,
                "LOG_LEVEL" => config.logging.level = value.parse()?,
                "LOG_FORMAT" => config.logging.format = value.parse()?,
                _ => continue,
            }
            debug!(variable = %key, "Applied environment override");
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DomainError> {
    value
        .trim()
        .parse()
        .map_err(|_| DomainError::ConfigInvalid(format!("{} must be a number, got '{}'", key, value)))
}

/// Comma-separated list of values
pub fn parse_list<T>(value: &str) -> Result<Vec<T>, DomainError>
where
    T: std::str::FromStr<Err = DomainError>,
{
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::LogLevel;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.streaming.segment_duration, 6);
        assert_eq!(config.tile_grid().unwrap(), TileGrid::new(4, 2).unwrap());
        assert!(config.workers.max_concurrent_jobs >= 1);
    }

    #[test]
    fn test_parse_sections() {
        let config = TomlConfigAdapter::parse(
            r#"
            [encoding]
            preset = "high"
            formats = ["mp4", "webm"]

            [storage]
            temp_budget_mib = 512

            [streaming]
            tile_columns = 6
            tile_rows = 3

            [multipliers]
            equirectangular = 3.0

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.encoding.preset, QualityPreset::High);
        assert_eq!(config.encoding.formats, vec![OutputFormat::Mp4, OutputFormat::Webm]);
        assert_eq!(config.storage.temp_budget_mib, 512);
        assert_eq!(config.ffmpeg, FfmpegConfig::default());
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.projection_multipliers().unwrap().multiplier_for(ProjectionType::Equirectangular),
            3.0
        );
        assert_eq!(config.tile_grid().unwrap().tile_count(), 18);
    }

    #[test]
    fn test_profile_override() {
        let mut config = PipelineConfig::default();
        let mut row = ProfileTable::standard()
            .lookup(OutputFormat::Mp4, QualityPreset::Low)
            .unwrap()
            .clone();
        row.target_bitrate_kbps = 900;
        config.profiles.push(row);
        let table = config.profile_table().unwrap();
        assert_eq!(
            table.lookup(OutputFormat::Mp4, QualityPreset::Low).unwrap().target_bitrate_kbps,
            900
        );
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = PipelineConfig::default();
        config.encoding.formats.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.streaming.segment_duration = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.storage.temp_budget_mib = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.ffmpeg.pass_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.streaming.tile_rows = 0;
        assert!(matches!(config.validate(), Err(DomainError::ConfigInvalid(_))));

        let mut config = PipelineConfig::default();
        config.multipliers.insert("sphere".to_string(), 2.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PipelineConfig::default();
        let vars = vec![
            ("SPHERECAST_PRESET".to_string(), "ultra".to_string()),
            ("SPHERECAST_FORMATS".to_string(), "mp4, ogv".to_string()),
            ("SPHERECAST_MAX_JOBS".to_string(), "3".to_string()),
            ("SPHERECAST_WORK_DIR".to_string(), "/scratch".to_string()),
            ("PATH".to_string(), "/bin".to_string()),
        ];
        TomlConfigAdapter::apply_env(&mut config, vars).unwrap();
        assert_eq!(config.encoding.preset, QualityPreset::Ultra);
        assert_eq!(config.encoding.formats, vec![OutputFormat::Mp4, OutputFormat::Ogv]);
        assert_eq!(config.workers.max_concurrent_jobs, 3);
        assert_eq!(config.storage.work_dir, PathBuf::from("/scratch"));

        let bad = vec![("SPHERECAST_TEMP_BUDGET_MIB".to_string(), "lots".to_string())];
        assert!(TomlConfigAdapter::apply_env(&mut config, bad).is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = PipelineConfig::default();
        let text = TomlConfigAdapter::to_toml(&config).unwrap();
        assert_eq!(TomlConfigAdapter::parse(&text).unwrap(), config);
    }
}
