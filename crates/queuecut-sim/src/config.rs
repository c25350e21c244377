//! Runner configuration.
//!
//! Wraps the simulation parameters with the settings of a headless run
//! (frame rate, duration, scene size, autopilot). Loaded from and saved to a
//! TOML file; a missing or broken file falls back to defaults.

use queuecut_common::{ConfigError, QueuecutError, QueuecutResult};
use queuecut_gameplay::SimConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const APP_DIR: &str = "queuecut";
const CONFIG_FILE: &str = "queuecut.toml";

/// Settings for a headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Simulation ticks per simulated second
    pub frames_per_second: u32,
    /// Simulated seconds to run
    pub duration_seconds: f32,
    /// NPCs standing in line at the start
    pub queue_size: usize,
    /// NPCs milling about beside the line
    pub wanderers: usize,
    /// How far from the line wanderers stand
    pub wander_distance: f32,
    /// Scripted player
    pub autopilot: AutopilotSettings,
    /// Simulation parameters
    pub sim: SimConfig,
}

/// Behavior of the scripted player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotSettings {
    /// Whether the player acts at all
    pub enabled: bool,
    /// Walking speed in units per second
    pub walk_speed: f32,
    /// Seconds spent in line before stepping out again
    pub patience: f32,
    /// Sideways distance from the line while waiting for a chance
    pub staging_distance: f32,
    /// Whether to bomb the line when the gap is watched
    pub use_abilities: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            frames_per_second: 60,
            duration_seconds: 120.0,
            queue_size: 15,
            wanderers: 2,
            wander_distance: 9.0,
            autopilot: AutopilotSettings::default(),
            sim: SimConfig::default(),
        }
    }
}

impl Default for AutopilotSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            walk_speed: 3.25,
            patience: 8.0,
            staging_distance: 6.0,
            use_abilities: true,
        }
    }
}

impl RunnerConfig {
    /// Reads the runner config from [`Self::config_path`].
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Reads the runner config at `path`.
    ///
    /// A missing file means "play with defaults"; an unreadable one is
    /// reported and also replaced by defaults so a run can still start.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No runner config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Runner config read from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Ignoring runner config {}: {e}", path.display());
                Self::default()
            },
        }
    }

    /// Like [`Self::load_from`], but hands back the read or parse error.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> QueuecutResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Writes the config to [`Self::config_path`] and returns that path.
    pub fn save(&self) -> io::Result<PathBuf> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Writes the config as TOML to `path`.
    ///
    /// Missing directories are created. The file is written next to its
    /// final name first and then renamed over it, so an interrupted save
    /// leaves the previous config intact.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let staging = path.with_extension("toml.partial");
        fs::write(&staging, contents)?;
        fs::rename(&staging, path)?;

        info!("Wrote runner config to {}", path.display());
        Ok(())
    }

    /// Where `load` and `save` look: `queuecut/queuecut.toml` under the
    /// platform config directory, or the working directory if there is none.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Rejects values no clamping can repair.
    pub fn check(&self) -> Result<(), QueuecutError> {
        if !self.duration_seconds.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "duration_seconds",
                reason: format!("{} is not a finite number", self.duration_seconds),
            }
            .into());
        }
        if !self.autopilot.walk_speed.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "autopilot.walk_speed",
                reason: format!("{} is not a finite number", self.autopilot.walk_speed),
            }
            .into());
        }
        Ok(())
    }

    /// Clamp values to ranges the runner can work with.
    pub fn validate(&mut self) {
        self.frames_per_second = self.frames_per_second.clamp(1, 1000);
        self.duration_seconds = self.duration_seconds.clamp(0.0, 86_400.0);
        self.queue_size = self.queue_size.min(500);
        self.wanderers = self.wanderers.min(100);
        self.wander_distance = self.wander_distance.max(0.0);

        self.autopilot.walk_speed = self.autopilot.walk_speed.clamp(0.1, 50.0);
        self.autopilot.patience = self.autopilot.patience.max(0.0);
        self.autopilot.staging_distance = self.autopilot.staging_distance.max(0.0);

        self.sim.validate();
    }

    /// Seconds per tick.
    #[must_use]
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.frames_per_second.max(1) as f32
    }

    /// Ticks in the whole run.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        (self.duration_seconds.max(0.0) * self.frames_per_second as f32).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.frames_per_second, 60);
        assert_eq!(config.queue_size, 15);
        assert!(config.autopilot.enabled);
        assert_eq!(config.frame_count(), 7_200);
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::default();

        config.frames_per_second = 0;
        config.duration_seconds = -5.0;
        config.autopilot.walk_speed = 0.0;
        config.sim.queue.spacing = 0.0;

        config.validate();

        assert_eq!(config.frames_per_second, 1);
        assert_eq!(config.duration_seconds, 0.0);
        assert!((config.autopilot.walk_speed - 0.1).abs() < 0.001);
        assert!((config.sim.queue.spacing - 0.1).abs() < 0.001);
        assert_eq!(config.frame_count(), 0);
    }

    #[test]
    fn test_config_check_rejects_nan() {
        let mut config = RunnerConfig::default();
        assert!(config.check().is_ok());

        config.duration_seconds = f32::NAN;
        let err = config.check().expect_err("NaN duration");
        assert!(err.to_string().contains("duration_seconds"));
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("queuecut.toml");

        let mut config = RunnerConfig::default();
        config.frames_per_second = 30;
        config.queue_size = 8;
        config.sim.seed = Some(12345);
        config.sim.cooldown.duration = 4.0;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = RunnerConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_save_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("queuecut.toml");

        let mut config = RunnerConfig::default();
        config.save_to(&config_path).expect("first save");
        config.wanderers = 0;
        config.save_to(&config_path).expect("second save");

        assert_eq!(RunnerConfig::load_from(&config_path).wanderers, 0);
        assert!(!config_path.with_extension("toml.partial").exists());
    }

    #[test]
    fn test_config_path_names_file() {
        let path = RunnerConfig::config_path();
        assert!(path.ends_with(CONFIG_FILE));
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = RunnerConfig::load_from("/nonexistent/path/queuecut.toml");
        assert_eq!(config.queue_size, 15);
    }

    #[test]
    fn test_config_load_broken_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "frames_per_second = \"fast\"").expect("write");

        assert!(matches!(
            RunnerConfig::try_load_from(&config_path),
            Err(QueuecutError::Config(ConfigError::Parse(_)))
        ));
        assert_eq!(RunnerConfig::load_from(&config_path), RunnerConfig::default());
    }

    #[test]
    fn test_config_partial_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(
            &config_path,
            "queue_size = 5\n\n[sim.detection]\ncatch_radius = 2.5\n",
        )
        .expect("write");

        let config = RunnerConfig::load_from(&config_path);
        assert_eq!(config.queue_size, 5);
        assert_eq!(config.sim.detection.catch_radius, 2.5);
        assert_eq!(config.sim.detection.detection_range, 3.0);
        assert_eq!(config.frames_per_second, 60);
    }

    #[test]
    fn test_config_toml_serialization() {
        let config = RunnerConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize");

        assert!(toml_str.contains("frames_per_second"));
        assert!(toml_str.contains("[sim.queue]"));
    }
}
