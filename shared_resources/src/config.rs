use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;

use super::direction::Floor;
use super::error::FleetError;

const CONFIG_FILE_PATH: &str = "config.json";
const FALLBACK_CONFIG_FILE_PATH: &str = "_config.json";

/// What a moving car does with a pickup assigned to it.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovingPickupPolicy {
    /// Accept passengers whose whole trip lies on the current run.
    #[default]
    AcceptOnTheWay,
    RejectWhileMoving,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FleetSettings {
    pub num_elevators: u32,
    pub min_floor: Option<Floor>,
    pub max_floor: Option<Floor>,
}

impl Default for FleetSettings {
    fn default() -> Self {
        FleetSettings {
            num_elevators: 3,
            min_floor: None,
            max_floor: None,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub status_timeout_ms: u64,
    pub housekeeping_ms: u64,
    pub tick_period_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            status_timeout_ms: 500,
            housekeeping_ms: 50,
            tick_period_ms: 500,
        }
    }
}

impl TimingConfig {
    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn housekeeping(&self) -> Duration {
        Duration::from_millis(self.housekeeping_ms)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    pub moving_pickup_policy: MovingPickupPolicy,
    /// Hold back the next tick until every unit acknowledged the previous one.
    pub serialize_ticks: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            moving_pickup_policy: MovingPickupPolicy::default(),
            serialize_ticks: true,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct FleetConfig {
    pub fleet: FleetSettings,
    pub timing: TimingConfig,
    pub dispatch: DispatchConfig,
}

impl FleetConfig {
    /// Reads `config.json`, then `_config.json`, and falls back to the
    /// built-in defaults when neither exists.
    pub fn get() -> Result<Self, FleetError> {
        for path in [CONFIG_FILE_PATH, FALLBACK_CONFIG_FILE_PATH] {
            if Path::new(path).exists() {
                info!("Reading configuration from {}", path);
                return Self::from_file(path);
            }
        }
        info!("No configuration file provided, using default settings...");
        let config = FleetConfig::default();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FleetError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, FleetError> {
        let config: FleetConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_elevators(num_elevators: u32) -> Self {
        let mut config = FleetConfig::default();
        config.fleet.num_elevators = num_elevators;
        config
    }

    pub fn validate(&self) -> Result<(), FleetError> {
        if self.fleet.num_elevators == 0 {
            return Err(FleetError::EmptyFleet);
        }
        if let (Some(min), Some(max)) = (self.fleet.min_floor, self.fleet.max_floor) {
            if min > max {
                return Err(FleetError::InvalidConfig(format!(
                    "min_floor {} is above max_floor {}",
                    min, max
                )));
            }
        }
        if self.timing.status_timeout_ms == 0 {
            return Err(FleetError::InvalidConfig(String::from(
                "status_timeout_ms must be positive",
            )));
        }
        if self.timing.housekeeping_ms == 0 {
            return Err(FleetError::InvalidConfig(String::from(
                "housekeeping_ms must be positive",
            )));
        }
        Ok(())
    }

    pub fn check_floor(&self, floor: Floor) -> Result<(), FleetError> {
        let below = self.fleet.min_floor.map_or(false, |min| floor < min);
        let above = self.fleet.max_floor.map_or(false, |max| floor > max);
        if below || above {
            return Err(FleetError::FloorOutOfBounds {
                floor,
                min: self.fleet.min_floor,
                max: self.fleet.max_floor,
            });
        }
        Ok(())
    }
}
