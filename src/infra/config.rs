//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::{ParkingSpot, ParkingType, SpotId};
use crate::services::fare::{DEFAULT_RATES, FREE_MINUTES, LOYALTY_DISCOUNT};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct LotConfig {
    /// Car spots are numbered first, starting at 1
    #[serde(default = "default_car_spots")]
    pub car_spots: u32,
    /// Bike spots follow the car spots
    #[serde(default = "default_bike_spots")]
    pub bike_spots: u32,
}

fn default_car_spots() -> u32 {
    3
}

fn default_bike_spots() -> u32 {
    2
}

impl Default for LotConfig {
    fn default() -> Self {
        Self { car_spots: default_car_spots(), bike_spots: default_bike_spots() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FareConfig {
    /// Hourly rate per vehicle type, keyed by type name (e.g. CAR = 1.5)
    #[serde(default = "default_rates")]
    pub rates: BTreeMap<String, f64>,
    /// Leading minutes billed as zero
    #[serde(default = "default_free_minutes")]
    pub free_minutes: i64,
    /// Fraction taken off the fare for recurring users
    #[serde(default = "default_loyalty_discount")]
    pub loyalty_discount: f64,
}

fn default_rates() -> BTreeMap<String, f64> {
    DEFAULT_RATES.iter().map(|(category, rate)| (category.as_str().to_string(), *rate)).collect()
}

fn default_free_minutes() -> i64 {
    FREE_MINUTES
}

fn default_loyalty_discount() -> f64 {
    LOYALTY_DISCOUNT
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            rates: default_rates(),
            free_minutes: default_free_minutes(),
            loyalty_discount: default_loyalty_discount(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_enabled")]
    pub enabled: bool,
    /// JSONL file holding every saved ticket snapshot
    #[serde(default = "default_ledger_file")]
    pub file: String,
}

fn default_ledger_enabled() -> bool {
    true
}

fn default_ledger_file() -> String {
    "data/tickets.jsonl".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { enabled: default_ledger_enabled(), file: default_ledger_file() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Log a metrics summary when the shell shuts down
    #[serde(default = "default_log_on_shutdown")]
    pub log_on_shutdown: bool,
}

fn default_log_on_shutdown() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { log_on_shutdown: default_log_on_shutdown() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub lot: LotConfig,
    #[serde(default)]
    pub fare: FareConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    car_spots: u32,
    bike_spots: u32,
    rates: Vec<(ParkingType, f64)>,
    free_minutes: i64,
    loyalty_discount: f64,
    ledger_enabled: bool,
    ledger_file: String,
    metrics_log_on_shutdown: bool,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::assemble(TomlConfig::default(), DEFAULT_RATES.to_vec(), "default")
    }
}

impl Config {
    /// Determine config file path from the CLI flag or environment
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let mut config = Self::from_toml(toml_config)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.config_file = path.display().to_string();
        Ok(config)
    }

    fn from_toml(toml_config: TomlConfig) -> anyhow::Result<Self> {
        let lot = &toml_config.lot;
        if lot.car_spots.checked_add(lot.bike_spots).is_none() {
            bail!("lot size {} + {} spots does not fit spot numbering", lot.car_spots, lot.bike_spots);
        }

        let fare = &toml_config.fare;

        // Rate keys are vehicle type names; unknown names are a config error
        let mut rates = Vec::with_capacity(fare.rates.len());
        for (name, &rate) in &fare.rates {
            let category: ParkingType = name.parse()?;
            if !rate.is_finite() || rate < 0.0 {
                bail!("rate for {} must be a non-negative number, got {}", category, rate);
            }
            rates.push((category, rate));
        }
        for category in [ParkingType::Car, ParkingType::Bike] {
            if !rates.iter().any(|(c, _)| *c == category) {
                warn!(category = %category, "fare_rate_missing");
            }
        }

        if fare.free_minutes < 0 {
            bail!("free_minutes must not be negative, got {}", fare.free_minutes);
        }
        if !(0.0..1.0).contains(&fare.loyalty_discount) {
            bail!("loyalty_discount must be in [0, 1), got {}", fare.loyalty_discount);
        }

        Ok(Self::assemble(toml_config, rates, "inline"))
    }

    fn assemble(toml_config: TomlConfig, rates: Vec<(ParkingType, f64)>, config_file: &str) -> Self {
        Self {
            car_spots: toml_config.lot.car_spots,
            bike_spots: toml_config.lot.bike_spots,
            rates,
            free_minutes: toml_config.fare.free_minutes,
            loyalty_discount: toml_config.fare.loyalty_discount,
            ledger_enabled: toml_config.ledger.enabled,
            ledger_file: toml_config.ledger.file,
            metrics_log_on_shutdown: toml_config.metrics.log_on_shutdown,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a path, falling back to defaults if it can't be read
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path, error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Provisioned spot inventory: cars numbered from 1, then bikes
    pub fn spot_inventory(&self) -> Vec<ParkingSpot> {
        let cars = (1..=self.car_spots).map(|n| (n, ParkingType::Car));
        let bikes = self.bike_spot_numbers().map(|n| (n, ParkingType::Bike));
        cars.chain(bikes)
            .map(|(n, category)| ParkingSpot::new(SpotId(n), category, true))
            .collect()
    }

    /// Bike spot numbers follow the cars; numbers past `u32::MAX` are not provisioned
    fn bike_spot_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        (1..=self.bike_spots).map_while(|n| self.car_spots.checked_add(n))
    }

    pub fn car_spots(&self) -> u32 {
        self.car_spots
    }

    pub fn bike_spots(&self) -> u32 {
        self.bike_spots
    }

    pub fn rates(&self) -> &[(ParkingType, f64)] {
        &self.rates
    }

    pub fn free_minutes(&self) -> i64 {
        self.free_minutes
    }

    pub fn loyalty_discount(&self) -> f64 {
        self.loyalty_discount
    }

    pub fn ledger_enabled(&self) -> bool {
        self.ledger_enabled
    }

    pub fn ledger_file(&self) -> &str {
        &self.ledger_file
    }

    pub fn metrics_log_on_shutdown(&self) -> bool {
        self.metrics_log_on_shutdown
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to point the ledger at another file
    pub fn with_ledger_file(mut self, file: &str) -> Self {
        self.ledger_file = file.to_string();
        self
    }

    /// Builder method to disable the ledger (in-memory only)
    pub fn without_ledger(mut self) -> Self {
        self.ledger_enabled = false;
        self
    }

    /// Builder method to resize the lot
    pub fn with_spots(mut self, car_spots: u32, bike_spots: u32) -> Self {
        self.car_spots = car_spots;
        self.bike_spots = bike_spots;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.car_spots(), 3);
        assert_eq!(config.bike_spots(), 2);
        assert_eq!(config.free_minutes(), 30);
        assert_eq!(config.loyalty_discount(), 0.05);
        assert!(config.rates().contains(&(ParkingType::Car, 1.5)));
        assert!(config.rates().contains(&(ParkingType::Bike, 1.0)));
    }

    #[test]
    fn test_spot_inventory_numbering() {
        let spots = Config::default().spot_inventory();
        let ids: Vec<u32> = spots.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(spots[2].category, ParkingType::Car);
        assert_eq!(spots[3].category, ParkingType::Bike);
        assert!(spots.iter().all(|s| s.available));
    }

    #[test]
    fn test_defaults_match_fare_defaults() {
        let config = Config::default();
        let from_toml = Config::from_toml(TomlConfig::default()).unwrap();
        assert_eq!(config.free_minutes(), FREE_MINUTES);
        assert_eq!(config.loyalty_discount(), LOYALTY_DISCOUNT);
        assert_eq!(config.rates(), &DEFAULT_RATES[..]);
        assert_eq!(from_toml.free_minutes(), config.free_minutes());
        assert_eq!(from_toml.car_spots(), config.car_spots());
        for (category, rate) in DEFAULT_RATES {
            assert!(from_toml.rates().contains(&(category, rate)));
        }
    }

    #[test]
    fn test_oversized_lot_rejected() {
        let toml_config: TomlConfig =
            toml::from_str(&format!("[lot]\ncar_spots = {}\nbike_spots = 2\n", u32::MAX)).unwrap();
        let err = Config::from_toml(toml_config).unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }

    #[test]
    fn test_spot_inventory_stops_at_numbering_limit() {
        let config = Config::default().with_spots(u32::MAX - 1, 3);
        let bikes: Vec<u32> = config.bike_spot_numbers().collect();
        assert_eq!(bikes, vec![u32::MAX]);
    }

    #[test]
    fn test_spot_inventory_no_bikes() {
        let spots = Config::default().with_spots(2, 0).spot_inventory();
        assert_eq!(spots.len(), 2);
        assert!(spots.iter().all(|s| s.category == ParkingType::Car));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml(toml::from_str("").unwrap()).unwrap();
        assert_eq!(config.car_spots(), 3);
        assert_eq!(config.ledger_file(), "data/tickets.jsonl");
        assert_eq!(config.rates().len(), 2);
    }

    #[test]
    fn test_unknown_rate_key_rejected() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[fare.rates]
CAR = 1.5
TRUCK = 3.0
"#,
        )
        .unwrap();
        assert!(Config::from_toml(toml_config).is_err());
    }

    #[test]
    fn test_discount_out_of_range_rejected() {
        let toml_config: TomlConfig = toml::from_str("[fare]\nloyalty_discount = 1.5\n").unwrap();
        assert!(Config::from_toml(toml_config).is_err());
    }

    #[test]
    fn test_resolve_config_path_prefers_cli() {
        assert_eq!(Config::resolve_config_path(Some("config/prod.toml")), "config/prod.toml");
    }

    #[test]
    fn test_resolve_config_path_default() {
        if env::var("CONFIG_FILE").is_err() {
            assert_eq!(Config::resolve_config_path(None), "config/dev.toml");
        }
    }
}
