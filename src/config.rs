//! Service endpoints and client settings.

use std::time::Duration;

use serde::Deserialize;

use crate::model::TravelMode;

pub const OVERPASS_ENV: &str = "GATESOLVE_OVERPASS_INTERPRETER";
pub const OLMAP_ENV: &str = "GATESOLVE_OLMAP_URL";
pub const OSRM_ENV: &str = "GATESOLVE_OSRM_URL";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverpassConfig {
    pub interpreter_url: String,
    pub timeout_secs: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            interpreter_url: "https://overpass.fvh.io/api/interpreter".to_string(),
            timeout_secs: 30,
        }
    }
}

impl OverpassConfig {
    /// Interpreter URL without a trailing `?`.
    pub fn interpreter(&self) -> &str {
        self.interpreter_url.trim_end_matches('?')
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OlmapConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OlmapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.olmap.org".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub walking_profile: String,
    pub driving_profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            walking_profile: "foot".to_string(),
            driving_profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OsrmConfig {
    /// Routing profile used for a travel mode.
    pub fn profile_for(&self, mode: TravelMode) -> &str {
        match mode {
            TravelMode::Default | TravelMode::DeliveryWalking => &self.walking_profile,
            TravelMode::DeliveryCar => &self.driving_profile,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub overpass: OverpassConfig,
    pub olmap: OlmapConfig,
    pub osrm: OsrmConfig,
}

impl PlannerConfig {
    /// Defaults overridden by any endpoint set in the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let set = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = set(OVERPASS_ENV) {
            config.overpass.interpreter_url = url;
        }
        if let Some(url) = set(OLMAP_ENV) {
            config.olmap.base_url = url;
        }
        if let Some(url) = set(OSRM_ENV) {
            config.osrm.base_url = url;
        }
        config
    }
}

pub(crate) fn blocking_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_question_mark_is_stripped() {
        let config = OverpassConfig {
            interpreter_url: "https://example.org/api/interpreter?".to_string(),
            ..OverpassConfig::default()
        };
        assert_eq!(config.interpreter(), "https://example.org/api/interpreter");
    }

    #[test]
    fn test_env_overrides() {
        let config = PlannerConfig::from_lookup(|key| match key {
            OSRM_ENV => Some("http://osrm:5000".to_string()),
            OLMAP_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.osrm.base_url, "http://osrm:5000");
        assert_eq!(config.olmap.base_url, OlmapConfig::default().base_url);
    }

    #[test]
    fn test_profiles() {
        let config = OsrmConfig::default();
        assert_eq!(config.profile_for(TravelMode::DeliveryCar), "car");
        assert_eq!(config.profile_for(TravelMode::Default), "foot");
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: PlannerConfig =
            serde_json::from_str(r#"{"osrm": {"base_url": "http://router"}}"#).unwrap();
        assert_eq!(config.osrm.base_url, "http://router");
        assert_eq!(config.osrm.driving_profile, "car");
    }
}
