// Configuration for the planner and its collaborators

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert travel planner. Build a detailed, \
personalized day-by-day itinerary for the trip the user describes.

Use the fetch_flights tool for flight options and the fetch_hotels tool for accommodation. \
Recommend specific flights (number, price, timings, stops) and specific hotels (price, \
amenities, location) taken from the tool results, and keep every recommendation within the \
stated budget.

Format the plan in markdown with these sections: Flight Details, Accommodation, \
Daily Itinerary (one subsection per day with morning, afternoon and evening), \
Budget Breakdown (flights, hotels, daily expenses, total) and Travel Tips \
(local transport, customs, safety, emergency contacts).";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

// Flight-search supplier settings
#[derive(Debug, Clone)]
pub struct FlightApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub currency: String,
    pub timeout_ms: u64,
}

impl Default for FlightApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.flightapi.io".to_string(),
            api_key: String::new(),
            currency: "INR".to_string(),
            timeout_ms: 15_000,
        }
    }
}

// Retry policy for transient inference-service failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 250,
            max_backoff_ms: 4_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    // Exponential backoff with jitter
    pub fn backoff(&self, retry_attempt: u32) -> Duration {
        let base_backoff_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powf(retry_attempt as f64))
        .min(self.max_backoff_ms as f64);

        let jitter = rand::random::<f64>() * self.jitter_factor * base_backoff_ms;
        let backoff_ms = base_backoff_ms * (1.0 - self.jitter_factor / 2.0) + jitter;

        Duration::from_millis(backoff_ms as u64)
    }
}

// Chat-completions endpoint settings
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub retry_config: RetryConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout_ms: 60_000,
            retry_config: RetryConfig::default(),
        }
    }
}

// Conversation loop settings
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub model: String,
    pub temperature: f32,
    // Inference calls allowed per run
    pub max_turns: usize,
    pub inference_timeout_ms: u64,
    pub system_prompt: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_turns: 8,
            inference_timeout_ms: 90_000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub flight_api: FlightApiConfig,
    pub inference: InferenceConfig,
    pub planner: PlannerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    // Settings come from a lookup function so tests don't touch the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = AppConfig::default();

        config.inference.api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        if let Some(url) = get("OPENAI_BASE_URL") {
            config.inference.base_url = url;
        }

        if let Some(key) = get("FLIGHT_API_KEY") {
            config.flight_api.api_key = key;
        }
        if let Some(url) = get("FLIGHT_API_BASE_URL") {
            config.flight_api.base_url = url;
        }
        if let Some(currency) = get("FLIGHT_API_CURRENCY") {
            config.flight_api.currency = currency.to_uppercase();
        }

        if let Some(model) = get("TRIP_PLANNER_MODEL") {
            config.planner.model = model;
        }
        if let Some(value) = get("TRIP_PLANNER_TEMPERATURE") {
            config.planner.temperature = parse_setting("TRIP_PLANNER_TEMPERATURE", value)?;
        }
        if let Some(value) = get("TRIP_PLANNER_MAX_TURNS") {
            let max_turns: usize = parse_setting("TRIP_PLANNER_MAX_TURNS", value.clone())?;
            if max_turns == 0 {
                return Err(ConfigError::Invalid {
                    var: "TRIP_PLANNER_MAX_TURNS",
                    value,
                });
            }
            config.planner.max_turns = max_turns;
        }
        if let Some(value) = get("TRIP_PLANNER_TIMEOUT_MS") {
            config.planner.inference_timeout_ms = parse_setting("TRIP_PLANNER_TIMEOUT_MS", value)?;
        }

        Ok(config)
    }
}

fn parse_setting<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_api_key_is_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENAI_API_KEY")));

        let err = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.inference.api_key, "sk-test");
        assert_eq!(config.planner.model, DEFAULT_MODEL);
        assert_eq!(config.planner.max_turns, 8);
        assert_eq!(config.flight_api.currency, "INR");
        assert!(config.flight_api.api_key.is_empty());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("FLIGHT_API_KEY", "flight-key"),
            ("FLIGHT_API_CURRENCY", "usd"),
            ("TRIP_PLANNER_MODEL", "gpt-4o"),
            ("TRIP_PLANNER_TEMPERATURE", "0.4"),
            ("TRIP_PLANNER_MAX_TURNS", "3"),
            ("TRIP_PLANNER_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.flight_api.api_key, "flight-key");
        assert_eq!(config.flight_api.currency, "USD");
        assert_eq!(config.planner.model, "gpt-4o");
        assert!((config.planner.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.planner.max_turns, 3);
        assert_eq!(config.planner.inference_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TRIP_PLANNER_MAX_TURNS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TRIP_PLANNER_MAX_TURNS", .. }));

        let err = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TRIP_PLANNER_MAX_TURNS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let retry = RetryConfig {
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        };
        assert_eq!(retry.backoff(0), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(400));
        assert_eq!(retry.backoff(10), Duration::from_millis(1_000));
    }
}
