use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Resolves a handful of named zones to a fixed UTC offset. The plan only
/// ever names "Asia/Kolkata" (§6); a tiny table avoids pulling in a full
/// IANA tz database for one zone.
fn offset_minutes_for_timezone(name: &str) -> i32 {
    match name {
        "Asia/Kolkata" | "Asia/Calcutta" => 5 * 60 + 30,
        "UTC" => 0,
        _ => 5 * 60 + 30,
    }
}

/// Engine-wide configuration (§6 Configuration). CLI flags override a config
/// file, which overrides these defaults — the same precedence the teacher
/// codebase uses for its runtime config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub car_pool_percent: f64,
    pub house_pool_percent: f64,
    pub royalty_pool_percent: f64,
    pub timezone: String,
    pub epin_token: bool,
    pub level_count: usize,
    pub pairs_per_rank_step: u32,
    pub travel_national_share: f64,
    pub travel_international_share: f64,
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            car_pool_percent: 2.0,
            house_pool_percent: 2.0,
            royalty_pool_percent: 2.0,
            timezone: "Asia/Kolkata".to_string(),
            epin_token: true,
            level_count: 10,
            pairs_per_rank_step: 8,
            travel_national_share: 0.60,
            travel_international_share: 0.40,
            data_dir: "data".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Config::default()),
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config at {}", p.display()))?;
                let cfg: Config = toml_lite::from_str(&text)
                    .with_context(|| format!("parsing config at {}", p.display()))?;
                Ok(cfg)
            }
        }
    }

    pub fn timezone_offset_minutes(&self) -> i32 {
        offset_minutes_for_timezone(&self.timezone)
    }
}

/// Minimal `key = value` TOML-ish reader sufficient for this flat config
/// struct, avoiding an extra dependency for a handful of scalar fields.
mod toml_lite {
    use serde::de::DeserializeOwned;
    use serde_json::{Map, Value};

    pub fn from_str<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
        let mut map = Map::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_string();
            let value = value.trim();
            let parsed = if let Ok(b) = value.parse::<bool>() {
                Value::Bool(b)
            } else if let Ok(n) = value.parse::<f64>() {
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            } else {
                Value::String(value.trim_matches('"').to_string())
            };
            map.insert(key, parsed);
        }
        let value = Value::Object(map);
        Ok(serde_json::from_value(value)?)
    }
}
