use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use log::{debug, warn};
use url::Url;

use crate::utils::parse_hex;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Settings for the web calibration service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebOopConfig {
    pub enabled: bool,
    pub site: Option<Url>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    pub block_path: PathBuf,
    pub web_oop: WebOopConfig,
    pub serial: Option<String>,
    pub patch_info: Option<Vec<u8>>,
    pub poll_interval_secs: u64,
}

impl DecoderConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_vars(env::vars())
    }

    /// Build the configuration from key/value pairs
    pub fn from_vars<I>(vars: I) -> Result<Self, Box<dyn std::error::Error>>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with("CGM_"))
            .collect();
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let block_path = get("CGM_BLOCK_PATH")
            .map(PathBuf::from)
            .ok_or("CGM_BLOCK_PATH environment variable not set")?;

        let enabled = match get("CGM_WEB_OOP_ENABLED").as_deref() {
            None => false,
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(v) => return Err(format!("Invalid CGM_WEB_OOP_ENABLED value: '{}'", v).into()),
        };

        let site = get("CGM_WEB_OOP_SITE")
            .map(|s| Url::parse(&s).map_err(|e| format!("Invalid CGM_WEB_OOP_SITE: {}", e)))
            .transpose()?;
        let token = get("CGM_WEB_OOP_TOKEN");

        if enabled && (site.is_none() || token.is_none()) {
            warn!("Web oop enabled but CGM_WEB_OOP_SITE or CGM_WEB_OOP_TOKEN missing");
        }

        let patch_info = get("CGM_PATCH_INFO")
            .map(|s| parse_hex(&s).ok_or(format!("Invalid CGM_PATCH_INFO hex: '{}'", s)))
            .transpose()?;

        let poll_interval_secs = match get("CGM_POLL_INTERVAL_SECS") {
            Some(v) => v
                .parse::<u64>()
                .map_err(|e| format!("Invalid CGM_POLL_INTERVAL_SECS '{}': {}", v, e))?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };
        if poll_interval_secs == 0 {
            return Err("CGM_POLL_INTERVAL_SECS must be greater than 0".into());
        }

        let config = DecoderConfig {
            block_path,
            web_oop: WebOopConfig {
                enabled,
                site,
                token,
            },
            serial: get("CGM_SENSOR_SERIAL"),
            patch_info,
            poll_interval_secs,
        };
        debug!("Loaded configuration: {:?}", config);

        Ok(config)
    }
}
