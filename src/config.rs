//! Configuration for the upstream API and the HTTP server

use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use log::debug;

/// Public endpoint of the Generative Language API
pub const DEFAULT_API_BASE: &str
  = "https://generativelanguage.googleapis.com";

/// Operator curated model order, best first
pub const DEFAULT_PREFERRED_MODELS: [&str; 5] =
[   "models/gemini-2.5-flash"
  , "models/gemini-2.5-pro"
  , "models/gemini-2.0-flash"
  , "models/gemini-2.0-flash-001"
  , "models/gemini-2.5-flash-lite"
];

/// Upstream API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig
{   /// API base URL, without version segment
    pub api_base: String
  , /// Timeout for the model listing call, in seconds
    pub list_timeout_secs: u64
  , /// Timeout for the generation call, in seconds
    pub generate_timeout_secs: u64
  , /// Preferred model identifiers in order
    pub preferred_models: Vec<String>
}

impl GeminiConfig
{   pub fn list_timeout(&self) -> Duration
    {   Duration::from_secs(self.list_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration
    {   Duration::from_secs(self.generate_timeout_secs)
    }
}

impl Default for GeminiConfig
{   fn default() -> Self
    {   GeminiConfig
        {   api_base: DEFAULT_API_BASE.to_string()
          , list_timeout_secs: 15
          , generate_timeout_secs: 25
          , preferred_models: DEFAULT_PREFERRED_MODELS
              .iter()
              .map(|m| m.to_string())
              .collect()
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig
{   /// Listen address
    pub bind_addr: String
  , /// Site served at the root
    pub home_dir: PathBuf
  , /// Chat widget served under /chatbot
    pub chatbot_dir: PathBuf
}

impl Default for ServerConfig
{   fn default() -> Self
    {   ServerConfig
        {   bind_addr: "127.0.0.1:5000".to_string()
          , home_dir: PathBuf::from("home")
          , chatbot_dir: PathBuf::from("chatbot")
        }
    }
}

/// Relay configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig
{   pub gemini: GeminiConfig
  , pub server: ServerConfig
}

impl RelayConfig
{   /// Build from process environment on top of defaults
    pub fn from_env() -> Result<Self, crate::error::Error>
    {   Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F)
      -> Result<Self, crate::error::Error>
    where
      F: Fn(&str) -> Option<String>
    {   let mut config = RelayConfig::default();
        let get = |key: &str| {
          lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        };

        if let Some(base) = get("GEMINI_API_BASE")
        {   config.gemini.api_base
              = base.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("GEMINI_LIST_TIMEOUT_SECS")
        {   config.gemini.list_timeout_secs
              = parse_secs("GEMINI_LIST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = get("GEMINI_GENERATE_TIMEOUT_SECS")
        {   config.gemini.generate_timeout_secs
              = parse_secs("GEMINI_GENERATE_TIMEOUT_SECS", &secs)?;
        }
        if let Some(list) = get("GEMINI_PREFERRED_MODELS")
        {   config.gemini.preferred_models = list
              .split(',')
              .map(str::trim)
              .filter(|m| !m.is_empty())
              .map(str::to_string)
              .collect();
        }
        if let Some(addr) = get("RELAY_BIND_ADDR")
        {   config.server.bind_addr = addr;
        }
        if let Some(dir) = get("RELAY_HOME_DIR")
        {   config.server.home_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("RELAY_CHATBOT_DIR")
        {   config.server.chatbot_dir = PathBuf::from(dir);
        }

        debug!("Loaded relay configuration: {:?}", config);
        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str)
  -> Result<u64, crate::error::Error>
{   match value.parse::<u64>()
    {   Ok(0) | Err(_) => Err(
          crate::error::Error::InvalidConfiguration(
            format!("{} must be a positive number of seconds, got {:?}", key, value)
          )
        )
      , Ok(secs) => Ok(secs)
    }
}
