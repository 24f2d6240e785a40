pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod selection;
pub mod resolver;
pub mod extract;
pub mod client;
pub mod server;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

pub use client::Relay;
pub use error::Error;
pub use extract::{extract, Extractor};
pub use request::{PromptRequest, RelayResponse};
pub use resolver::ModelResolver;
pub use selection::select_model;

/*

gemini-relay: a small HTTP relay in front of the Google Generative
Language API. The browser posts a prompt, the relay picks a model the
account can use, calls generateContent and hands back plain text.

gemini-relay/
├── src/
│   ├── lib.rs          # Shared types and re-exports
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # Environment driven configuration
│   ├── providers/      # Upstream API client and wire types
│   ├── selection.rs    # Preference-then-fallback model choice
│   ├── resolver.rs     # Memoized model list + selection
│   ├── extract.rs      # Answer text extraction heuristics
│   ├── request.rs      # Inbound request / normalized response
│   ├── client.rs       # Prompt orchestration
│   ├── server.rs       # axum router and static mounts
│   ├── main.rs         # Relay server binary
│   └── bin/list_models.rs
└── tests/

*/

/// Capability a model must list to answer single-turn prompts
pub const GENERATE_CONTENT: &str = "generateContent";

/// Value shipped in setup instructions; never a real key
pub const PLACEHOLDER_API_KEY: &str = "your_key";

/// Environment variable holding the credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// ===== Credential =====

/// Secret token for the upstream API. Debug output is redacted.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential
{   /// Accept a raw key unless it is blank or the placeholder
    pub fn new(raw: impl Into<String>) -> Option<Self>
    {   let raw: String = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == PLACEHOLDER_API_KEY
        {   return None;
        }
        Some(Credential(SecretString::from(trimmed.to_string())))
    }

    /// Read the credential from `GEMINI_API_KEY`
    pub fn from_env() -> Option<Self>
    {   std::env::var(API_KEY_ENV).ok().and_then(Credential::new)
    }

    pub(crate) fn expose(&self) -> &str
    {   self.0.expose_secret()
    }
}

impl std::fmt::Debug for Credential
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str("Credential([REDACTED])")
    }
}

// ===== Models =====

/// One entry of the upstream model listing.
/// Every field is optional so one odd entry never spoils the list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor
{   /// Namespaced identifier, e.g. "models/gemini-2.5-flash"
    #[serde(default)]
    pub name: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token_limit: Option<u64>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_token_limit: Option<u64>
  , #[serde(default)]
    pub supported_generation_methods: Vec<String>
}

impl ModelDescriptor
{   pub fn new(
      name: impl Into<String>
    , methods: &[&str]
    ) -> Self
    {   ModelDescriptor
        {   name: name.into()
          , supported_generation_methods: methods
              .iter()
              .map(|m| m.to_string())
              .collect()
          , ..Default::default()
        }
    }

    pub fn supports(&self, method: &str) -> bool
    {   self.supported_generation_methods
          .iter()
          .any(|m| m == method)
    }

    /// Identifier without its namespace ("gemini-2.5-flash")
    pub fn short_name(&self) -> &str
    {   short_model_name(&self.name)
    }
}

/// Strip everything up to the last '/'
pub fn short_model_name(name: &str) -> &str
{   name.rsplit('/').next().unwrap_or(name)
}

/// Outcome of model resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel
{   pub name: String
  , pub method: &'static str
}

/// First `max` characters of `text`
pub(crate) fn truncate_chars(text: &str, max: usize) -> String
{   text.chars().take(max).collect()
}

/// Raw bodies are cut to this many characters in diagnostics
pub const RAW_BODY_LIMIT: usize = 2000;
