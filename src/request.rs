//! Inbound request and normalized response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Body of `POST /api/gemini`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest
{   /// The prompt text
    pub prompt: String
}

/// Uniform answer returned to the web client.
/// `success` is always present; the rest depends on the outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse
{   pub success: bool
  , /// Extracted answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
  , /// Human readable failure classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>
  , /// Underlying error description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>
  , /// Upstream HTTP status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>
  , /// Upstream error body (JSON when it parsed, else truncated text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>
  , /// Full decoded upstream response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>
}

impl RelayResponse
{   pub fn success(text: impl Into<String>, raw: Value) -> Self
    {   RelayResponse
        {   success: true
          , text: Some(text.into())
          , raw: Some(raw)
          , ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self
    {   RelayResponse
        {   success: false
          , error: Some(error.into())
          , ..Default::default()
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self
    {   self.details = Some(details.into());
        self
    }
}

impl From<Error> for RelayResponse
{   fn from(e: Error) -> Self
    {   match e
        {   Error::NoCredential => {
              RelayResponse::failure(
                "GEMINI_API_KEY missing or invalid on server"
              )
            }
          , Error::UpstreamListError { .. }
          | Error::NoCapableModel(_) => {
              RelayResponse::failure("model selection failed")
                .with_details(e.to_string())
            }
          , Error::TransportError(msg) => {
              RelayResponse::failure("HTTP error contacting Gemini")
                .with_details(msg)
            }
          , Error::UpstreamGenerationError { status, body } => {
              RelayResponse
              {   status: Some(status)
                , body: Some(body)
                , ..RelayResponse::failure(
                    "Model endpoint returned non-200"
                  )
              }
            }
          , Error::DecodeError { body } => {
              RelayResponse
              {   body: Some(Value::String(body))
                , ..RelayResponse::failure("Model returned non-JSON")
              }
            }
          , Error::ExtractionMiss { raw } => {
              RelayResponse
              {   raw: Some(raw)
                , ..RelayResponse::failure(
                    "Could not extract text from model response"
                  )
              }
            }
          , Error::InvalidConfiguration(_)
          | Error::Io(_) => {
              RelayResponse::failure("relay misconfigured")
                .with_details(e.to_string())
            }
        }
    }
}
