use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{debug, trace, error, warn};
use std::time::Duration;

use crate::error::{describe_transport, Error};
use crate::{short_model_name, truncate_chars, Credential, ModelDescriptor, RAW_BODY_LIMIT};

/// Raw generation responses are logged up to this many characters
const RAW_LOG_LIMIT: usize = 4000;

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   pub text: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   pub parts: Vec<Part>
}

/// Body of a generateContent call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
}

impl GenerateContentRequest
{   /// Single-turn request carrying one prompt
    pub fn from_prompt(prompt: &str) -> Self
    {   GenerateContentRequest
        {   contents: vec![
              Content
              {   parts: vec![
                    Part
                    {   text: prompt.to_string()
                    }
                  ]
              }
            ]
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ListModelsResponse
{   #[serde(default)]
    models: Vec<Value>
}

// ===== Gemini Client =====

/// HTTP client for the Generative Language API.
/// Holds the credential; every call fails with `NoCredential` without it.
pub struct GeminiClient
{   api_base: String
  , credential: Option<Credential>
  , list_timeout: Duration
  , generate_timeout: Duration
  , http_client: reqwest::Client
}

impl GeminiClient
{   pub fn new(
      config: &crate::config::GeminiConfig
    , credential: Option<Credential>
    ) -> Self
    {   debug!("Creating GeminiClient for {}", config.api_base);
        if credential.is_none()
        {   warn!("{} not found or is a placeholder; upstream calls will fail",
              crate::API_KEY_ENV
            );
        }
        GeminiClient
        {   api_base: config.api_base.trim_end_matches('/').to_string()
          , credential
          , list_timeout: config.list_timeout()
          , generate_timeout: config.generate_timeout()
          , http_client: reqwest::Client::new()
        }
    }

    pub fn has_credential(&self) -> bool
    {   self.credential.is_some()
    }

    fn api_key(&self) -> Result<&str, Error>
    {   self.credential
          .as_ref()
          .map(Credential::expose)
          .ok_or_else(|| {
            error!("No usable API key configured");
            Error::NoCredential
          })
    }

    /// GET /v1/models
    pub async fn list_models(
      &self
    ) -> Result<Vec<ModelDescriptor>, Error>
    {   debug!("Listing models");
        let api_key = self.api_key()?;

        let response = self.http_client
          .get(format!("{}/v1/models", self.api_base))
          .query(&[("key", api_key)])
          .timeout(self.list_timeout)
          .send()
          .await
          .map_err(|e| {
            let message = describe_transport(e);
            error!("Failed to fetch models: {}", message);
            Error::UpstreamListError { status: None, message }
          })?;

        let status = response.status();
        trace!("Models response status: {}", status);

        let body = response.text().await.map_err(|e| {
          let message = describe_transport(e);
          error!("Failed to read models body: {}", message);
          Error::UpstreamListError
          {   status: Some(status.as_u16())
            , message
          }
        })?;

        let data: Value = serde_json::from_str(&body).map_err(|e| {
          error!("Models body is not JSON: {}", e);
          Error::UpstreamListError
          {   status: Some(status.as_u16())
            , message: format!(
                "body={}",
                truncate_chars(&body, RAW_BODY_LIMIT)
              )
          }
        })?;

        if let Some(api_error) = data.get("error")
        {   let message = api_error
              .get("message")
              .and_then(Value::as_str)
              .unwrap_or("Unknown API error");
            error!("Gemini API error while listing models: {}", message);
            return Err(Error::UpstreamListError
            {   status: Some(status.as_u16())
              , message: format!("Gemini API Error: {}", message)
            });
        }

        if !status.is_success()
        {   error!("Listing models returned {}", status);
            return Err(Error::UpstreamListError
            {   status: Some(status.as_u16())
              , message: format!(
                  "body={}",
                  truncate_chars(&body, RAW_BODY_LIMIT)
                )
            });
        }

        let listing: ListModelsResponse
          = serde_json::from_value(data).unwrap_or_else(|e| {
            warn!("Models body has no usable models array: {}", e);
            ListModelsResponse::default()
          });

        let models: Vec<ModelDescriptor> = listing.models
          .into_iter()
          .filter_map(|m| serde_json::from_value(m).ok())
          .collect();

        debug!("Retrieved {} models", models.len());
        Ok(models)
    }

    /// POST /v1beta/models/{model}:generateContent.
    /// Returns the decoded response tree untouched.
    pub async fn generate_content(
      &self
    , model: &str
    , prompt: &str
    ) -> Result<Value, Error>
    {   let api_key = self.api_key()?;
        let model_short = short_model_name(model);
        debug!("Generating content with {}", model_short);

        let request = GenerateContentRequest::from_prompt(prompt);
        trace!("Gemini request: {:?}", request);

        let response = self.http_client
          .post(format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base,
            model_short
          ))
          .query(&[("key", api_key)])
          .timeout(self.generate_timeout)
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            let message = describe_transport(e);
            error!("HTTP request exception: {}", message);
            Error::TransportError(message)
          })?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        let body = response.text().await.map_err(|e| {
          let message = describe_transport(e);
          error!("Failed to read response body: {}", message);
          Error::TransportError(message)
        })?;

        if !status.is_success()
        {   error!("Model endpoint returned {}", status);
            let body = serde_json::from_str::<Value>(&body)
              .unwrap_or_else(|_| {
                Value::String(truncate_chars(&body, RAW_BODY_LIMIT))
              });
            return Err(Error::UpstreamGenerationError
            {   status: status.as_u16()
              , body
            });
        }

        let data: Value = serde_json::from_str(&body).map_err(|e| {
          error!("Model returned non-JSON: {}", e);
          Error::DecodeError
          {   body: truncate_chars(&body, RAW_BODY_LIMIT)
          }
        })?;

        if log::log_enabled!(log::Level::Trace)
        {   let pretty = serde_json::to_string_pretty(&data)
              .unwrap_or_default();
            trace!(
              "Raw Gemini response (truncated):\n{}",
              truncate_chars(&pretty, RAW_LOG_LIMIT)
            );
        }

        Ok(data)
    }
}
