use std::sync::Arc;
use log::{debug, error, info, warn};

use crate::config::GeminiConfig;
use crate::error::Error;
use crate::extract::Extractor;
use crate::providers::GeminiClient;
use crate::request::RelayResponse;
use crate::resolver::ModelResolver;
use crate::selection::PreferenceList;
use crate::Credential;

/// Answer to one prompt: the extracted text and the decoded response
#[derive(Debug, Clone, PartialEq)]
pub struct Answer
{   pub model: String
  , pub text: String
  , pub raw: serde_json::Value
}

/// Prompt relay: model resolution, generation and extraction.
/// Shared by every request handler; the model cache lives here.
pub struct Relay
{   client: Arc<GeminiClient>
  , resolver: ModelResolver
  , extractor: Extractor
}

impl Relay
{   pub fn new(
      config: &GeminiConfig
    , credential: Option<Credential>
    ) -> Self
    {   debug!("Creating Relay");
        let client = Arc::new(GeminiClient::new(config, credential));
        let resolver = ModelResolver::new(
          client.clone(),
          PreferenceList::new(config.preferred_models.clone())
        );
        Relay
        {   client
          , resolver
          , extractor: Extractor::default()
        }
    }

    /// Replace the extractor, e.g. to add a response shape
    pub fn with_extractor(mut self, extractor: Extractor) -> Self
    {   self.extractor = extractor;
        self
    }

    pub fn resolver(&self) -> &ModelResolver
    {   &self.resolver
    }

    /// Run one prompt through resolution, generation and extraction
    pub async fn generate(&self, prompt: &str)
      -> Result<Answer, Error>
    {   if !self.client.has_credential()
        {   warn!("Prompt rejected: no usable API key");
            return Err(Error::NoCredential);
        }

        let model = self.resolver.resolve().await.map_err(|e| {
          error!("Model selection failed: {}", e);
          e
        })?;

        let raw = self.client
          .generate_content(&model.name, prompt)
          .await?;

        match self.extractor.extract(&raw)
        {   Some(text) => {
              debug!("Extracted {} characters of answer text", text.len());
              Ok(Answer
              {   model: model.name
                , text: text.to_string()
                , raw
              })
            }
          , None => {
              warn!("Could not extract text from model response");
              Err(Error::ExtractionMiss { raw })
            }
        }
    }

    /// Same as `generate`, folded into the wire response
    pub async fn ask(&self, prompt: &str) -> RelayResponse
    {   match self.generate(prompt).await
        {   Ok(answer) => {
              info!("Answered prompt with {}", answer.model);
              RelayResponse::success(answer.text, answer.raw)
            }
          , Err(e) => RelayResponse::from(e)
        }
    }
}
