//! Memoized model listing plus selection

use std::sync::Arc;
use tokio::sync::OnceCell;
use log::debug;

use crate::error::Error;
use crate::providers::GeminiClient;
use crate::selection::{select_model, PreferenceList};
use crate::{ModelDescriptor, ResolvedModel};

/// Resolves the model to generate with.
///
/// The upstream model list is fetched once per resolver and kept for its
/// whole lifetime. Concurrent first callers share one fetch; a failed
/// fetch is not cached.
pub struct ModelResolver
{   client: Arc<GeminiClient>
  , preferences: PreferenceList
  , models: OnceCell<Vec<ModelDescriptor>>
}

impl ModelResolver
{   pub fn new(
      client: Arc<GeminiClient>
    , preferences: PreferenceList
    ) -> Self
    {   ModelResolver
        {   client
          , preferences
          , models: OnceCell::new()
        }
    }

    /// Cached model list, fetching it on first use
    pub async fn models(&self) -> Result<&[ModelDescriptor], Error>
    {   if !self.client.has_credential()
        {   return Err(Error::NoCredential);
        }
        let models = self.models
          .get_or_try_init(|| async {
            debug!("Model cache empty, listing models");
            self.client.list_models().await
          })
          .await?;
        Ok(models.as_slice())
    }

    pub fn is_cached(&self) -> bool
    {   self.models.initialized()
    }

    pub fn preferences(&self) -> &PreferenceList
    {   &self.preferences
    }

    pub async fn resolve(&self) -> Result<ResolvedModel, Error>
    {   let models = self.models().await?;
        if models.is_empty()
        {   return Err(Error::NoCapableModel(
              "No models returned by ListModels".to_string()
            ));
        }

        let model = select_model(&self.preferences, models)
          .ok_or_else(|| {
            Error::NoCapableModel(format!(
              "No model supporting {} found for this API key",
              crate::GENERATE_CONTENT
            ))
          })?;

        debug!("Resolved generation model {}", model.name);
        Ok(ResolvedModel
        {   name: model.name.clone()
          , method: crate::GENERATE_CONTENT
        })
    }
}
