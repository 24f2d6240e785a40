//! Preference-then-fallback model selection

use std::collections::HashMap;
use log::debug;

use crate::ModelDescriptor;

/// Ordered, operator curated model preference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceList
{   pub models: Vec<String>
}

impl PreferenceList
{   pub fn new(models: Vec<String>) -> Self
    {   debug!(
          "Creating preference list with {} models",
          models.len()
        );
        PreferenceList { models }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str>
    {   self.models.iter().map(String::as_str)
    }
}

impl Default for PreferenceList
{   fn default() -> Self
    {   PreferenceList::new(
          crate::config::DEFAULT_PREFERRED_MODELS
            .iter()
            .map(|m| m.to_string())
            .collect()
        )
    }
}

/// Pick the model to generate with.
///
/// The first preferred identifier that is listed and supports
/// `generateContent` wins; otherwise the first capable model in the
/// order upstream listed them. `None` when nothing is capable.
pub fn select_model<'a>(
  preferences: &PreferenceList
, models: &'a [ModelDescriptor]
) -> Option<&'a ModelDescriptor>
{   let by_name: HashMap<&str, &ModelDescriptor> = models
      .iter()
      .filter(|m| !m.name.is_empty())
      .map(|m| (m.name.as_str(), m))
      .collect();

    let preferred = preferences
      .iter()
      .filter_map(|name| by_name.get(name).copied())
      .find(|m| m.supports(crate::GENERATE_CONTENT));

    if let Some(model) = preferred
    {   debug!("Selected preferred model {}", model.name);
        return Some(model);
    }

    let fallback = models
      .iter()
      .find(|m| !m.name.is_empty() && m.supports(crate::GENERATE_CONTENT));
    if let Some(model) = fallback
    {   debug!("No preferred model available, falling back to {}", model.name);
    }
    fallback
}
