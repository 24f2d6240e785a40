use std::fmt;

/// Error type for relay operations
/// Implements Clone so results can be shared and compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Credential missing, blank or still the placeholder
    NoCredential
  , /// Listing models failed (transport, status, decode or embedded error)
    UpstreamListError
    {   status: Option<u16>
      , message: String
    }
  , /// No listed model supports generateContent
    NoCapableModel(String)
  , /// The generation request never produced a response
    TransportError(String)
  , /// The generation endpoint answered with a non-success status
    UpstreamGenerationError
    {   status: u16
      , body: serde_json::Value
    }
  , /// Success status but the body was not JSON (truncated raw text)
    DecodeError
    {   body: String
    }
  , /// Valid JSON with no recognizable answer text
    ExtractionMiss
    {   raw: serde_json::Value
    }
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Socket or filesystem failure
    Io(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::NoCredential => {
              write!(f, "GEMINI_API_KEY not set or is invalid placeholder")
            }
          , Error::UpstreamListError { status: Some(status), message } => {
              write!(f,
                "ListModels failed: status={} {}",
                status,
                message
              )
            }
          , Error::UpstreamListError { status: None, message } => {
              write!(f, "ListModels failed: {}", message)
            }
          , Error::NoCapableModel(msg) => {
              write!(f, "{}", msg)
            }
          , Error::TransportError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::UpstreamGenerationError { status, .. } => {
              write!(f,
                "Model endpoint returned status {}",
                status
              )
            }
          , Error::DecodeError { .. } => {
              write!(f, "Model returned non-JSON body")
            }
          , Error::ExtractionMiss { .. } => {
              write!(f, "No text found in model response")
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Io(msg) => {
              write!(f, "I/O error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Io(e.to_string())
    }
}

/// Describe a reqwest failure without the request URL.
/// Upstream URLs carry the credential as a query parameter.
pub(crate) fn describe_transport(e: reqwest::Error) -> String
{   let timed_out = e.is_timeout();
    let e = e.without_url();
    let mut text = e.to_string();
    let mut source = std::error::Error::source(&e);
    while let Some(cause) = source
    {   text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    if timed_out && !text.contains("timed out")
    {   format!("{} (timed out)", text)
    } else
    {   text
    }
}
