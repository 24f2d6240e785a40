//! Upstream provider clients

pub mod gemini;

// Re-export for convenience
pub use gemini::GeminiClient;
