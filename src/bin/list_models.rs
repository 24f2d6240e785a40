// List the models the configured key can use and show which one the
// relay would pick.
// Usage: GEMINI_API_KEY=xxx cargo run --bin list_models

use std::sync::Arc;

use gemini_relay::config::RelayConfig;
use gemini_relay::providers::GeminiClient;
use gemini_relay::selection::PreferenceList;
use gemini_relay::{Credential, ModelResolver};

#[tokio::main]
async fn main()
{   let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("warn")
    ).init();

    if let Err(e) = run().await
    {   eprintln!("Error: {}", e);
        eprintln!("\nMake sure GEMINI_API_KEY is set:");
        eprintln!("  export GEMINI_API_KEY=your-key-here");
        eprintln!("  cargo run --bin list_models");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), gemini_relay::Error>
{   let config = RelayConfig::from_env()?;
    let credential = Credential::from_env();

    println!("Requesting {}/v1/models...", config.gemini.api_base);
    let client = Arc::new(GeminiClient::new(&config.gemini, credential));
    let resolver = ModelResolver::new(
      client,
      PreferenceList::new(config.gemini.preferred_models.clone())
    );

    let models = resolver.models().await?;
    println!("{} models available:", models.len());
    for model in models
    {   println!(
          "  {:<45} {}",
          model.name,
          model.supported_generation_methods.join(", ")
        );
    }

    let resolved = resolver.resolve().await?;
    println!("\nRelay would use: {} ({})", resolved.name, resolved.method);
    Ok(())
}
