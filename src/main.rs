use log::{debug, error, info};

use gemini_relay::config::RelayConfig;
use gemini_relay::Credential;

#[tokio::main]
async fn main()
{   let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    match dotenv
    {   Ok(path) => info!("Loaded environment from {}", path.display())
      , Err(e) => debug!("No .env file loaded: {}", e)
    }

    let config = match RelayConfig::from_env()
    {   Ok(config) => config
      , Err(e) => {
          error!("{}", e);
          std::process::exit(1);
        }
    };

    let credential = Credential::from_env();
    if let Err(e) = gemini_relay::server::serve(config, credential).await
    {   error!("Relay stopped: {}", e);
        std::process::exit(1);
    }
}
