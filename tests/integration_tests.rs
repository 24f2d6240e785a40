use std::collections::HashMap;
use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use gemini_relay::config::{GeminiConfig, RelayConfig};
use gemini_relay::providers::GeminiClient;
use gemini_relay::selection::PreferenceList;
use gemini_relay::{Credential, Error, ModelResolver, Relay};

const TEST_KEY: &str = "test-key-123";

const FLASH_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn config_for(server: &ServerGuard) -> GeminiConfig
{   GeminiConfig
    {   api_base: server.url()
      , list_timeout_secs: 5
      , generate_timeout_secs: 5
      , ..GeminiConfig::default()
    }
}

fn credential() -> Option<Credential>
{   Credential::new(TEST_KEY)
}

fn key_query() -> Matcher
{   Matcher::UrlEncoded("key".into(), TEST_KEY.into())
}

fn models_body() -> Value
{   json!({
      "models": [
        {   "name": "models/embedding-001"
          , "supportedGenerationMethods": ["embedContent"]
        }
      , {   "name": "models/gemini-2.0-flash"
          , "displayName": "Gemini 2.0 Flash"
          , "inputTokenLimit": 1048576
          , "supportedGenerationMethods": ["generateContent", "countTokens"]
        }
      , {   "name": "models/gemini-2.5-flash"
          , "supportedGenerationMethods": ["generateContent"]
        }
      ]
    })
}

fn answer_body(text: &str) -> Value
{   json!({
      "candidates": [
        {   "content": { "parts": [ { "text": text } ], "role": "model" }
          , "finishReason": "STOP"
        }
      ]
    })
}

async fn mock_models(server: &mut ServerGuard, body: Value, hits: usize)
  -> mockito::Mock
{   server.mock("GET", "/v1/models")
      .match_query(key_query())
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body.to_string())
      .expect(hits)
      .create_async()
      .await
}

// ===== Credential and configuration =====

#[test]
fn test_placeholder_and_blank_keys_are_rejected()
{   assert!(Credential::new("").is_none());
    assert!(Credential::new("   ").is_none());
    assert!(Credential::new(gemini_relay::PLACEHOLDER_API_KEY).is_none());
    assert!(Credential::new("AIza-real-looking").is_some());
}

#[test]
fn test_credential_debug_is_redacted()
{   let key = assert_ok!(Credential::new("super-secret").ok_or(()));
    let shown = format!("{:?}", key);
    assert!(!shown.contains("super-secret"));
}

#[test]
fn test_config_from_lookup()
{   let vars: HashMap<&str, &str> = HashMap::from([
      ("GEMINI_API_BASE", "http://localhost:9000/")
    , ("GEMINI_GENERATE_TIMEOUT_SECS", "40")
    , ("GEMINI_PREFERRED_MODELS", "models/a, models/b,,")
    , ("RELAY_BIND_ADDR", "0.0.0.0:8080")
    ]);
    let config = assert_ok!(RelayConfig::from_lookup(|k| {
      vars.get(k).map(|v| v.to_string())
    }));
    assert_eq!(config.gemini.api_base, "http://localhost:9000");
    assert_eq!(config.gemini.list_timeout_secs, 15);
    assert_eq!(config.gemini.generate_timeout_secs, 40);
    assert_eq!(config.gemini.preferred_models, vec!["models/a", "models/b"]);
    assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
}

#[test]
fn test_config_rejects_bad_timeout()
{   let err = assert_err!(RelayConfig::from_lookup(|k| {
      (k == "GEMINI_LIST_TIMEOUT_SECS").then(|| "soon".to_string())
    }));
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

// ===== Model resolution =====

#[tokio::test]
async fn test_resolver_prefers_listed_preference_and_caches()
{   let mut server = Server::new_async().await;
    let list = mock_models(&mut server, models_body(), 1).await;

    let client = Arc::new(GeminiClient::new(&config_for(&server), credential()));
    let resolver = ModelResolver::new(client, PreferenceList::default());
    assert!(!resolver.is_cached());

    let first = assert_ok!(resolver.resolve().await);
    let second = assert_ok!(resolver.resolve().await);
    assert_eq!(first.name, "models/gemini-2.5-flash");
    assert_eq!(first.method, "generateContent");
    assert_eq!(first, second);
    assert!(resolver.is_cached());

    let models = assert_ok!(resolver.models().await);
    assert_eq!(models.len(), 3);
    assert_eq!(models[1].display_name.as_deref(), Some("Gemini 2.0 Flash"));

    list.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_first_resolves_share_one_fetch()
{   let mut server = Server::new_async().await;
    let list = mock_models(&mut server, models_body(), 1).await;

    let client = Arc::new(GeminiClient::new(&config_for(&server), credential()));
    let resolver = ModelResolver::new(client, PreferenceList::default());

    let (a, b, c) = tokio::join!(
      resolver.resolve(),
      resolver.resolve(),
      resolver.resolve()
    );
    assert_eq!(assert_ok!(a).name, "models/gemini-2.5-flash");
    assert_eq!(assert_ok!(b).name, "models/gemini-2.5-flash");
    assert_eq!(assert_ok!(c).name, "models/gemini-2.5-flash");

    list.assert_async().await;
}

#[tokio::test]
async fn test_separate_resolvers_have_separate_caches()
{   let mut server = Server::new_async().await;
    let list = mock_models(&mut server, models_body(), 2).await;

    for _ in 0..2
    {   let client = Arc::new(
          GeminiClient::new(&config_for(&server), credential())
        );
        let resolver = ModelResolver::new(client, PreferenceList::default());
        assert_ok!(resolver.resolve().await);
    }

    list.assert_async().await;
}

#[tokio::test]
async fn test_resolver_without_capable_model()
{   let mut server = Server::new_async().await;
    let body = json!({
      "models": [
        { "name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"] }
      , { "name": "models/aqa" }
      ]
    });
    let list = mock_models(&mut server, body, 1).await;

    let client = Arc::new(GeminiClient::new(&config_for(&server), credential()));
    let resolver = ModelResolver::new(client, PreferenceList::default());
    let err = assert_err!(resolver.resolve().await);
    assert!(matches!(err, Error::NoCapableModel(_)));

    list.assert_async().await;
}

#[tokio::test]
async fn test_resolver_reports_embedded_api_error()
{   let mut server = Server::new_async().await;
    let list = server.mock("GET", "/v1/models")
      .match_query(key_query())
      .with_status(400)
      .with_header("content-type", "application/json")
      .with_body(json!({
        "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
      }).to_string())
      .expect(1)
      .create_async()
      .await;

    let client = Arc::new(GeminiClient::new(&config_for(&server), credential()));
    let resolver = ModelResolver::new(client, PreferenceList::default());
    let err = assert_err!(resolver.resolve().await);
    match err
    {   Error::UpstreamListError { status, message } => {
          assert_eq!(status, Some(400));
          assert!(message.contains("API key not valid."));
        }
      , other => panic!("unexpected error: {:?}", other)
    }

    list.assert_async().await;
}

#[tokio::test]
async fn test_list_failure_is_not_cached()
{   let mut server = Server::new_async().await;
    let broken = server.mock("GET", "/v1/models")
      .match_query(key_query())
      .with_status(502)
      .with_body("<html>bad gateway</html>")
      .expect(1)
      .create_async()
      .await;

    let client = Arc::new(GeminiClient::new(&config_for(&server), credential()));
    let resolver = ModelResolver::new(client, PreferenceList::default());

    let err = assert_err!(resolver.resolve().await);
    match err
    {   Error::UpstreamListError { status, message } => {
          assert_eq!(status, Some(502));
          assert!(message.contains("bad gateway"));
        }
      , other => panic!("unexpected error: {:?}", other)
    }
    assert!(!resolver.is_cached());
    broken.assert_async().await;
    broken.remove_async().await;

    let list = mock_models(&mut server, models_body(), 1).await;
    assert_ok!(resolver.resolve().await);
    list.assert_async().await;
}

#[tokio::test]
async fn test_list_transport_error_hides_key()
{   let listener = assert_ok!(std::net::TcpListener::bind("127.0.0.1:0"));
    let addr = assert_ok!(listener.local_addr());
    drop(listener);

    let config = GeminiConfig
    {   api_base: format!("http://{}", addr)
      , list_timeout_secs: 2
      , ..GeminiConfig::default()
    };
    let relay = Relay::new(&config, credential());
    let response = relay.ask("hello").await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("model selection failed"));
    let details = response.details.unwrap_or_default();
    assert!(details.starts_with("ListModels failed"));
    assert!(!details.contains(TEST_KEY));
}

// ===== Prompt relay =====

#[tokio::test]
async fn test_missing_credential_makes_no_calls()
{   let mut server = Server::new_async().await;
    let list = mock_models(&mut server, models_body(), 0).await;
    let generate = server.mock("POST", Matcher::Any)
      .expect(0)
      .create_async()
      .await;

    for key in [None, Credential::new(gemini_relay::PLACEHOLDER_API_KEY)]
    {   let relay = Relay::new(&config_for(&server), key);
        let response = relay.ask("hello").await;
        assert!(!response.success);
        assert_eq!(
          response.error.as_deref(),
          Some("GEMINI_API_KEY missing or invalid on server")
        );
        assert_eq!(
          assert_err!(relay.generate("hello").await),
          Error::NoCredential
        );
    }

    list.assert_async().await;
    generate.assert_async().await;
}

#[tokio::test]
async fn test_prompt_success()
{   let mut server = Server::new_async().await;
    let list = mock_models(&mut server, models_body(), 1).await;
    let generate = server.mock("POST", FLASH_PATH)
      .match_query(key_query())
      .match_body(Matcher::Json(json!({
        "contents": [ { "parts": [ { "text": "Hello, are you working?" } ] } ]
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(answer_body("Yes, I am working.").to_string())
      .expect(2)
      .create_async()
      .await;

    let relay = Relay::new(&config_for(&server), credential());
    for _ in 0..2
    {   let response = relay.ask("Hello, are you working?").await;
        assert!(response.success);
        assert_eq!(response.text.as_deref(), Some("Yes, I am working."));
        assert_eq!(response.raw, Some(answer_body("Yes, I am working.")));
        assert!(response.error.is_none());
    }

    list.assert_async().await;
    generate.assert_async().await;
}

#[tokio::test]
async fn test_no_capable_model_skips_generation()
{   let mut server = Server::new_async().await;
    let list = mock_models(&mut server, json!({ "models": [] }), 1).await;
    let generate = server.mock("POST", Matcher::Any)
      .expect(0)
      .create_async()
      .await;

    let relay = Relay::new(&config_for(&server), credential());
    let response = relay.ask("hello").await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("model selection failed"));
    assert_eq!(
      response.details.as_deref(),
      Some("No models returned by ListModels")
    );

    list.assert_async().await;
    generate.assert_async().await;
}

#[tokio::test]
async fn test_non_200_generation_embeds_status()
{   let mut server = Server::new_async().await;
    let _list = mock_models(&mut server, models_body(), 1).await;
    let error_body = json!({
      "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
    });
    let _generate = server.mock("POST", FLASH_PATH)
      .match_query(key_query())
      .with_status(429)
      .with_header("content-type", "application/json")
      .with_body(error_body.to_string())
      .create_async()
      .await;

    let relay = Relay::new(&config_for(&server), credential());
    let response = relay.ask("hello").await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Model endpoint returned non-200"));
    assert_eq!(response.status, Some(429));
    assert_eq!(response.body, Some(error_body));
}

#[tokio::test]
async fn test_non_200_plain_text_body_is_truncated()
{   let mut server = Server::new_async().await;
    let _list = mock_models(&mut server, models_body(), 1).await;
    let _generate = server.mock("POST", FLASH_PATH)
      .match_query(key_query())
      .with_status(503)
      .with_body("x".repeat(5000))
      .create_async()
      .await;

    let relay = Relay::new(&config_for(&server), credential());
    let response = relay.ask("hello").await;
    assert_eq!(response.status, Some(503));
    assert_eq!(response.body, Some(Value::String("x".repeat(2000))));
}

#[tokio::test]
async fn test_non_json_success_is_decode_failure()
{   let mut server = Server::new_async().await;
    let _list = mock_models(&mut server, models_body(), 1).await;
    let _generate = server.mock("POST", FLASH_PATH)
      .match_query(key_query())
      .with_status(200)
      .with_body("<html>not json</html>")
      .create_async()
      .await;

    let relay = Relay::new(&config_for(&server), credential());
    let response = relay.ask("hello").await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Model returned non-JSON"));
    assert_eq!(
      response.body,
      Some(Value::String("<html>not json</html>".to_string()))
    );
}

#[tokio::test]
async fn test_unrecognized_response_returns_raw()
{   let mut server = Server::new_async().await;
    let _list = mock_models(&mut server, models_body(), 1).await;
    let blocked = json!({
      "promptFeedback": { "blockReason": "SAFETY" },
      "candidates": []
    });
    let _generate = server.mock("POST", FLASH_PATH)
      .match_query(key_query())
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(blocked.to_string())
      .create_async()
      .await;

    let relay = Relay::new(&config_for(&server), credential());
    let response = relay.ask("hello").await;
    assert!(!response.success);
    assert_eq!(
      response.error.as_deref(),
      Some("Could not extract text from model response")
    );
    assert_eq!(response.raw, Some(blocked.clone()));

    let err = assert_err!(relay.generate("hello").await);
    assert_eq!(err, Error::ExtractionMiss { raw: blocked });
}

#[tokio::test]
async fn test_transport_error_maps_to_http_error()
{   let response = gemini_relay::RelayResponse::from(
      Error::TransportError("operation timed out".to_string())
    );
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("HTTP error contacting Gemini"));
    assert_eq!(response.details.as_deref(), Some("operation timed out"));

    let wire = assert_ok!(serde_json::to_value(&response));
    assert_eq!(wire, json!({
      "success": false,
      "error": "HTTP error contacting Gemini",
      "details": "operation timed out"
    }));
}

#[tokio::test]
async fn test_list_error_status_with_json_body_is_not_cached()
{   let mut server = Server::new_async().await;
    let unavailable = server.mock("GET", "/v1/models")
      .match_query(key_query())
      .with_status(503)
      .with_header("content-type", "application/json")
      .with_body(models_body().to_string())
      .expect(1)
      .create_async()
      .await;

    let client = Arc::new(GeminiClient::new(&config_for(&server), credential()));
    let resolver = ModelResolver::new(client, PreferenceList::default());

    let err = assert_err!(resolver.resolve().await);
    match err
    {   Error::UpstreamListError { status, message } => {
          assert_eq!(status, Some(503));
          assert!(message.starts_with("body="));
        }
      , other => panic!("unexpected error: {:?}", other)
    }
    assert!(!resolver.is_cached());
    unavailable.assert_async().await;
}

#[tokio::test]
async fn test_stalled_generation_times_out_as_transport_failure()
{   use std::io::Write;

    let mut server = Server::new_async().await;
    let _list = mock_models(&mut server, models_body(), 1).await;
    let _generate = server.mock("POST", FLASH_PATH)
      .match_query(key_query())
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_chunked_body(|w| {
        w.write_all(b"{\"candidates\":")?;
        std::thread::sleep(std::time::Duration::from_secs(3));
        w.write_all(b"[]}")
      })
      .create_async()
      .await;

    let config = GeminiConfig
    {   generate_timeout_secs: 1
      , ..config_for(&server)
    };
    let relay = Relay::new(&config, credential());

    let started = std::time::Instant::now();
    let response = relay.ask("hello").await;
    assert!(started.elapsed() < std::time::Duration::from_secs(3));

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("HTTP error contacting Gemini"));
    let details = response.details.unwrap_or_default();
    assert!(details.contains("timed out"), "details: {}", details);
    assert!(!details.contains(TEST_KEY));
    assert!(response.status.is_none());
}
