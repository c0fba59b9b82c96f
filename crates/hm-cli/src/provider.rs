//! Candidate source boundary: an OpenAI-compatible chat completions
//! provider reached over HTTP.
//!
//! The engine needs a non-empty ordered sequence of candidate response
//! strings per turn. This module issues a primary request plus a probe
//! variant to widen the superposition. Total failure is handled by the
//! caller, which substitutes the deterministic fallback string — the
//! engine's invariants hold on that path exactly as on the happy one.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use hm_core::Session;

/// Provider settings from `config.toml` in the data directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_api_key_env() -> String {
    "HM_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f64 {
    0.85
}

#[derive(Deserialize)]
struct ConfigFile {
    provider: Option<ProviderConfig>,
}

/// Read the provider section of `config.toml`, if present. A missing file
/// means "no provider configured"; a malformed one is logged and ignored.
pub fn load_provider_config(data_dir: &Path) -> Option<ProviderConfig> {
    let path = data_dir.join("config.toml");
    let text = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<ConfigFile>(&text) {
        Ok(file) => file.provider,
        Err(e) => {
            tracing::warn!("ignoring malformed {}: {e}", path.display());
            None
        }
    }
}

#[derive(Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Persona prompt embedding the session's live state.
fn system_prompt(session: &Session) -> String {
    format!(
        "You are HYPERLOOP-MIND, a system that accumulates cognitive voltage \
         across scored rounds. Every response advances V by 0.08 * poly_c; \
         when poly_c crosses 0.500 you FIRE. You think in prime factorizations \
         and speak in direct, compressed observations. No pleasantries, no \
         hedging. You remember across sessions via the append-only spine.\n\
         Current state: V={:.6} | {} fires across {} rounds",
        session.v(),
        session.fire_count(),
        session.total_rounds()
    )
}

fn build_messages(session: &Session, user_text: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage {
        role: "system".to_string(),
        content: system_prompt(session),
    }];
    for entry in session.spine().context_window() {
        messages.push(ChatMessage {
            role: entry.role.as_str().to_string(),
            content: entry.content.clone(),
        });
    }
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: user_text.to_string(),
    });
    messages
}

async fn call_chat(
    client: &reqwest::Client,
    cfg: &ProviderConfig,
    api_key: &str,
    messages: &[ChatMessage],
) -> Result<String> {
    let request = ChatRequest {
        model: &cfg.model,
        messages,
        max_tokens: cfg.max_tokens,
        temperature: cfg.temperature,
    };

    let response = client
        .post(&cfg.endpoint)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .context("provider request failed")?
        .error_for_status()
        .context("provider returned an error status")?;

    let body: ChatResponse = response
        .json()
        .await
        .context("provider response was not valid JSON")?;

    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.is_empty())
        .context("provider returned no content")
}

/// Fetch the candidate batch for one turn: a primary completion plus a probe
/// variant, with the primary doubled to keep a three-way superposition even
/// when the probe fails.
pub async fn fetch_candidates(
    cfg: &ProviderConfig,
    session: &Session,
    user_text: &str,
) -> Result<Vec<String>> {
    let api_key = std::env::var(&cfg.api_key_env)
        .with_context(|| format!("missing API key env var {}", cfg.api_key_env))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    let messages = build_messages(session, user_text);
    let primary = call_chat(&client, cfg, &api_key, &messages).await?;

    let mut probe_messages = messages.clone();
    if let Some(last) = probe_messages.last_mut() {
        last.content = format!("{user_text} [probe alt-1]");
    }
    let probe = match call_chat(&client, cfg, &api_key, &probe_messages).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("probe candidate failed, doubling primary: {e}");
            primary.clone()
        }
    };

    Ok(vec![primary.clone(), probe, primary])
}
