use secrecy::ExposeSecret;

use homequote_core::config::{AppConfig, LoadOptions};

use super::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "validation", error.to_string(), 1);
        }
    };

    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|secret| redact(secret.expose_secret()))
        .unwrap_or_else(|| "(unset)".to_string());

    let lines = [
        "effective config (source precedence: env > file > default):".to_string(),
        format!("  database.url = {}", config.database.url),
        format!("  database.max_connections = {}", config.database.max_connections),
        format!("  database.timeout_secs = {}", config.database.timeout_secs),
        format!("  llm.provider = {:?}", config.llm.provider),
        format!("  llm.api_key = {api_key}"),
        format!("  llm.base_url = {}", config.llm.base_url.as_deref().unwrap_or("(unset)")),
        format!("  llm.model = {}", config.llm.model),
        format!("  llm.timeout_secs = {}", config.llm.timeout_secs),
        format!(
            "  estimate.collaborator_timeout_secs = {}",
            config.estimate.collaborator_timeout_secs
        ),
        format!("  logging.level = {}", config.logging.level),
        format!("  logging.format = {:?}", config.logging.format),
    ];

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn redact(secret: &str) -> String {
    if secret.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &secret[..4])
}
