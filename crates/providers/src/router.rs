//! Provider router: selects the LLM backend named by the configuration.

use std::sync::Arc;

use sessiondigest_config::{AppConfig, ProviderKind};
use sessiondigest_core::error::ProviderError;
use sessiondigest_core::provider::Provider;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider selected by `config.provider`.
///
/// Hosted backends need an API key; Ollama and custom endpoints do not.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let kind = config.provider;
    let base_url = base_url_for(config)?;

    let api_key = match (config.resolved_api_key(), kind) {
        (Some(key), _) => key,
        (None, ProviderKind::Ollama) => "ollama".to_string(),
        (None, ProviderKind::Custom) => String::new(),
        (None, _) => {
            let hint = kind
                .api_key_env()
                .map(|var| format!(" (set {var} or SESSIONDIGEST_API_KEY)"))
                .unwrap_or_default();
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{kind}'{hint}"
            )));
        }
    };

    debug!(provider = %kind, base_url = %base_url, "Building provider");

    Ok(Arc::new(OpenAiCompatProvider::new(
        kind.as_str(),
        base_url,
        api_key,
    )))
}

/// The endpoint for the configured provider: `providers.<name>.api_url` when
/// set, the well-known default otherwise.
pub fn base_url_for(config: &AppConfig) -> Result<String, ProviderError> {
    let kind = config.provider;
    let configured = config
        .providers
        .get(kind.as_str())
        .and_then(|p| p.api_url.clone());

    match (configured, default_base_url(kind)) {
        (Some(url), _) => Ok(url),
        (None, Some(url)) => Ok(url.to_string()),
        (None, None) => Err(ProviderError::NotConfigured(format!(
            "provider '{kind}' needs providers.{kind}.api_url"
        ))),
    }
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(kind: ProviderKind) -> Option<&'static str> {
    match kind {
        ProviderKind::OpenAi => Some("https://api.openai.com/v1"),
        ProviderKind::TogetherAi => Some("https://api.together.xyz/v1"),
        ProviderKind::OpenRouter => Some("https://openrouter.ai/api/v1"),
        ProviderKind::Ollama => Some("http://localhost:11434/v1"),
        ProviderKind::Custom => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessiondigest_config::ProviderConfig;

    #[test]
    fn openai_with_key_builds() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn hosted_provider_without_key_is_not_configured() {
        let config = AppConfig {
            provider: ProviderKind::TogetherAi,
            ..AppConfig::default()
        };
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("TOGETHER_API_KEY"));
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = AppConfig {
            provider: ProviderKind::Ollama,
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn configured_url_overrides_default() {
        let mut config = AppConfig {
            provider: ProviderKind::OpenRouter,
            ..AppConfig::default()
        };
        config.providers.insert(
            "openrouter".into(),
            ProviderConfig {
                api_key: Some("or-key".into()),
                api_url: Some("http://proxy.local/v1".into()),
            },
        );
        assert_eq!(base_url_for(&config).unwrap(), "http://proxy.local/v1");
        assert!(build_from_config(&config).is_ok());
    }

    #[test]
    fn custom_without_url_is_rejected() {
        let config = AppConfig {
            provider: ProviderKind::Custom,
            ..AppConfig::default()
        };
        assert!(base_url_for(&config).is_err());
        assert_eq!(default_base_url(ProviderKind::Custom), None);
    }

    #[test]
    fn well_known_defaults() {
        assert!(
            default_base_url(ProviderKind::TogetherAi)
                .unwrap()
                .contains("together.xyz")
        );
        assert!(
            default_base_url(ProviderKind::Ollama)
                .unwrap()
                .contains("11434")
        );
    }
}
