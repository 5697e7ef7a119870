use docent_tools::Repository;

use crate::describer::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::error::DocentError;

/// Where uploaded images are published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub token: String,
    pub repository: Repository,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub openai_api_url: String,
    pub openai_api_key: String,
    pub model: String,
    pub max_tokens: u32,

    /// `None` when GitHub publishing is not configured; uploads are inlined
    pub storage: Option<StorageConfig>,
    /// Repository directory uploads and captures are written under
    pub upload_dir: String,

    pub http_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, DocentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DocentError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let missing = |what: &str| DocentError::ConfigurationMissing(what.to_string());

        let storage = match (var("GITHUB_TOKEN"), var("GITHUB_REPO")) {
            (Some(token), Some(slug)) => {
                let branch = var("GITHUB_BRANCH").unwrap_or_default();
                let repository = Repository::parse(&slug, &branch).map_err(|e| {
                    DocentError::ConfigurationMissing(format!("GITHUB_REPO: {}", e))
                })?;
                Some(StorageConfig { token, repository })
            }
            (Some(_), None) => return Err(missing("GITHUB_REPO must be set with GITHUB_TOKEN")),
            (None, Some(_)) => return Err(missing("GITHUB_TOKEN must be set with GITHUB_REPO")),
            (None, None) => None,
        };

        Ok(Self {
            openai_api_url: var("OPENAI_API_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            openai_api_key: var("OPENAI_API_KEY")
                .ok_or_else(|| missing("OPENAI_API_KEY must be set"))?,
            model: var("DOCENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: match var("DOCENT_MAX_TOKENS") {
                Some(v) => v
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| missing("DOCENT_MAX_TOKENS must be a positive integer"))?,
                None => DEFAULT_MAX_TOKENS,
            },

            storage,
            upload_dir: var("DOCENT_UPLOAD_DIR")
                .map(|d| d.trim().trim_matches('/').to_string())
                .unwrap_or_else(|| "imgs".to_string()),

            http_port: var("HTTP_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .trim()
                .parse()
                .map_err(|_| missing("HTTP_PORT must be a valid port number"))?,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_url", &self.openai_api_url)
            .field("openai_api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field(
                "storage",
                &self
                    .storage
                    .as_ref()
                    .map(|s| {
                        let r = &s.repository;
                        format!("{}/{}@{}", r.owner, r.name, r.branch)
                    }),
            )
            .field("upload_dir", &self.upload_dir)
            .field("http_port", &self.http_port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, DocentError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.openai_api_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.storage, None);
        assert_eq!(config.upload_dir, "imgs");
        assert_eq!(config.http_port, 3000);
    }

    #[test]
    fn test_missing_api_key() {
        let err = config(&[]).unwrap_err();
        assert!(matches!(err, DocentError::ConfigurationMissing(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        assert!(config(&[("OPENAI_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_storage_requires_token_and_repo() {
        let full = config(&[
            ("OPENAI_API_KEY", "sk"),
            ("GITHUB_TOKEN", "ghp"),
            ("GITHUB_REPO", "octo/gallery"),
        ])
        .unwrap();
        assert_eq!(
            full.storage,
            Some(StorageConfig {
                token: "ghp".to_string(),
                repository: Repository::parse("octo/gallery", "main").unwrap(),
            })
        );

        let err = config(&[("OPENAI_API_KEY", "sk"), ("GITHUB_TOKEN", "ghp")]).unwrap_err();
        assert!(err.to_string().contains("GITHUB_REPO"));

        let err =
            config(&[("OPENAI_API_KEY", "sk"), ("GITHUB_REPO", "octo/gallery")]).unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"));

        let err = config(&[
            ("OPENAI_API_KEY", "sk"),
            ("GITHUB_TOKEN", "ghp"),
            ("GITHUB_REPO", "gallery"),
        ])
        .unwrap_err();
        assert!(matches!(err, DocentError::ConfigurationMissing(_)));
        assert!(err.to_string().contains("expected owner/repo"));
    }

    #[test]
    fn test_repository_parsed_once_with_branch() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk"),
            ("GITHUB_TOKEN", "ghp"),
            ("GITHUB_REPO", " octo/gallery "),
            ("GITHUB_BRANCH", "pages"),
        ])
        .unwrap();
        let repository = config.storage.unwrap().repository;
        assert_eq!(repository.owner, "octo");
        assert_eq!(repository.name, "gallery");
        assert_eq!(repository.branch, "pages");
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(config(&[("OPENAI_API_KEY", "sk"), ("HTTP_PORT", "http")]).is_err());
        assert!(config(&[("OPENAI_API_KEY", "sk"), ("DOCENT_MAX_TOKENS", "0")]).is_err());
        let config = config(&[("OPENAI_API_KEY", "sk"), ("DOCENT_MAX_TOKENS", "300")]).unwrap();
        assert_eq!(config.max_tokens, 300);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk-secret"),
            ("GITHUB_TOKEN", "ghp_secret"),
            ("GITHUB_REPO", "octo/gallery"),
        ])
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("octo/gallery@main"));
    }
}
