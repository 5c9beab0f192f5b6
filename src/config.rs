use crate::domain::{ModelId, Money};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub model_shares: ModelShares,
}

/// Per-model percentage share table, supplied by the agency's
/// configuration collaborator. Models without an explicit entry get the
/// default share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelShares {
    shares: HashMap<String, Money>,
    default_pct: Money,
}

impl ModelShares {
    pub fn new(shares: HashMap<String, Money>, default_pct: Money) -> Self {
        Self {
            shares,
            default_pct,
        }
    }

    /// Table with no explicit entries, everything on the default share.
    pub fn with_default(default_pct: Money) -> Self {
        Self::new(HashMap::new(), default_pct)
    }

    pub fn share_for(&self, model: &ModelId) -> Money {
        self.shares
            .get(model.as_str())
            .copied()
            .unwrap_or(self.default_pct)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let default_pct = env_map
            .get("DEFAULT_MODEL_SHARE_PCT")
            .map(|s| s.as_str())
            .unwrap_or("60")
            .parse::<Money>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "DEFAULT_MODEL_SHARE_PCT".to_string(),
                    "must be a decimal percentage".to_string(),
                )
            })?;

        let shares = parse_model_shares_from_map(&env_map)?;

        Ok(Config {
            port,
            database_path,
            model_shares: ModelShares::new(shares, default_pct),
        })
    }
}

/// Parse the `MODEL_SHARES_FILE` table: one `model:percentage` pair per
/// line, blank lines and `#` comments ignored.
fn parse_model_shares_from_map(
    env_map: &HashMap<String, String>,
) -> Result<HashMap<String, Money>, ConfigError> {
    let Some(file_path) = env_map.get("MODEL_SHARES_FILE") else {
        return Ok(HashMap::new());
    };

    let content = std::fs::read_to_string(file_path).map_err(|_| {
        ConfigError::InvalidValue(
            "MODEL_SHARES_FILE".to_string(),
            "file not found or unreadable".to_string(),
        )
    })?;

    let mut shares = HashMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (model, pct) = trimmed.split_once(':').ok_or_else(|| {
            ConfigError::InvalidValue(
                "MODEL_SHARES_FILE".to_string(),
                format!("malformed line: {}", trimmed),
            )
        })?;
        let pct = pct.trim().parse::<Money>().map_err(|_| {
            ConfigError::InvalidValue(
                "MODEL_SHARES_FILE".to_string(),
                format!("invalid percentage for {}", model.trim()),
            )
        })?;
        shares.insert(model.trim().to_string(), pct);
    }

    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_default_share_applied() {
        let env_map = setup_required_env();
        let config = Config::from_env_map(env_map).expect("config failed");
        let share = config
            .model_shares
            .share_for(&ModelId::new("anyone".to_string()));
        assert_eq!(share.to_canonical_string(), "60");
    }

    #[test]
    fn test_invalid_default_share() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_MODEL_SHARE_PCT".to_string(), "most".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DEFAULT_MODEL_SHARE_PCT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_shares_file_parsed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shares.txt");
        std::fs::write(&path, "# agency shares\nm-1: 80\nm-2:55.5\n\n").unwrap();

        let mut env_map = setup_required_env();
        env_map.insert(
            "MODEL_SHARES_FILE".to_string(),
            path.to_string_lossy().to_string(),
        );

        let config = Config::from_env_map(env_map).expect("config failed");
        assert_eq!(
            config
                .model_shares
                .share_for(&ModelId::new("m-1".to_string()))
                .to_canonical_string(),
            "80"
        );
        assert_eq!(
            config
                .model_shares
                .share_for(&ModelId::new("m-2".to_string()))
                .to_canonical_string(),
            "55.5"
        );
        assert_eq!(
            config
                .model_shares
                .share_for(&ModelId::new("m-3".to_string()))
                .to_canonical_string(),
            "60"
        );
    }

    #[test]
    fn test_shares_file_malformed_line_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shares.txt");
        std::fs::write(&path, "m-1 80\n").unwrap();

        let mut env_map = setup_required_env();
        env_map.insert(
            "MODEL_SHARES_FILE".to_string(),
            path.to_string_lossy().to_string(),
        );

        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "MODEL_SHARES_FILE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
