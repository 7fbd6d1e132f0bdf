use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
///
/// Missing sections and keys take their defaults, so an empty document is
/// a valid configuration.
///
/// # Example
///
/// ```
/// use lexicrawl::config::parse_config;
///
/// let config = parse_config("[crawler]\nmax-workers = 4\n").unwrap();
/// assert_eq!(config.crawler.max_workers, 4);
/// assert_eq!(config.crawler.max_attempts, 3);
/// ```
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex-encoded SHA-256 of configuration text
///
/// Logged at startup so two runs can be told apart by the settings they
/// used.
pub fn config_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Reads, parses and validates the configuration file at `path`
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse, or validate the file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use lexicrawl::config::load_config;
///
/// let config = load_config(Path::new("lexicrawl.toml")).unwrap();
/// println!("Model: {}", config.inference.model);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with_hash(path).map(|(config, _)| config)
}

/// Loads a configuration together with the hash of the exact text parsed
///
/// The file is read once; the hash always describes the settings in use,
/// even if the file changes while the crawler starts.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, config_hash(&content)))
}
