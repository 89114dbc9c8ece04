use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "weread-readwise")]
#[command(about = "Copies WeRead highlights and notes into Readwise", long_about = None)]
pub struct Cli {
    /// Raw `Cookie` header copied from a logged-in weread.qq.com session
    pub weread_cookie: String,
    /// Readwise access token
    pub readwise_token: String,
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".weread-readwise")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WeRead {
    pub base_url: String,
    pub api_url: String,
    /// Also fetch book info and read info for each synced book and log them.
    pub fetch_details: bool,
}

impl Default for WeRead {
    fn default() -> Self {
        WeRead {
            base_url: "https://weread.qq.com".to_string(),
            api_url: "https://i.weread.qq.com".to_string(),
            fetch_details: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Readwise {
    pub api_url: String,
    pub page_size: u32,
    pub source_type: String,
}

impl Default for Readwise {
    fn default() -> Self {
        Readwise {
            api_url: "https://readwise.io/api/v2".to_string(),
            page_size: 1000,
            source_type: "weread_app".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Throttle {
    highlight_delay_ms: u64,
    book_delay_ms: u64,
}

impl Default for Throttle {
    fn default() -> Self {
        Throttle {
            highlight_delay_ms: 300,
            book_delay_ms: 8000,
        }
    }
}

impl Throttle {
    pub fn new(highlight_delay: Duration, book_delay: Duration) -> Self {
        Throttle {
            highlight_delay_ms: highlight_delay.as_millis() as u64,
            book_delay_ms: book_delay.as_millis() as u64,
        }
    }

    pub fn none() -> Self {
        Throttle {
            highlight_delay_ms: 0,
            book_delay_ms: 0,
        }
    }

    pub fn highlight_delay(&self) -> Duration {
        Duration::from_millis(self.highlight_delay_ms)
    }

    pub fn book_delay(&self) -> Duration {
        Duration::from_millis(self.book_delay_ms)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub weread: WeRead,
    pub readwise: Readwise,
    pub throttle: Throttle,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    /// Loads the explicit path when given, else the default path if it
    /// exists, else built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Config::new(path),
            None => {
                let default_path = default_config_path();
                if default_path.is_file() {
                    tracing::info!(path = ?default_path, "loading default config file");
                    Config::new(&default_path.to_string_lossy())
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        if yaml_with_env.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.weread.base_url, "https://weread.qq.com");
        assert_eq!(cfg.readwise.page_size, 1000);
        assert_eq!(cfg.throttle.highlight_delay(), Duration::from_millis(300));
        assert_eq!(cfg.throttle.book_delay(), Duration::from_secs(8));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = Config::from_yaml("throttle:\n  book_delay_ms: 500\n").unwrap();
        assert_eq!(cfg.throttle.book_delay(), Duration::from_millis(500));
        assert_eq!(cfg.throttle.highlight_delay(), Duration::from_millis(300));
        assert_eq!(cfg.readwise.source_type, "weread_app");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let cfg = Config::from_yaml("").unwrap();
        assert_eq!(cfg.readwise.api_url, "https://readwise.io/api/v2");
    }

    #[test]
    fn test_env_default_substitution() {
        let yaml = "readwise:\n  api_url: ${WEREAD_READWISE_TEST_UNSET_VAR:-http://localhost:9999}\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.readwise.api_url, "http://localhost:9999");
    }

    #[test]
    fn test_cli_requires_two_positionals() {
        let cli = Cli::try_parse_from(["weread-readwise", "wr_skey=abc", "tok"]).unwrap();
        assert_eq!(cli.weread_cookie, "wr_skey=abc");
        assert_eq!(cli.readwise_token, "tok");
        assert!(cli.config_path.is_none());

        assert!(Cli::try_parse_from(["weread-readwise", "only-one"]).is_err());
    }

    #[test]
    fn test_throttle_none() {
        let throttle = Throttle::none();
        assert!(throttle.highlight_delay().is_zero());
        assert!(throttle.book_delay().is_zero());
    }
}
