use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::doujin::{DEFAULT_PATH_MARKER, DEFAULT_SITE_ROOT, PipelineConfig, SiteProfile};

const TOKEN_VARS: [&str; 2] = ["TELEGRAM_API_TOKEN", "BOT_TOKEN"];

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_api_token: String,
    pub session_ttl: Duration,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        // a missing .env is fine; the variables may come from the environment
        let _ = dotenv();

        let lookup = |key: &str| std::env::var(key).ok();
        let Some(token) = TOKEN_VARS
            .iter()
            .filter_map(|key| lookup(*key))
            .find(|token| is_valid(token))
        else {
            ensure_env_exists()?;
            return Err(anyhow!(
                "TELEGRAM_API_TOKEN is not set. Put the bot token into the generated .env file and start again."
            ));
        };

        Ok(Self {
            telegram_api_token: token,
            session_ttl: Duration::from_secs(parse_or(&lookup, "DOUJIN_SESSION_TTL_SECS", 300)?),
            pipeline: pipeline_config_from(&lookup)?,
        })
    }
}

/// Pipeline settings from `DOUJIN_*` variables; every one is optional.
pub fn pipeline_config_from(lookup: &impl Fn(&str) -> Option<String>) -> Result<PipelineConfig> {
    let root = lookup("DOUJIN_SITE_ROOT").unwrap_or_else(|| DEFAULT_SITE_ROOT.to_string());
    let marker = lookup("DOUJIN_PATH_MARKER").unwrap_or_else(|| DEFAULT_PATH_MARKER.to_string());

    Ok(PipelineConfig {
        site: SiteProfile::new(&root, &marker)?,
        fetch_concurrency: parse_or(lookup, "DOUJIN_FETCH_CONCURRENCY", 4)?,
        request_timeout: Duration::from_secs(parse_or(lookup, "DOUJIN_REQUEST_TIMEOUT_SECS", 30)?),
        request_deadline: Duration::from_secs(parse_or(lookup, "DOUJIN_REQUEST_DEADLINE_SECS", 600)?),
        send_delay: Duration::from_millis(parse_or(lookup, "DOUJIN_SEND_DELAY_MS", 1000)?),
        temp_dir: lookup("DOUJIN_TEMP_DIR")
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from),
    })
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value {raw:?}")),
        _ => Ok(default),
    }
}

fn is_valid(token: &str) -> bool {
    !token.trim().is_empty() && !token.to_lowercase().contains("your")
}

fn ensure_env_exists() -> Result<()> {
    let env_path = PathBuf::from(".env");

    if !env_path.exists() {
        let template = "TELEGRAM_API_TOKEN=your_token_here\n";
        fs::write(&env_path, template).context("failed to create .env file")?;
        eprintln!(
            "warning: TELEGRAM_API_TOKEN is missing, created a template .env file. Fill in the real token."
        );
    } else {
        eprintln!("warning: TELEGRAM_API_TOKEN is not set. Add the token to the .env file.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = pipeline_config_from(&lookup_from(&[])).unwrap();
        assert_eq!(config.site.root().as_str(), "https://multporn.net/");
        assert_eq!(config.site.marker(), "uploads");
        assert_eq!(config.fetch_concurrency, 4);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.request_deadline, Duration::from_secs(600));
        assert_eq!(config.send_delay, Duration::from_millis(1000));
        assert!(config.temp_dir.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = pipeline_config_from(&lookup_from(&[
            ("DOUJIN_SITE_ROOT", "https://mirror.example.org"),
            ("DOUJIN_PATH_MARKER", "files"),
            ("DOUJIN_FETCH_CONCURRENCY", " 8 "),
            ("DOUJIN_SEND_DELAY_MS", "250"),
            ("DOUJIN_TEMP_DIR", "/var/tmp/doujin"),
        ]))
        .unwrap();

        assert_eq!(config.site.host(), "mirror.example.org");
        assert_eq!(config.site.marker(), "files");
        assert_eq!(config.fetch_concurrency, 8);
        assert_eq!(config.send_delay, Duration::from_millis(250));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/var/tmp/doujin")));
    }

    #[test]
    fn unparseable_numbers_are_errors() {
        let err = pipeline_config_from(&lookup_from(&[("DOUJIN_FETCH_CONCURRENCY", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("DOUJIN_FETCH_CONCURRENCY"));
    }

    #[test]
    fn placeholder_tokens_are_rejected() {
        assert!(!is_valid("your_token_here"));
        assert!(!is_valid("   "));
        assert!(is_valid("123456:ABC-DEF"));
    }
}
