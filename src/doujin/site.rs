use anyhow::{Context, Result, anyhow};
use regex::Regex;
use url::Url;

pub const DEFAULT_SITE_ROOT: &str = "https://multporn.net";
pub const DEFAULT_PATH_MARKER: &str = "uploads";

/// The one site the bot scrapes: where relative image paths resolve to,
/// which host a submitted link must carry, and the substring that marks
/// gallery images among the page's other `<img>` tags.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    root: Url,
    host: String,
    marker: String,
    link_pattern: Regex,
}

impl SiteProfile {
    pub fn new(root: &str, marker: &str) -> Result<Self> {
        let root = Url::parse(root).with_context(|| format!("invalid site root {root:?}"))?;
        let host = root
            .host_str()
            .ok_or_else(|| anyhow!("site root {root} has no host"))?
            .trim_start_matches("www.")
            .to_ascii_lowercase();

        let marker = marker.trim();
        if marker.is_empty() {
            return Err(anyhow!("image path marker must not be empty"));
        }

        let link_pattern = Regex::new(&format!(
            r"(?i)^https?://(?:www\.)?{}(?:[/?#]\S*)?$",
            regex::escape(&host)
        ))
        .context("failed to build link pattern")?;

        Ok(Self {
            root,
            host,
            marker: marker.to_string(),
            link_pattern,
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub(crate) fn matches_link(&self, text: &str) -> bool {
        self.link_pattern.is_match(text)
    }
}

#[cfg(test)]
impl Default for SiteProfile {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_ROOT, DEFAULT_PATH_MARKER)
            .expect("default site profile should be valid")
    }
}
