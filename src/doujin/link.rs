use std::fmt;
use std::str::FromStr;

use url::Url;

use super::error::PipelineError;
use super::site::SiteProfile;

/// A user-supplied gallery address that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLink(Url);

impl SourceLink {
    pub fn parse(raw: &str, site: &SiteProfile) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        let invalid = || PipelineError::InvalidLink {
            input: trimmed.to_string(),
            expected_host: site.host().to_string(),
        };

        if !site.matches_link(trimmed) {
            return Err(invalid());
        }

        Url::parse(trimmed).map(SourceLink).map_err(|_| invalid())
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for SourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Pdf,
    Images,
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" | "doc" | "document" => Ok(DeliveryMode::Pdf),
            "images" | "image" | "img" | "photos" => Ok(DeliveryMode::Images),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestArgs<'a> {
    Missing,
    Link {
        link: &'a str,
        mode: Option<DeliveryMode>,
    },
    UnknownMode(String),
}

/// Splits `/get_doujin` arguments into the link and an optional output mode.
pub fn parse_request_args(text: &str) -> RequestArgs<'_> {
    let mut parts = text.split_whitespace();
    let Some(link) = parts.next() else {
        return RequestArgs::Missing;
    };

    match parts.next().map(str::parse::<DeliveryMode>) {
        None => RequestArgs::Link { link, mode: None },
        Some(Ok(mode)) => RequestArgs::Link {
            link,
            mode: Some(mode),
        },
        Some(Err(word)) => RequestArgs::UnknownMode(word),
    }
}
