use std::sync::Arc;

use log::{info, warn};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use super::link::SourceLink;
use super::site::SiteProfile;
use super::source::HttpSource;

/// An image address found on a gallery page, already absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Position among the page's qualifying images.
    pub position: usize,
    pub url: Url,
}

pub struct ImageLocator<S: ?Sized> {
    source: Arc<S>,
    site: SiteProfile,
}

impl<S: HttpSource + ?Sized> ImageLocator<S> {
    pub fn new(source: Arc<S>, site: SiteProfile) -> Self {
        Self { source, site }
    }

    /// Fetches the gallery page once. Upstream trouble yields an empty list,
    /// which the caller reports as "not found".
    pub async fn locate(&self, link: &SourceLink) -> Vec<ImageReference> {
        let html = match self.source.get_text(link.url()).await {
            Ok(html) => html,
            Err(err) => {
                warn!("gallery page fetch failed ({link}): {err}");
                return Vec::new();
            }
        };

        let refs = extract_image_refs(&html, &self.site);
        info!("located {} images on {link}", refs.len());
        refs
    }
}

/// Gallery images in document order. Nothing is deduplicated.
pub fn extract_image_refs(html: &str, site: &SiteProfile) -> Vec<ImageReference> {
    static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

    let document = Html::parse_document(html);
    let mut refs = Vec::new();

    for element in document.select(&IMG) {
        let Some(src) = element.value().attr("src").map(str::trim) else {
            continue;
        };
        if src.is_empty() || !src.contains(site.marker()) {
            continue;
        }

        match site.root().join(src) {
            Ok(url) => refs.push(ImageReference {
                position: refs.len(),
                url,
            }),
            Err(err) => warn!("skipping unresolvable image src {src:?}: {err}"),
        }
    }

    refs
}
