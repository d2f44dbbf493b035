use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use log::{info, warn};
use tokio::sync::Semaphore;
use url::Url;

use super::locator::ImageReference;
use super::source::HttpSource;
use super::workspace::Workspace;

const FALLBACK_EXTENSION: &str = "jpg";

/// Downloaded bytes for one located image.
#[derive(Debug, Clone)]
pub struct LocalImageCopy {
    pub index: usize,
    pub source: Url,
    pub path: PathBuf,
}

/// Downloads gallery images. The semaphore is shared by every request the
/// bot serves, so it bounds total outbound image fetches.
pub struct ImageFetcher<S: ?Sized> {
    source: Arc<S>,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl<S: HttpSource + ?Sized> ImageFetcher<S> {
    pub fn new(source: Arc<S>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            source,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Failed items are logged and left out; the rest keep reference order.
    pub async fn fetch_all(
        &self,
        refs: &[ImageReference],
        workspace: &Workspace,
    ) -> Vec<LocalImageCopy> {
        let fetches: Vec<_> = refs
            .iter()
            .map(|reference| self.fetch_one(reference, workspace))
            .collect();
        let copies: Vec<LocalImageCopy> = stream::iter(fetches)
            .buffered(self.concurrency)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        info!("downloaded {}/{} images", copies.len(), refs.len());
        copies
    }

    async fn fetch_one(
        &self,
        reference: &ImageReference,
        workspace: &Workspace,
    ) -> Option<LocalImageCopy> {
        let _permit = self.permits.acquire().await.ok()?;

        let bytes = match self.source.get_bytes(&reference.url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed to download {}: {err}", reference.url);
                return None;
            }
        };

        let index = reference.position;
        let path = workspace.image_path(index, sniff_extension(&bytes));
        if let Err(err) = tokio::fs::write(&path, &bytes).await {
            warn!("failed to store {} at {}: {err}", reference.url, path.display());
            return None;
        }

        Some(LocalImageCopy {
            index,
            source: reference.url.clone(),
            path,
        })
    }
}

fn sniff_extension(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or(FALLBACK_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doujin::testing::{FakeSource, png_bytes};

    fn reference(position: usize, url: &str) -> ImageReference {
        ImageReference {
            position,
            url: Url::parse(url).unwrap(),
        }
    }

    #[tokio::test]
    async fn skips_failed_items_and_keeps_order() {
        let source = Arc::new(
            FakeSource::new()
                .image("https://multporn.net/uploads/a.png", png_bytes(2, 2))
                .image("https://multporn.net/uploads/c.png", png_bytes(3, 3)),
        );
        let fetcher = ImageFetcher::new(source.clone(), 2);
        let workspace = Workspace::create(None).unwrap();
        let refs = vec![
            reference(0, "https://multporn.net/uploads/a.png"),
            reference(1, "https://multporn.net/uploads/b.png"),
            reference(2, "https://multporn.net/uploads/c.png"),
        ];

        let copies = fetcher.fetch_all(&refs, &workspace).await;

        assert_eq!(
            copies.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(copies[1].source.as_str(), "https://multporn.net/uploads/c.png");
        assert!(copies[0].path.ends_with("image_0.png"));
        assert!(copies[1].path.ends_with("image_2.png"));
        assert_eq!(std::fs::read(&copies[1].path).unwrap(), png_bytes(3, 3));
        assert_eq!(source.requests(), 3);
    }

    #[tokio::test]
    async fn unknown_bytes_fall_back_to_jpg_name() {
        let source = Arc::new(
            FakeSource::new().image("https://multporn.net/uploads/x", b"not an image".to_vec()),
        );
        let fetcher = ImageFetcher::new(source, 1);
        let workspace = Workspace::create(None).unwrap();

        let copies = fetcher
            .fetch_all(&[reference(0, "https://multporn.net/uploads/x")], &workspace)
            .await;

        assert_eq!(copies.len(), 1);
        assert!(copies[0].path.ends_with("image_0.jpg"));
    }

    #[tokio::test]
    async fn empty_input_downloads_nothing() {
        let source = Arc::new(FakeSource::new());
        let fetcher = ImageFetcher::new(source.clone(), 0);
        let workspace = Workspace::create(None).unwrap();

        assert!(fetcher.fetch_all(&[], &workspace).await.is_empty());
        assert_eq!(source.requests(), 0);
    }
}
