use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use super::assemble::assemble_pdf;
use super::error::{AssemblyError, PipelineError};
use super::fetch::{ImageFetcher, LocalImageCopy};
use super::link::{DeliveryMode, SourceLink};
use super::locator::ImageLocator;
use super::site::SiteProfile;
use super::source::HttpSource;
use super::workspace::Workspace;

pub const DOCUMENT_FILE_NAME: &str = "doujin.pdf";

/// Transport the finished output is handed to.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send_image(&self, path: &Path, caption: &str) -> anyhow::Result<()>;

    async fn send_document(&self, path: &Path, file_name: &str, caption: &str)
    -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub site: SiteProfile,
    pub fetch_concurrency: usize,
    pub request_timeout: Duration,
    pub request_deadline: Duration,
    pub send_delay: Duration,
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub mode: DeliveryMode,
    pub located: usize,
    pub downloaded: usize,
    pub delivered: usize,
}

impl DeliveryReport {
    /// Located images that never reached the user.
    pub fn failed(&self) -> usize {
        self.located.saturating_sub(self.delivered)
    }
}

/// validate → locate → fetch → assemble or forward. The same entry point
/// serves any transport that implements [`Delivery`].
pub struct DoujinPipeline<S: ?Sized> {
    locator: ImageLocator<S>,
    fetcher: ImageFetcher<S>,
    config: PipelineConfig,
}

impl<S: HttpSource + ?Sized> DoujinPipeline<S> {
    pub fn new(source: Arc<S>, config: PipelineConfig) -> Self {
        Self {
            locator: ImageLocator::new(source.clone(), config.site.clone()),
            fetcher: ImageFetcher::new(source, config.fetch_concurrency),
            config,
        }
    }

    pub fn site(&self) -> &SiteProfile {
        &self.config.site
    }

    pub fn validate(&self, raw_link: &str) -> Result<SourceLink, PipelineError> {
        SourceLink::parse(raw_link, &self.config.site)
    }

    /// Runs one request to completion. The deadline covers locating,
    /// downloading and assembly; exceeding it cancels that work. Delivery
    /// then runs to the end so the report counts every item handed over.
    /// The workspace is removed either way.
    pub async fn run<D: Delivery + ?Sized>(
        &self,
        raw_link: &str,
        mode: DeliveryMode,
        delivery: &D,
    ) -> Result<DeliveryReport, PipelineError> {
        let link = self.validate(raw_link)?;
        let deadline = self.config.request_deadline;

        let prepared = match tokio::time::timeout(deadline, self.prepare(&link, mode)).await {
            Ok(prepared) => prepared?,
            Err(_) => {
                warn!("preparing {link} exceeded {deadline:?}");
                return Err(PipelineError::TimedOut(deadline));
            }
        };

        let delivered = match &prepared.output {
            Output::Document { path, pages } => {
                let caption = document_caption(prepared.located, *pages);
                delivery
                    .send_document(path, DOCUMENT_FILE_NAME, &caption)
                    .await
                    .map_err(PipelineError::Delivery)?;
                *pages
            }
            Output::Images(copies) => self.deliver_images(copies, delivery).await,
        };

        let report = DeliveryReport {
            mode,
            located: prepared.located,
            downloaded: prepared.downloaded,
            delivered,
        };
        info!(
            "delivered {link} as {:?}: {} located, {} downloaded, {} delivered",
            report.mode, report.located, report.downloaded, report.delivered
        );
        Ok(report)
    }

    async fn prepare(&self, link: &SourceLink, mode: DeliveryMode) -> Result<Prepared, PipelineError> {
        let refs = self.locator.locate(link).await;
        if refs.is_empty() {
            return Err(PipelineError::NoImages(link.to_string()));
        }

        let workspace =
            Workspace::create(self.config.temp_dir.as_deref()).map_err(PipelineError::Workspace)?;
        debug!("workspace for {link}: {}", workspace.path().display());
        let copies = self.fetcher.fetch_all(&refs, &workspace).await;
        if copies.is_empty() {
            return Err(PipelineError::NothingDownloaded(refs.len()));
        }

        let downloaded = copies.len();
        let output = match mode {
            DeliveryMode::Pdf => {
                let path = workspace.document_path(DOCUMENT_FILE_NAME);
                let target = path.clone();
                let pages = tokio::task::spawn_blocking(move || assemble_pdf(&copies, &target))
                    .await
                    .map_err(AssemblyError::from)??;
                Output::Document { path, pages }
            }
            DeliveryMode::Images => Output::Images(copies),
        };

        Ok(Prepared {
            _workspace: workspace,
            located: refs.len(),
            downloaded,
            output,
        })
    }

    async fn deliver_images<D: Delivery + ?Sized>(
        &self,
        copies: &[LocalImageCopy],
        delivery: &D,
    ) -> usize {
        let total = copies.len();
        let mut delivered = 0;

        for (n, copy) in copies.iter().enumerate() {
            if n > 0 && !self.config.send_delay.is_zero() {
                tokio::time::sleep(self.config.send_delay).await;
            }

            let caption = format!("Page {}/{}", n + 1, total);
            match delivery.send_image(&copy.path, &caption).await {
                Ok(()) => delivered += 1,
                Err(err) => warn!("failed to send {}: {err:#}", copy.source),
            }
        }

        delivered
    }
}

impl<S: HttpSource + ?Sized + 'static> DoujinPipeline<S> {
    /// Runs the request on its own task so the caller can move on to the
    /// next one.
    pub fn spawn<D: Delivery + ?Sized + 'static>(
        self: &Arc<Self>,
        raw_link: String,
        mode: DeliveryMode,
        delivery: Arc<D>,
    ) -> JoinHandle<Result<DeliveryReport, PipelineError>> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(&raw_link, mode, &*delivery).await })
    }
}

/// Output that is ready to hand over. Holding the workspace keeps its
/// files alive until delivery is done.
struct Prepared {
    _workspace: Workspace,
    located: usize,
    downloaded: usize,
    output: Output,
}

enum Output {
    Document { path: PathBuf, pages: usize },
    Images(Vec<LocalImageCopy>),
}

fn document_caption(located: usize, pages: usize) -> String {
    if pages >= located {
        "Here is your doujin PDF.".to_string()
    } else {
        format!(
            "Here is your doujin PDF. {} of {} pages are missing.",
            located - pages,
            located
        )
    }
}
