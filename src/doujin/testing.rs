//! Fakes and fixtures shared by the pipeline tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use reqwest::StatusCode;
use url::Url;

use super::error::FetchError;
use super::pipeline::Delivery;
use super::source::HttpSource;

/// Scripted upstream. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<String, String>,
    images: HashMap<String, Vec<u8>>,
    latency: Option<Duration>,
    requests: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn image(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl HttpSource for FakeSource {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        self.hit().await;
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or(FetchError::Status(StatusCode::NOT_FOUND))
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.hit().await;
        self.images
            .get(url.as_str())
            .cloned()
            .ok_or(FetchError::Status(StatusCode::NOT_FOUND))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Image { caption: String, bytes: Vec<u8> },
    Document { file_name: String, caption: String, bytes: Vec<u8> },
}

/// Captures what the pipeline delivered, reading files while they exist.
#[derive(Default)]
pub struct RecordingDelivery {
    sent: Mutex<Vec<Sent>>,
    paths: Mutex<Vec<std::path::PathBuf>>,
    fail_images: bool,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_images() -> Self {
        Self {
            fail_images: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<std::path::PathBuf> {
        self.paths.lock().unwrap().clone()
    }

    fn record(&self, path: &Path, item: Sent) {
        self.paths.lock().unwrap().push(path.to_path_buf());
        self.sent.lock().unwrap().push(item);
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn send_image(&self, path: &Path, caption: &str) -> anyhow::Result<()> {
        if self.fail_images {
            anyhow::bail!("photo rejected");
        }
        let bytes = std::fs::read(path)?;
        self.record(
            path,
            Sent::Image {
                caption: caption.to_string(),
                bytes,
            },
        );
        Ok(())
    }

    async fn send_document(
        &self,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> anyhow::Result<()> {
        let bytes = std::fs::read(path)?;
        self.record(
            path,
            Sent::Document {
                file_name: file_name.to_string(),
                caption: caption.to_string(),
                bytes,
            },
        );
        Ok(())
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 90]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

pub fn gray_jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_pixel(width, height, image::Luma([128]));
    encode(DynamicImage::ImageLuma8(img), ImageFormat::Jpeg)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

/// MediaBox width of every page, in page order.
pub fn pdf_page_widths(pdf: &[u8]) -> Vec<i64> {
    let doc = lopdf::Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_dictionary(*id).unwrap();
            page.get(b"MediaBox").unwrap().as_array().unwrap()[2]
                .as_i64()
                .unwrap()
        })
        .collect()
}
