use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing the request.";

/// Everything that stops a pipeline run. Per-image download failures are
/// not here: they are logged, skipped and counted in the delivery report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid link {input:?}, expected a {expected_host} address")]
    InvalidLink {
        input: String,
        expected_host: String,
    },

    #[error("no images found at {0}")]
    NoImages(String),

    #[error("none of the {0} located images could be downloaded")]
    NothingDownloaded(usize),

    #[error("failed to assemble document")]
    Assembly(#[from] AssemblyError),

    #[error("failed to prepare temporary workspace")]
    Workspace(#[source] std::io::Error),

    #[error("failed to deliver output")]
    Delivery(#[source] anyhow::Error),

    #[error("request timed out after {0:?}")]
    TimedOut(Duration),
}

impl PipelineError {
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::InvalidLink { expected_host, .. } => {
                format!("Invalid URL. Please send a valid {expected_host} link.")
            }
            PipelineError::NoImages(_) => "No images found or invalid URL.".to_string(),
            PipelineError::NothingDownloaded(_) => "Failed to download images.".to_string(),
            PipelineError::TimedOut(_) => {
                "The request took too long and was cancelled. Please try again.".to_string()
            }
            PipelineError::Assembly(_)
            | PipelineError::Workspace(_)
            | PipelineError::Delivery(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed")]
    Request(#[from] reqwest::Error),

    #[error("upstream answered {0}")]
    Status(StatusCode),
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no image could be placed on a page")]
    NoPages,

    #[error("image encoding failed")]
    Image(#[from] image::ImageError),

    #[error("pdf writer failed")]
    Pdf(#[from] lopdf::Error),

    #[error("i/o failed while writing document")]
    Io(#[from] std::io::Error),

    #[error("assembly task was interrupted")]
    Interrupted(#[from] tokio::task::JoinError),
}
