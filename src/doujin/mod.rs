mod assemble;
mod error;
mod fetch;
mod link;
mod locator;
mod pipeline;
mod site;
mod source;
mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use error::GENERIC_FAILURE_MESSAGE;
pub use link::{DeliveryMode, RequestArgs, parse_request_args};
pub use pipeline::{Delivery, DoujinPipeline, PipelineConfig};
pub use site::{DEFAULT_PATH_MARKER, DEFAULT_SITE_ROOT, SiteProfile};
pub use source::{HttpSource, ReqwestSource};
