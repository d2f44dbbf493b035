mod bot;
mod config;
mod doujin;

use std::sync::Arc;

use anyhow::Result;
use bot::AppState;
use config::Config;
use doujin::{DoujinPipeline, HttpSource, ReqwestSource};
use log::info;
use teloxide::Bot;
use teloxide::prelude::Requester;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load()?;
    let bot = Bot::new(&config.telegram_api_token);

    let me = bot.get_me().await?;
    let bot_username = me.user.username.clone().unwrap_or_default();
    info!("bot ready: @{}", bot_username);

    let source: Arc<dyn HttpSource> =
        Arc::new(ReqwestSource::new(config.pipeline.request_timeout)?);
    let pipeline = DoujinPipeline::new(source, config.pipeline.clone());
    info!(
        "serving {} with {} download slots",
        pipeline.site().host(),
        config.pipeline.fetch_concurrency
    );

    let state = AppState::new(bot_username, pipeline, config.session_ttl);

    bot::run(bot, state).await
}
