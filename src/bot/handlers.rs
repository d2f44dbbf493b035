use std::sync::Arc;

use log::{error, info, warn};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, ThreadId};

use crate::doujin::{DeliveryMode, GENERIC_FAILURE_MESSAGE, RequestArgs, parse_request_args};

use super::commands::{Command, mode_callback_data, parse_mode_callback};
use super::telegram::{
    SendOptions, TelegramDelivery, send_progress_notice, send_reply_with_fallback, send_to_chat,
};
use super::{AppState, HandlerResult};

pub(crate) async fn handle_command<B>(bot: B, msg: Message, cmd: Command, state: AppState) -> HandlerResult
where
    B: Requester + Clone + Send + Sync + 'static,
    B::Err: std::error::Error + Send + Sync + 'static,
    B::SendMessage: Send,
    B::SendPhoto: Send,
    B::SendDocument: Send,
{
    match cmd {
        Command::Start => {
            send_reply_with_fallback(
                &bot,
                &msg,
                usage_text(&state),
                SendOptions {
                    disable_preview: Some(true),
                    ..SendOptions::default()
                },
            )
            .await?;
        }
        Command::Cancel => {
            let cancelled = msg
                .from
                .as_ref()
                .is_some_and(|user| state.sessions.cancel(user.id));
            let text = if cancelled {
                "Request cancelled."
            } else {
                "There is no pending request."
            };
            send_reply_with_fallback(&bot, &msg, text, SendOptions::default()).await?;
        }
        Command::GetDoujin(args) => handle_get_doujin(&bot, &msg, &args, &state).await?,
    }

    Ok(())
}

async fn handle_get_doujin<B>(bot: &B, msg: &Message, args: &str, state: &AppState) -> HandlerResult
where
    B: Requester + Clone + Send + Sync + 'static,
    B::Err: std::error::Error + Send + Sync + 'static,
    B::SendMessage: Send,
    B::SendPhoto: Send,
    B::SendDocument: Send,
{
    let host = state.pipeline.site().host().to_string();

    let (link, mode) = match parse_request_args(args) {
        RequestArgs::Missing => {
            let text = format!("Please provide a valid {host} URL.");
            send_reply_with_fallback(bot, msg, text, SendOptions::default()).await?;
            return Ok(());
        }
        RequestArgs::UnknownMode(word) => {
            let text = format!("Unknown format \"{word}\". Use pdf or images.");
            send_reply_with_fallback(bot, msg, text, SendOptions::default()).await?;
            return Ok(());
        }
        RequestArgs::Link { link, mode } => (link, mode),
    };

    if let Err(err) = state.pipeline.validate(link) {
        send_reply_with_fallback(bot, msg, err.user_message(), SendOptions::default()).await?;
        return Ok(());
    }

    if let Some(mode) = mode {
        return run_request(bot, msg.chat.id, msg.thread_id, link, mode, state).await;
    }

    let Some(user) = msg.from.as_ref() else {
        send_reply_with_fallback(
            bot,
            msg,
            "Could not tell who sent this. Add pdf or images after the link.",
            SendOptions::default(),
        )
        .await?;
        return Ok(());
    };

    state.sessions.begin(user.id, msg.chat.id, msg.thread_id, link);
    send_reply_with_fallback(
        bot,
        msg,
        "Choose format:",
        SendOptions {
            reply_markup: Some(format_keyboard()),
            ..SendOptions::default()
        },
    )
    .await?;

    Ok(())
}

pub(crate) async fn handle_callback<B>(bot: B, query: CallbackQuery, state: AppState) -> HandlerResult
where
    B: Requester + Clone + Send + Sync + 'static,
    B::Err: std::error::Error + Send + Sync + 'static,
    B::SendMessage: Send,
    B::SendPhoto: Send,
    B::SendDocument: Send,
{
    let Some(mode) = query.data.as_deref().and_then(parse_mode_callback) else {
        bot.answer_callback_query(query.id).await?;
        return Ok(());
    };

    let Some(pending) = state.sessions.take(query.from.id) else {
        let _ = bot
            .answer_callback_query(query.id)
            .text("This request has expired. Send the link again.")
            .show_alert(true)
            .await;
        return Ok(());
    };

    bot.answer_callback_query(query.id).await?;
    run_request(
        &bot,
        pending.chat_id,
        pending.thread_id,
        &pending.link,
        mode,
        &state,
    )
    .await
}

/// Announces the job and hands it to its own task, so the dispatcher can
/// keep serving the chat while pages are fetched and sent.
async fn run_request<B>(
    bot: &B,
    chat_id: ChatId,
    thread_id: Option<ThreadId>,
    link: &str,
    mode: DeliveryMode,
    state: &AppState,
) -> HandlerResult
where
    B: Requester + Clone + Send + Sync + 'static,
    B::Err: std::error::Error + Send + Sync + 'static,
    B::SendMessage: Send,
    B::SendPhoto: Send,
    B::SendDocument: Send,
{
    info!("starting {mode:?} request for {link} in chat {chat_id:?}");
    send_progress_notice(bot, chat_id, thread_id).await?;

    let delivery = Arc::new(TelegramDelivery::new(bot.clone(), chat_id, thread_id));
    let job = state.pipeline.spawn(link.to_string(), mode, delivery);
    let bot = bot.clone();
    let link = link.to_string();

    tokio::spawn(async move {
        let notice = match job.await {
            Ok(Ok(report)) if mode == DeliveryMode::Images && report.failed() > 0 => Some(format!(
                "{} of {} images could not be delivered.",
                report.failed(),
                report.located
            )),
            Ok(Ok(_)) => None,
            Ok(Err(err)) => {
                error!("request for {link} failed: {err:#}");
                Some(err.user_message())
            }
            Err(err) => {
                error!("request task for {link} died: {err}");
                Some(GENERIC_FAILURE_MESSAGE.to_string())
            }
        };

        if let Some(text) = notice {
            if let Err(err) = send_to_chat(&bot, chat_id, thread_id, text).await {
                warn!("failed to report outcome to chat {chat_id:?}: {err}");
            }
        }
    });

    Ok(())
}

fn format_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("PDF", mode_callback_data(DeliveryMode::Pdf)),
        InlineKeyboardButton::callback("Images", mode_callback_data(DeliveryMode::Images)),
    ]])
}

fn usage_text(state: &AppState) -> String {
    let host = state.pipeline.site().host();
    let mut text = format!(
        "Hey there! Send me a {host} gallery link and I will fetch its pages.\n\n\
         - /get_doujin <link>: pick PDF or images from a menu\n\
         - /get_doujin <link> pdf: one PDF document\n\
         - /get_doujin <link> images: every page as a photo\n\
         - /cancel: drop a request waiting for a format choice\n"
    );

    if !state.bot_username.is_empty() {
        text.push_str(&format!(
            "\nIn groups, address me as /get_doujin@{} <link>.",
            state.bot_username
        ));
    }

    text
}
