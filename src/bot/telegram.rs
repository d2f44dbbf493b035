use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::sugar::request::RequestLinkPreviewExt;
use teloxide::types::{InlineKeyboardMarkup, InputFile, Message, ReplyParameters, ThreadId};

use crate::doujin::Delivery;

#[derive(Clone, Default)]
pub(crate) struct SendOptions {
    pub reply_markup: Option<InlineKeyboardMarkup>,
    pub disable_preview: Option<bool>,
}

pub(crate) fn send_to_chat<B>(
    bot: &B,
    chat_id: ChatId,
    thread_id: Option<ThreadId>,
    text: impl Into<String>,
) -> B::SendMessage
where
    B: Requester + ?Sized,
{
    let mut req = bot.send_message(chat_id, text.into());
    if let Some(thread_id) = thread_id {
        req = req.message_thread_id(thread_id);
    }
    req
}

pub(crate) fn reply_in_thread<B>(
    bot: &B,
    msg: &Message,
    text: impl Into<String>,
) -> B::SendMessage
where
    B: Requester + ?Sized,
{
    send_to_chat(bot, msg.chat.id, msg.thread_id, text)
        .reply_parameters(ReplyParameters::new(msg.id).allow_sending_without_reply())
}

/// Silent "working on it" message posted before a pipeline run.
pub(crate) fn send_progress_notice<B>(
    bot: &B,
    chat_id: ChatId,
    thread_id: Option<ThreadId>,
) -> B::SendMessage
where
    B: Requester + ?Sized,
{
    send_to_chat(bot, chat_id, thread_id, PROGRESS_NOTICE).disable_notification(true)
}

const PROGRESS_NOTICE: &str = "Fetching images... Please wait.";

/// Replies to `msg`; if the original message is gone, posts to the same
/// chat and thread instead.
pub(crate) async fn send_reply_with_fallback<B>(
    bot: &B,
    msg: &Message,
    text: impl Into<String>,
    opts: SendOptions,
) -> Result<Message>
where
    B: Requester + ?Sized,
    B::Err: std::error::Error + Send + Sync + 'static,
{
    let text = text.into();
    let reply = apply_send_options::<B>(reply_in_thread(bot, msg, text.clone()), &opts);

    match reply.await {
        Ok(message) => Ok(message),
        Err(err) if reply_target_missing(&err) => {
            let plain = send_to_chat(bot, msg.chat.id, msg.thread_id, text);
            Ok(apply_send_options::<B>(plain, &opts).await?)
        }
        Err(err) => Err(err.into()),
    }
}

fn reply_target_missing(err: &impl std::fmt::Display) -> bool {
    err.to_string().contains("message to be replied not found")
}

fn apply_send_options<B>(mut req: B::SendMessage, opts: &SendOptions) -> B::SendMessage
where
    B: Requester + ?Sized,
{
    if let Some(markup) = &opts.reply_markup {
        req = req.reply_markup(markup.clone());
    }
    if let Some(disable_preview) = opts.disable_preview {
        req = req.disable_link_preview(disable_preview);
    }
    req
}

/// Hands pipeline output to one chat (and forum thread, if any).
pub(crate) struct TelegramDelivery<B> {
    bot: B,
    chat_id: ChatId,
    thread_id: Option<ThreadId>,
}

impl<B> TelegramDelivery<B> {
    pub fn new(bot: B, chat_id: ChatId, thread_id: Option<ThreadId>) -> Self {
        Self {
            bot,
            chat_id,
            thread_id,
        }
    }
}

#[async_trait]
impl<B> Delivery for TelegramDelivery<B>
where
    B: Requester + Send + Sync,
    B::Err: std::error::Error + Send + Sync + 'static,
    B::SendPhoto: Send,
    B::SendDocument: Send,
{
    async fn send_image(&self, path: &Path, caption: &str) -> Result<()> {
        let mut req = self
            .bot
            .send_photo(self.chat_id, InputFile::file(path.to_path_buf()))
            .caption(caption);
        if let Some(thread_id) = self.thread_id {
            req = req.message_thread_id(thread_id);
        }
        req.await?;
        Ok(())
    }

    async fn send_document(&self, path: &Path, file_name: &str, caption: &str) -> Result<()> {
        let file = InputFile::file(path.to_path_buf()).file_name(file_name.to_string());
        let mut req = self
            .bot
            .send_document(self.chat_id, file)
            .caption(caption);
        if let Some(thread_id) = self.thread_id {
            req = req.message_thread_id(thread_id);
        }
        req.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use teloxide::requests::HasPayload;
    use teloxide::types::{InlineKeyboardButton, MessageId, ReplyMarkup};

    use super::*;

    fn bot() -> Bot {
        Bot::new("123456:TEST")
    }

    #[test]
    fn progress_notice_is_silent_and_stays_in_the_thread() {
        let thread = ThreadId(MessageId(42));
        let req = send_progress_notice(&bot(), ChatId(-100), Some(thread));
        let payload = req.payload_ref();

        assert_eq!(payload.text, PROGRESS_NOTICE);
        assert_eq!(payload.disable_notification, Some(true));
        assert_eq!(payload.message_thread_id, Some(thread));
    }

    #[test]
    fn plain_messages_leave_the_thread_unset() {
        let req = send_to_chat(&bot(), ChatId(7), None, "hello");
        let payload = req.payload_ref();

        assert_eq!(payload.text, "hello");
        assert_eq!(payload.message_thread_id, None);
        assert_eq!(payload.disable_notification, None);
    }

    #[test]
    fn send_options_are_applied() {
        let keyboard =
            InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("PDF", "doujin_pdf")]]);
        let opts = SendOptions {
            reply_markup: Some(keyboard.clone()),
            disable_preview: Some(true),
        };

        let req = apply_send_options::<Bot>(send_to_chat(&bot(), ChatId(7), None, "x"), &opts);
        let payload = req.payload_ref();

        assert_eq!(payload.reply_markup, Some(ReplyMarkup::InlineKeyboard(keyboard)));
        assert!(
            payload
                .link_preview_options
                .as_ref()
                .is_some_and(|options| options.is_disabled)
        );
    }

    #[test]
    fn default_send_options_change_nothing() {
        let req = apply_send_options::<Bot>(
            send_to_chat(&bot(), ChatId(7), None, "x"),
            &SendOptions::default(),
        );
        let payload = req.payload_ref();

        assert_eq!(payload.reply_markup, None);
        assert!(payload.link_preview_options.is_none());
    }

    #[test]
    fn only_a_missing_reply_target_triggers_the_fallback() {
        assert!(reply_target_missing(&"Bad Request: message to be replied not found"));
        assert!(!reply_target_missing(&"Forbidden: bot was blocked by the user"));
    }
}
