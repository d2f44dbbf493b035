mod commands;
mod handlers;
mod state;
mod telegram;

use anyhow::Result;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::filter_command;
use teloxide::prelude::*;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands;

pub use state::AppState;

pub type HandlerResult = Result<()>;

pub async fn run<B>(bot: B, state: AppState) -> Result<()>
where
    B: Requester + Clone + Send + Sync + 'static,
    B::Err: std::error::Error + Send + Sync + 'static,
    B::SendMessage: Send,
    B::SendPhoto: Send,
    B::SendDocument: Send,
    <B as Requester>::GetUpdates: Send,
{
    bot.set_my_commands(commands::Command::bot_commands()).await?;

    let handler = dptree::entry()
        .branch(
            Update::filter_message().branch(
                dptree::filter(|msg: Message, state: AppState| state.is_after_boot(&msg))
                    .branch(
                        filter_command::<commands::Command, _>()
                            .endpoint(handlers::handle_command::<B>),
                    ),
            ),
        )
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback::<B>));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .default_handler(|_| async move {})
        .build()
        .dispatch()
        .await;

    Ok(())
}
