use teloxide::utils::command::BotCommands;

use crate::doujin::DeliveryMode;

#[derive(BotCommands, Clone, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub(crate) enum Command {
    #[command(description = "show usage")]
    Start,
    #[command(description = "download a gallery: /get_doujin <link> [pdf|images]")]
    GetDoujin(String),
    #[command(description = "drop the request waiting for a format choice")]
    Cancel,
}

const PDF_CALLBACK: &str = "doujin_pdf";
const IMAGES_CALLBACK: &str = "doujin_images";

pub(crate) fn mode_callback_data(mode: DeliveryMode) -> &'static str {
    match mode {
        DeliveryMode::Pdf => PDF_CALLBACK,
        DeliveryMode::Images => IMAGES_CALLBACK,
    }
}

pub(crate) fn parse_mode_callback(data: &str) -> Option<DeliveryMode> {
    match data {
        PDF_CALLBACK => Some(DeliveryMode::Pdf),
        IMAGES_CALLBACK => Some(DeliveryMode::Images),
        _ => None,
    }
}
