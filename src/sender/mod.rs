use std::time::Duration;

use teloxide::{
    prelude::*,
    types::{ChatId, InputFile, ParseMode, Recipient},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::{MessageConfig, TelegramConfig},
    error::DeliveryError,
    feeds::prelude::CandidateItem,
};

mod format;

pub use format::{format_message, MessageStyle};

const IMAGE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub enum Sender {
    Console(ConsoleSender),
    Telegram(TelegramSender),
}

/// Sends one feed item as one chat message.
pub trait ItemSender {
    async fn send(&self, item: &CandidateItem) -> Result<(), DeliveryError>;
}

impl ItemSender for Sender {
    async fn send(&self, item: &CandidateItem) -> Result<(), DeliveryError> {
        match self {
            Sender::Console(sender) => sender.send(item).await,
            Sender::Telegram(sender) => sender.send(item).await,
        }
    }
}

/// Prints the messages instead of sending them.
pub struct ConsoleSender {
    message: MessageConfig,
}

impl ConsoleSender {
    #[must_use]
    pub fn new(message: &MessageConfig) -> Self {
        Self {
            message: message.clone(),
        }
    }
}

impl ItemSender for ConsoleSender {
    async fn send(&self, item: &CandidateItem) -> Result<(), DeliveryError> {
        let body = format_message(item, &self.message);
        info!(link = %item.identifier, "dry run, not sending");
        println!("{body}\n");
        Ok(())
    }
}

pub struct TelegramSender {
    bot: Bot,
    recipient: Recipient,
    http: reqwest::Client,
    message: MessageConfig,
}

impl TelegramSender {
    #[must_use]
    pub fn new(config: &TelegramConfig, message: &MessageConfig) -> Self {
        Self {
            bot: Bot::new(&config.token),
            recipient: recipient(&config.chat_id),
            http: reqwest::Client::new(),
            message: message.clone(),
        }
    }

    #[allow(dead_code)]
    fn with_api_url(mut self, api_url: Url) -> Self {
        self.bot = self.bot.set_api_url(api_url);
        self
    }

    /// The photo to attach, if images are enabled and the URL answers a HEAD request.
    async fn reachable_image(&self, item: &CandidateItem) -> Option<String> {
        if !self.message.send_images {
            return None;
        }
        let url = item.media_url.as_deref()?;

        match self.http.head(url).timeout(IMAGE_CHECK_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => Some(url.to_string()),
            Ok(response) => {
                warn!(url, status = %response.status(), "image not available, sending text only");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "image check failed, sending text only");
                None
            }
        }
    }
}

/// Numeric chat IDs address a chat directly; anything else is a channel username.
fn recipient(chat_id: &str) -> Recipient {
    match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.to_string()),
    }
}

impl ItemSender for TelegramSender {
    async fn send(&self, item: &CandidateItem) -> Result<(), DeliveryError> {
        let body = format_message(item, &self.message);

        if let Some(image_url) = self.reachable_image(item).await {
            let photo = Url::parse(&image_url).map_err(|source| DeliveryError::MediaUrl {
                url: image_url.clone(),
                source,
            })?;
            debug!(link = %item.identifier, image = %image_url, "sending photo");
            let request = self
                .bot
                .send_photo(self.recipient.clone(), InputFile::url(photo))
                .caption(body);
            match self.message.style {
                MessageStyle::Full => request.parse_mode(ParseMode::Html).send().await?,
                MessageStyle::LinkOnly => request.send().await?,
            };
            return Ok(());
        }

        debug!(link = %item.identifier, "sending message");
        let request = self.bot.send_message(self.recipient.clone(), body);
        match self.message.style {
            MessageStyle::Full => request.parse_mode(ParseMode::Html).send().await?,
            MessageStyle::LinkOnly => request.send().await?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use httpmock::{prelude::*, Method::HEAD};
    use regex::Regex;

    const MESSAGE_OK: &str = r#"{
        "ok": true,
        "result": {
            "message_id": 7,
            "date": 1736904177,
            "chat": {"id": 42, "type": "private", "first_name": "Relay"},
            "text": "sent"
        }
    }"#;

    const PHOTO_OK: &str = r#"{
        "ok": true,
        "result": {
            "message_id": 8,
            "date": 1736904177,
            "chat": {"id": 42, "type": "private", "first_name": "Relay"},
            "photo": [{"file_id": "AgAD", "file_unique_id": "AQAD", "width": 90, "height": 60}],
            "caption": "sent"
        }
    }"#;

    fn message_config(send_images: bool) -> MessageConfig {
        MessageConfig {
            style: MessageStyle::Full,
            send_images,
            excerpt_len: 250,
            read_more_label: "Read more".to_string(),
        }
    }

    fn sender_with(server: &MockServer, message: &MessageConfig) -> TelegramSender {
        let config = TelegramConfig {
            token: "123:abc".to_string(),
            chat_id: "42".to_string(),
        };
        TelegramSender::new(&config, message).with_api_url(Url::parse(&server.base_url()).unwrap())
    }

    fn sender(server: &MockServer, send_images: bool) -> TelegramSender {
        sender_with(server, &message_config(send_images))
    }

    fn item(media_url: Option<String>) -> CandidateItem {
        CandidateItem {
            identifier: "https://news.example/1".to_string(),
            title: Some("Bitcoin".to_string()),
            body: Some("Up again".to_string()),
            published_at: None,
            media_url,
        }
    }

    fn method_path(method: &str) -> Regex {
        Regex::new(&format!("(?i)/bot123:abc/{method}$")).unwrap()
    }

    #[test]
    fn test_recipient() {
        assert_eq!(recipient("-1001234"), Recipient::Id(ChatId(-1_001_234)));
        assert_eq!(
            recipient("@coin68_news"),
            Recipient::ChannelUsername("@coin68_news".to_string())
        );
    }

    #[tokio::test]
    async fn test_send_message() {
        let server = MockServer::start();
        let send_mock = server.mock(|when, then| {
            when.method(POST)
                .path_matches(method_path("sendmessage"))
                .body_contains("<b>Bitcoin</b>")
                .body_contains("https://news.example/1");
            then.status(200)
                .header("content-type", "application/json")
                .body(MESSAGE_OK);
        });

        sender(&server, false).send(&item(None)).await.unwrap();
        send_mock.assert();
    }

    #[tokio::test]
    async fn test_send_message_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path_matches(method_path("sendmessage"));
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#);
        });

        let err = sender(&server, false).send(&item(None)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Telegram(_)));
    }

    #[tokio::test]
    async fn test_unreachable_image_falls_back_to_text() {
        let server = MockServer::start();
        let head_mock = server.mock(|when, then| {
            when.method(HEAD).path("/img/missing.jpg");
            then.status(404);
        });
        let photo_mock = server.mock(|when, then| {
            when.method(POST).path_matches(method_path("sendphoto"));
            then.status(500);
        });
        let send_mock = server.mock(|when, then| {
            when.method(POST).path_matches(method_path("sendmessage"));
            then.status(200)
                .header("content-type", "application/json")
                .body(MESSAGE_OK);
        });

        let image = Some(server.url("/img/missing.jpg"));
        sender(&server, true).send(&item(image)).await.unwrap();

        head_mock.assert();
        photo_mock.assert_hits(0);
        send_mock.assert();
    }

    #[tokio::test]
    async fn test_send_photo_with_caption() {
        let server = MockServer::start();
        let head_mock = server.mock(|when, then| {
            when.method(HEAD).path("/img/btc.jpg");
            then.status(200);
        });
        let photo_mock = server.mock(|when, then| {
            when.method(POST)
                .path_matches(method_path("sendphoto"))
                .body_contains("/img/btc.jpg")
                .body_contains("<b>Bitcoin</b>")
                .body_contains("HTML");
            then.status(200)
                .header("content-type", "application/json")
                .body(PHOTO_OK);
        });
        let send_mock = server.mock(|when, then| {
            when.method(POST).path_matches(method_path("sendmessage"));
            then.status(200)
                .header("content-type", "application/json")
                .body(MESSAGE_OK);
        });

        let image = Some(server.url("/img/btc.jpg"));
        sender(&server, true).send(&item(image)).await.unwrap();

        head_mock.assert();
        photo_mock.assert();
        send_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_link_only_photo_has_no_parse_mode() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(HEAD).path("/img/btc.jpg");
            then.status(200);
        });
        let html_mock = server.mock(|when, then| {
            when.method(POST)
                .path_matches(method_path("sendphoto"))
                .body_contains("HTML");
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"ok": false, "error_code": 400, "description": "Bad Request: can't parse entities"}"#);
        });
        let plain_mock = server.mock(|when, then| {
            when.method(POST)
                .path_matches(method_path("sendphoto"))
                .body_contains("x=1&y=2");
            then.status(200)
                .header("content-type", "application/json")
                .body(PHOTO_OK);
        });

        let message = MessageConfig {
            style: MessageStyle::LinkOnly,
            ..message_config(true)
        };
        let mut link = item(Some(server.url("/img/btc.jpg")));
        link.identifier = "https://news.example/a?x=1&y=2".to_string();
        sender_with(&server, &message).send(&link).await.unwrap();

        html_mock.assert_hits(0);
        plain_mock.assert();
    }

    #[tokio::test]
    async fn test_images_disabled_skips_the_check() {
        let server = MockServer::start();
        let head_mock = server.mock(|when, then| {
            when.method(HEAD).path("/img/btc.jpg");
            then.status(200);
        });
        let send_mock = server.mock(|when, then| {
            when.method(POST).path_matches(method_path("sendmessage"));
            then.status(200)
                .header("content-type", "application/json")
                .body(MESSAGE_OK);
        });

        let image = Some(server.url("/img/btc.jpg"));
        sender(&server, false).send(&item(image)).await.unwrap();

        head_mock.assert_hits(0);
        send_mock.assert();
    }

    #[tokio::test]
    async fn test_console_sender() {
        let sender = ConsoleSender::new(&message_config(false));
        assert!(sender.send(&item(None)).await.is_ok());
    }
}
