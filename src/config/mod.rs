use std::{path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::{
    arg_parse::RunMode,
    error::ConfigError,
    sender::{ConsoleSender, MessageStyle, Sender, TelegramSender},
    storage::{FileStorage, GistStorage, Store},
};

const DEFAULT_FEED_URL: &str = "https://coin68.com/rss/tin-moi-nhat.rss";
const DEFAULT_STATE_FILE: &str = "./sent_links.json";
const DEFAULT_GIST_FILE_NAME: &str = "sent_links.json";
const DEFAULT_READ_MORE_LABEL: &str = "Read more";
const DEFAULT_MAX_NEWS_PER_RUN: usize = 10;
const DEFAULT_DELAY_SECS: u64 = 2;
const DEFAULT_SENT_LINKS_CAP: usize = 500;
const DEFAULT_EXCERPT_LEN: usize = 250;

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

#[derive(Clone, Debug)]
pub struct GistConfig {
    pub token: String,
    pub id: String,
    pub file_name: String,
}

#[derive(Clone, Debug)]
pub struct MessageConfig {
    pub style: MessageStyle,
    pub send_images: bool,
    pub excerpt_len: usize,
    pub read_more_label: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub gist: Option<GistConfig>,
    pub state_file: PathBuf,
    pub feed_url: String,
    pub max_news_per_run: usize,
    pub delay_between_messages: Duration,
    pub sent_links_cap: usize,
    pub message: MessageConfig,
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        log_presence(&get);

        let telegram = TelegramConfig {
            token: get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?,
            chat_id: get("CHAT_ID").ok_or(ConfigError::Missing("CHAT_ID"))?,
        };

        let gist = match (get("GIST_TOKEN"), get("GIST_ID")) {
            (Some(token), Some(id)) => Some(GistConfig {
                token,
                id,
                file_name: get("GIST_FILE_NAME")
                    .unwrap_or_else(|| DEFAULT_GIST_FILE_NAME.to_string()),
            }),
            (None, None) => None,
            _ => {
                warn!("only one of GIST_TOKEN and GIST_ID is set, falling back to the state file");
                None
            }
        };

        let style = match get("MESSAGE_STYLE").as_deref() {
            None | Some("full") => MessageStyle::Full,
            Some("link") => MessageStyle::LinkOnly,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "MESSAGE_STYLE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            telegram,
            gist,
            state_file: get("STATE_FILE")
                .map_or_else(|| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from),
            feed_url: get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            max_news_per_run: parse_or(&get, "MAX_NEWS_PER_RUN", DEFAULT_MAX_NEWS_PER_RUN)?,
            delay_between_messages: Duration::from_secs(parse_or(
                &get,
                "DELAY_BETWEEN_MESSAGES",
                DEFAULT_DELAY_SECS,
            )?),
            sent_links_cap: parse_or(&get, "SENT_LINKS_CAP", DEFAULT_SENT_LINKS_CAP)?,
            message: MessageConfig {
                style,
                send_images: parse_flag(&get, "SEND_IMAGES")?,
                excerpt_len: DEFAULT_EXCERPT_LEN,
                read_more_label: get("READ_MORE_LABEL")
                    .unwrap_or_else(|| DEFAULT_READ_MORE_LABEL.to_string()),
            },
        })
    }

    pub fn get_sender(&self, mode: RunMode) -> Sender {
        match mode {
            RunMode::DryRun => Sender::Console(ConsoleSender::new(&self.message)),
            RunMode::Deliver => Sender::Telegram(TelegramSender::new(&self.telegram, &self.message)),
        }
    }

    /// The Gist backend when both credentials are present, the local file otherwise.
    pub fn get_store(&self) -> Store {
        if let Some(gist) = &self.gist {
            Store::Gist(GistStorage::new(gist, self.sent_links_cap))
        } else {
            Store::File(FileStorage::new(&self.state_file, self.sent_links_cap))
        }
    }
}

fn log_presence(get: &impl Fn(&str) -> Option<String>) {
    for key in ["BOT_TOKEN", "CHAT_ID", "GIST_TOKEN", "GIST_ID"] {
        let state = if get(key).is_some() { "SET" } else { "MISSING" };
        info!(key, state, "environment");
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn parse_flag(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<bool, ConfigError> {
    match get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            key,
            value: other.to_string(),
        }),
    }
}
