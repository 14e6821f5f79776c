use reqwest::StatusCode;
use thiserror::Error;

/// Errors that end a run before anything is delivered.
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not fetch the feed: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not parse the feed: {0}")]
    Parse(#[from] rss::Error),
}

/// Command line parsing stopped the program; help output is not a failure.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgsError {
    #[error("help requested")]
    Help,

    #[error("invalid command line arguments")]
    Invalid,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed responded with {0}")]
    Status(StatusCode),
}

/// A single malformed feed entry; the entry is dropped and the fetch goes on.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ItemError {
    #[error("entry {title:?} has no link")]
    MissingLink { title: Option<String> },
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("bad media url {url:?}: {source}")]
    MediaUrl {
        url: String,
        source: url::ParseError,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("state backend responded with {0}")]
    Status(StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored links changed since they were loaded (loaded {loaded:?}, found {found:?})")]
    Conflict {
        loaded: Option<String>,
        found: Option<String>,
    },
}
