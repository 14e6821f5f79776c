use teloxide::utils::html;

use crate::{config::MessageConfig, feeds::prelude::CandidateItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageStyle {
    /// Bold title, body excerpt and a "read more" link, in Telegram HTML.
    Full,
    /// Just the link; Telegram renders the preview.
    LinkOnly,
}

/// First `max_chars` characters of `text`, with `...` appended when something was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn format_message(item: &CandidateItem, config: &MessageConfig) -> String {
    if config.style == MessageStyle::LinkOnly {
        return item.identifier.clone();
    }

    let mut parts = Vec::with_capacity(3);
    if let Some(title) = &item.title {
        parts.push(format!("<b>{}</b>", html::escape(title)));
    }
    if let Some(body) = &item.body {
        parts.push(html::escape(&excerpt(body, config.excerpt_len)));
    }
    parts.push(format!(
        "🔗 <a href=\"{}\">{}</a>",
        html::escape(&item.identifier).replace('"', "&quot;"),
        html::escape(&config.read_more_label),
    ));
    parts.join("\n\n")
}
