use monitor_core::{truncate_chars, Alert};

const SUBJECT_TITLE_CHARS: usize = 50;

/// `Reddit Alert: {channel} - {title prefix}...`
pub fn subject(alert: &Alert) -> String {
    format!(
        "Reddit Alert: {} - {}...",
        alert.channel,
        truncate_chars(&alert.title, SUBJECT_TITLE_CHARS)
    )
}

pub fn body(alert: &Alert) -> String {
    format!(
        "\
New relevant post found on Reddit:

Subreddit: r/{channel}
Title: {title}
Author: u/{author}
URL: {url}
Posted: {created}

Post Content:
{excerpt}

---
This is an automated alert from the Reddit monitor.
Please review and respond manually as appropriate.
",
        channel = alert.channel,
        title = alert.title,
        author = alert.author,
        url = alert.url,
        created = alert.created,
        excerpt = alert.excerpt,
    )
}
