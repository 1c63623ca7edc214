/// Word-level text matching shared by the phrase triggers
pub mod text {
    /// Lowercase `text`, turn ASCII punctuation into spaces and collapse
    /// whitespace runs into single spaces.
    pub fn normalize_words(text: &str) -> String {
        text.to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True if `phrase` occurs in `haystack` as a run of whole words.
    ///
    /// `phrase` must already be lowercase and trimmed; it is not normalized
    /// here. The haystack is normalized with [`normalize_words`], so
    /// `"Apple, Inc."` contains `"apple inc"` but `"pineapple"` does not
    /// contain `"apple"`.
    pub fn matches_as_word(haystack: &str, phrase: &str) -> bool {
        let normalized = normalize_words(haystack);
        if normalized.is_empty() {
            return false;
        }
        format!(" {} ", normalized).contains(&format!(" {} ", phrase))
    }
}

/// Trigger time literals
pub mod time {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use chrono_tz::America::New_York;

    use crate::types::TimeError;

    pub const TRIGGER_TIME_FORMAT: &str = "%d %b %Y %H:%M:%S";

    /// Read a `DD Mon YYYY HH:MM:SS` literal as US Eastern wall-clock time.
    ///
    /// Daylight saving is applied for the given date. A time repeated by the
    /// autumn fall-back resolves to its first occurrence; a time skipped by
    /// the spring-forward jump is rejected.
    pub fn parse_eastern(value: &str) -> Result<DateTime<Utc>, TimeError> {
        let naive = NaiveDateTime::parse_from_str(value, TRIGGER_TIME_FORMAT)?;
        New_York
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| TimeError::Nonexistent(value.to_string()))
    }

    /// Render an instant back in the trigger literal format, Eastern time.
    pub fn format_eastern(instant: &DateTime<Utc>) -> String {
        instant
            .with_timezone(&New_York)
            .format(TRIGGER_TIME_FORMAT)
            .to_string()
    }
}

/// Cleanup of HTML fragments found in feed titles and descriptions
pub mod html {
    /// Drop tags, decode the common entities and collapse whitespace.
    pub fn to_plain_text(html: &str) -> String {
        let stripped = html
            .chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' if in_tag => {
                    // keep words on either side of a tag apart
                    text.push(' ');
                    (text, false)
                }
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0;

        decode_entities(&stripped)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn decode_entities(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find('&') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match tail.find(';').filter(|&end| end <= 10) {
                Some(end) => match decode_entity(&tail[1..end]) {
                    Some(c) => {
                        out.push(c);
                        rest = &tail[end + 1..];
                    }
                    None => {
                        out.push('&');
                        rest = &tail[1..];
                    }
                },
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn decode_entity(name: &str) -> Option<char> {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => {
                let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).ok()?
                } else {
                    name.strip_prefix('#')?.parse().ok()?
                };
                char::from_u32(code)
            }
        }
    }
}

/// URL utilities for feed sources
pub mod url {
    use url::Url;

    use crate::types::{AggregatorError, Result};

    /// Parse a feed URL, accepting only http and https.
    pub fn parse_feed_url(url_str: &str) -> Result<Url> {
        let url = Url::parse(url_str)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(AggregatorError::UnsupportedScheme {
                url: url_str.to_string(),
                scheme: scheme.to_string(),
            }),
        }
    }
}
