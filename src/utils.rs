//! String helpers shared by the bot and the responder

use unicode_segmentation::UnicodeSegmentation;

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use tempcast_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Split a message into parts of at most `max_chars` characters,
/// preferring line boundaries.
///
/// Lines longer than the limit are cut between grapheme clusters, so an
/// emoji sequence never straddles two parts.
///
/// # Examples
///
/// ```
/// use tempcast_bot::utils::split_long_message;
/// let long_msg = "A fairly long reading summary\n".repeat(300);
/// let parts = split_long_message(&long_msg, 4000);
/// assert!(parts.len() > 1);
/// ```
#[must_use]
pub fn split_long_message(message: &str, max_chars: usize) -> Vec<String> {
    if message.is_empty() || max_chars == 0 {
        return Vec::new();
    }
    if message.chars().count() <= max_chars {
        return vec![message.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in message.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > max_chars && !current.is_empty() {
            parts.push(current.trim_end().to_string());
            current.clear();
            current_len = 0;
        }

        if line_len <= max_chars {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        // Split the long line by grapheme clusters (Unicode-safe)
        for grapheme in line.graphemes(true) {
            let grapheme_len = grapheme.chars().count();
            if current_len + grapheme_len > max_chars && !current.is_empty() {
                parts.push(current.trim_end().to_string());
                current.clear();
                current_len = 0;
            }
            current.push_str(grapheme);
            current_len += grapheme_len;
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim_end().to_string());
    }

    parts.retain(|p| !p.is_empty());
    parts
}
