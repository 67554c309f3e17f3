//! Keyword emojis for replies

/// Keyword families checked in order; the first hit picks the emoji
const EMOJI_RULES: &[(&[&str], &str)] = &[
    (&["good", "well"], "✅"),
    (&["warning", "fast"], "⚠️"),
    (&["error", "fail"], "❌"),
    (&["exam", "time"], "⏰"),
    (&["note", "tip"], "💡"),
    (&["amazing", "great"], "🎉"),
];

fn emoji_for(sentence: &str) -> Option<&'static str> {
    let lower = sentence.to_lowercase();
    EMOJI_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, emoji)| *emoji)
}

/// Split on sentence ends (`.`, `!` or `?` followed by whitespace)
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    out.push(&text[start..i + c.len_utf8()]);
                    start = i + c.len_utf8();
                }
            }
        }
    }
    out.push(&text[start..]);

    out.into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Append a matching emoji after each sentence of `reply`
pub fn decorate_reply(reply: &str) -> String {
    sentences(reply)
        .into_iter()
        .map(|s| match emoji_for(s) {
            Some(emoji) => format!("{} {}", s, emoji),
            None => s.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
