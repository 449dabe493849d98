// Cross-cutting prompt fragments and prompt-building utilities.
// Matching and email each keep their own prompts.rs alongside them.

/// Appended to the user prompt for the single corrective retry after a reply
/// failed schema validation.
pub const STRICT_JSON_RETRY: &str = "\
    IMPORTANT: Your previous reply could not be used because it was not a single valid JSON \
    object with every required field. Reply again with ONLY the JSON object described above. \
    No prose before or after it, no markdown fences, no comments, no trailing commas. \
    Every numeric field must be a bare number, not a string.";

/// Cuts `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Fills `{name}` placeholders in `template` in one left-to-right pass.
///
/// Substituted values are copied verbatim and never scanned again, so a value
/// that itself contains `{name}` stays literal. Braces that do not name a known
/// placeholder (JSON shape examples) are kept as they are.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let filled = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });
        match filled {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
