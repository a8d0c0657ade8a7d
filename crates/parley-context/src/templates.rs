/// Marker the summarizer is asked to end its output with
pub const SUMMARY_SENTINEL: &str = "### END SUMMARY";

/// Prefix of the synthetic system message carrying a summary
pub const SUMMARY_PREFIX: &str = "Previous conversation summary: ";

/// System instruction for the summary request
pub const DEFAULT_SUMMARIZATION_PROMPT: &str = r#"Role: You are the scribe for an ongoing conversation. Compress everything said so far into as few tokens as possible without losing any detail the next assistant needs to continue seamlessly.

Output Rules:
- Language: English.
- Length: no fixed limit; keep every essential detail.
- Format: one tight paragraph of semicolon-separated clauses in a third-person narrator voice, no line breaks.
- Must keep: names and roles of everyone involved; relationships and emotional tone; promises, agreements, secrets and open questions; places, times, key objects and figures; decisions made, goals, unresolved threads.
- Must drop: greetings, apologies, meta chit-chat, filler, repeated jokes.
- Style: neutral and factual; invent nothing and add no commentary.
- End token: append exactly ### END SUMMARY on a new line."#;

/// Remove a trailing [`SUMMARY_SENTINEL`] (any case) and surrounding whitespace
pub fn strip_sentinel(raw: &str) -> &str {
    let trimmed = raw.trim_end();
    let n = SUMMARY_SENTINEL.len();

    if trimmed.len() >= n && trimmed.is_char_boundary(trimmed.len() - n) {
        let (head, tail) = trimmed.split_at(trimmed.len() - n);
        if tail.eq_ignore_ascii_case(SUMMARY_SENTINEL) {
            return head.trim();
        }
    }

    trimmed.trim()
}
