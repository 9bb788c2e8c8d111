//! Rendering of search hits into the context text.

use codescope_symbol_extractor::Language;

pub const CONTEXT_HEADER: &str = "# Relevant code context";

/// Appended to an excerpt that was cut.
pub const TRUNCATION_MARKER: &str = "// ... (truncated)";

/// Shortens `text` to at most `max_chars` characters.
///
/// Cuts at the last line break that fits and appends [`TRUNCATION_MARKER`]
/// on its own line. When the limit cannot hold the marker, the text is cut
/// hard without one. Returns the excerpt and whether it was cut.
pub fn truncate_excerpt(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars + 1 {
        return (text.chars().take(max_chars).collect(), true);
    }

    let budget = max_chars - marker_chars - 1;
    let end = text
        .char_indices()
        .nth(budget)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let head = &text[..end];
    let head = match head.rfind('\n') {
        Some(0) | None => head,
        Some(newline) => &head[..newline],
    };

    (format!("{head}\n{TRUNCATION_MARKER}"), true)
}

/// Whole-number percentage of a similarity score.
pub fn relevance_percent(score: f32) -> i64 {
    (score * 100.0).round() as i64
}

/// One labelled, fenced excerpt.
pub fn format_result(path: &str, score: f32, language: Language, excerpt: &str) -> String {
    let mut out = format!(
        "### {path} (relevance: {}%)\n```{}\n",
        relevance_percent(score),
        language.name()
    );
    out.push_str(excerpt);
    if !excerpt.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```");
    out
}

/// Header plus blocks separated by blank lines; empty when there are none.
pub fn format_context(blocks: &[String]) -> String {
    if blocks.is_empty() {
        return String::new();
    }
    format!("{CONTEXT_HEADER}\n\n{}\n", blocks.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_text_is_kept() {
        assert_eq!(
            truncate_excerpt("fn a() {}\n", 2000),
            ("fn a() {}\n".to_string(), false)
        );
    }

    #[test]
    fn long_file_is_cut_at_a_line_boundary() {
        let line = format!("{}\n", "x".repeat(99));
        let content = line.repeat(50);
        assert_eq!(content.chars().count(), 5000);

        let (excerpt, truncated) = truncate_excerpt(&content, 2000);
        assert!(truncated);
        assert!(excerpt.chars().count() <= 2000);
        assert!(excerpt.ends_with(TRUNCATION_MARKER));

        let body = excerpt
            .strip_suffix(TRUNCATION_MARKER)
            .and_then(|rest| rest.strip_suffix('\n'))
            .expect("marker on its own line");
        assert!(body.lines().all(|l| l.len() == 99));
        assert_eq!(body.lines().count(), 19);
    }

    #[test]
    fn single_long_line_is_cut_mid_line() {
        let content = "y".repeat(5000);
        let (excerpt, truncated) = truncate_excerpt(&content, 100);
        assert!(truncated);
        assert_eq!(excerpt.chars().count(), 100);
        assert!(excerpt.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn tiny_limit_drops_the_marker() {
        let (excerpt, truncated) = truncate_excerpt("abcdefghijklmnopqrstuvwxyz", 5);
        assert!(truncated);
        assert_eq!(excerpt, "abcde");
    }

    #[test]
    fn multibyte_text_is_counted_in_chars() {
        let content = "é".repeat(3000);
        let (excerpt, _) = truncate_excerpt(&content, 2000);
        assert_eq!(excerpt.chars().count(), 2000);
    }

    #[test]
    fn result_block_layout() {
        let block = format_result("src/config.rs", 0.82, Language::Rust, "fn load() {}");
        assert_eq!(
            block,
            "### src/config.rs (relevance: 82%)\n```rust\nfn load() {}\n```"
        );
    }

    #[test]
    fn context_joins_blocks() {
        assert_eq!(format_context(&[]), "");
        let text = format_context(&["a".to_string(), "b".to_string()]);
        assert_eq!(text, "# Relevant code context\n\na\n\nb\n");
    }
}
