use crate::tokenizer::Tokenizer;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_SNIPPET_WINDOW: usize = 160;

const ELLIPSIS: &str = "…";

/// A bounded excerpt with the byte ranges of matched terms.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Snippet {
    pub text: String,
    pub highlights: Vec<(usize, usize)>,
}

impl Snippet {
    /// Render with every highlight wrapped in `open`/`close`.
    pub fn marked(&self, open: &str, close: &str) -> String {
        let mut out = String::with_capacity(self.text.len() + self.highlights.len() * (open.len() + close.len()));
        let mut cursor = 0;
        for &(start, end) in &self.highlights {
            out.push_str(&self.text[cursor..start]);
            out.push_str(open);
            out.push_str(&self.text[start..end]);
            out.push_str(close);
            cursor = end;
        }
        out.push_str(&self.text[cursor..]);
        out
    }
}

impl fmt::Display for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.marked("<em>", "</em>")) }
}

/// Excerpt of `text` around the first matched term, or of `title` when the
/// record has no body (heading markers).
pub fn extract(tokenizer: &Tokenizer, title: &str, text: &str, terms: &HashSet<&str>, window: usize) -> Snippet {
    let source = if text.trim().is_empty() { title } else { text };
    excerpt(tokenizer, source, terms, window)
}

fn excerpt(tokenizer: &Tokenizer, source: &str, terms: &HashSet<&str>, window: usize) -> Snippet {
    let matches: Vec<(usize, usize)> = tokenizer
        .tokenize(source)
        .filter(|tok| terms.contains(tok.term.as_str()))
        .map(|tok| (tok.start, tok.end))
        .collect();

    let offsets: Vec<usize> = source.char_indices().map(|(i, _)| i).collect();
    let total = offsets.len();
    let byte_at = |c: usize| offsets.get(c).copied().unwrap_or(source.len());

    let (begin, end) = if total <= window {
        (0, source.len())
    } else {
        let anchor = matches.first().map_or(0, |m| m.0);
        let anchor_char = offsets.partition_point(|&o| o < anchor);
        let begin_char = anchor_char.saturating_sub(window / 4).min(total - window);
        let begin = byte_at(begin_char);
        let end = byte_at(begin_char + window).max(matches.first().map_or(0, |m| m.1));
        (begin, end)
    };

    let mut text = String::new();
    if begin > 0 {
        text.push_str(ELLIPSIS);
    }
    let shift = text.len();
    // Same byte length as the original, so offsets survive.
    text.extend(source[begin..end].chars().map(|c| if c == '\n' || c == '\t' || c == '\r' { ' ' } else { c }));
    if end < source.len() {
        text.push_str(ELLIPSIS);
    }

    let highlights = matches
        .into_iter()
        .filter(|&(s, e)| s >= begin && e <= end)
        .map(|(s, e)| (s - begin + shift, e - begin + shift))
        .collect();
    Snippet { text, highlights }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set<'a>(terms: &[&'a str]) -> HashSet<&'a str> { terms.iter().copied().collect() }

    #[test]
    fn highlights_every_match_in_short_text() {
        let t = Tokenizer::default();
        let s = extract(&t, "CCM89", "Clayton Cardelli Mathis dust law", &set(&["dust", "law"]), 160);
        assert_eq!(s.to_string(), "Clayton Cardelli Mathis <em>dust</em> <em>law</em>");
    }

    #[test]
    fn falls_back_to_title() {
        let t = Tokenizer::default();
        let s = extract(&t, "Parametric Extinction Laws", "", &set(&["extinction"]), 160);
        assert_eq!(s.to_string(), "Parametric <em>Extinction</em> Laws");
    }

    #[test]
    fn long_text_is_windowed_around_first_match() {
        let t = Tokenizer::default();
        let text = format!("{} reddening {}", "lorem ".repeat(60), "ipsum ".repeat(60));
        let s = extract(&t, "T", &text, &set(&["reddening"]), 40);
        assert!(s.text.starts_with(ELLIPSIS));
        assert!(s.text.ends_with(ELLIPSIS));
        assert_eq!(s.highlights.len(), 1);
        let (a, b) = s.highlights[0];
        assert_eq!(&s.text[a..b], "reddening");
        assert!(s.text.chars().count() <= 40 + 2);
    }

    #[test]
    fn newlines_are_flattened() {
        let t = Tokenizer::default();
        let s = extract(&t, "T", "julia> CCM89(Rv=3.1)(4000)\n1.46", &set(&["ccm89"]), 160);
        assert_eq!(s.to_string(), "julia> <em>CCM89</em>(Rv=3.1)(4000) 1.46");
    }

    #[test]
    fn windowing_respects_char_boundaries() {
        let t = Tokenizer::default();
        let text = format!("{}Schlegel Finkbeiner Davis {}", "é ".repeat(50), "ü ".repeat(50));
        let s = extract(&t, "T", &text, &set(&["davis"]), 30);
        let (a, b) = s.highlights[0];
        assert_eq!(&s.text[a..b], "Davis");
    }
}
