//! Boilerplate detection for template placeholder text.
//!
//! Templates ship placeholders pre-filled with chrome such as
//! `"Presentation title Page 3"` or `"12 March 2024"`. Patterns are written
//! in a small token language and compiled to anchored, case-insensitive
//! regexes so only whole-text matches count:
//!
//! | Token | Matches |
//! |-------|---------|
//! | literal word | itself, case-insensitive |
//! | `{n}` | a 1–4 digit page/slide number, or the `‹#›` field |
//! | `{day}` | day of month, optional `st/nd/rd/th` |
//! | `{month}` | month name or three-letter abbreviation |
//! | `{year}` | four digits |
//! | `{date}` | `d/m/y`, `d.m.y` or `y-m-d` |
//!
//! Whitespace between tokens in a pattern matches any run of whitespace,
//! `|`, `•`, `·`, `,`, `-`, `–` or `—` in the text. Text containing a number
//! among other words ("Revenue grew 40% in 2024") never matches `{n}` or
//! `{year}` because the match is anchored on both ends.

use regex::Regex;

/// Built-in patterns.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "presentation title page {n}",
    "page {n} {day} {month} {year}",
    "{day} {month} {year}",
    "{month} {day} {year}",
    "{date}",
    "page {n}",
    "slide {n}",
    "{n}",
    "‹#›",
];

const SEPARATOR: &str = r"[\s|•·,\-–—]+";
const NUMBER: &str = r"(?:\d{1,4}|‹#›)";
const DAY: &str = r"(?:0?[1-9]|[12]\d|3[01])(?:st|nd|rd|th)?";
const MONTH: &str = r"(?:january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\.?";
const YEAR: &str = r"\d{4}";
const DATE: &str = r"(?:\d{1,2}[/.]\d{1,2}[/.]\d{2,4}|\d{4}-\d{1,2}-\d{1,2})";

fn token_regex(name: &str) -> Result<&'static str, String> {
    match name {
        "n" => Ok(NUMBER),
        "day" => Ok(DAY),
        "month" => Ok(MONTH),
        "year" => Ok(YEAR),
        "date" => Ok(DATE),
        other => Err(format!("unknown token '{{{}}}'", other)),
    }
}

/// Translate one whitespace-free word of a pattern.
fn compile_word(word: &str) -> Result<String, String> {
    let mut out = String::new();
    let mut rest = word;
    while let Some(open) = rest.find('{') {
        out.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| format!("unterminated token in '{}'", word))?;
        out.push_str(token_regex(&after[..close])?);
        rest = &after[close + 1..];
    }
    out.push_str(&regex::escape(rest));
    Ok(out)
}

/// Compile one pattern to an anchored, case-insensitive regex.
pub fn compile(pattern: &str) -> Result<Regex, String> {
    let words: Vec<&str> = pattern.split_whitespace().collect();
    if words.is_empty() {
        return Err("empty pattern".into());
    }
    let body = words
        .iter()
        .map(|w| compile_word(w))
        .collect::<Result<Vec<_>, _>>()?
        .join(SEPARATOR);
    Regex::new(&format!(r"(?i)^\s*{}\s*$", body)).map_err(|e| e.to_string())
}

/// A compiled set of boilerplate patterns.
#[derive(Debug, Clone)]
pub struct BoilerplateFilter {
    patterns: Vec<Regex>,
}

impl BoilerplateFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, String> {
        let patterns = patterns
            .iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether `text` is template chrome. Empty text is not boilerplate, so
    /// a slot cleared once is never matched again.
    pub fn is_boilerplate(&self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty() && self.patterns.iter().any(|re| re.is_match(text))
    }
}

impl Default for BoilerplateFilter {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS
                .iter()
                .filter_map(|p| compile(p).ok())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compile() {
        for p in DEFAULT_PATTERNS {
            compile(p).unwrap();
        }
        assert_eq!(BoilerplateFilter::default().patterns.len(), DEFAULT_PATTERNS.len());
    }

    #[test]
    fn header_variants_match() {
        let f = BoilerplateFilter::default();
        for text in [
            "Presentation title Page 3",
            "PRESENTATION TITLE  |  PAGE 12",
            "Page 4 12 March 2024",
            "Page 4 • 1st Mar. 2024",
            "12 March 2024",
            "March 12, 2024",
            "Sept 3 2025",
            "12/03/2024",
            "2024-03-12",
            "Slide 7",
            "page ‹#›",
            "‹#›",
            "  42 ",
        ] {
            assert!(f.is_boilerplate(text), "{text}");
        }
    }

    #[test]
    fn real_content_is_not_boilerplate() {
        let f = BoilerplateFilter::default();
        for text in [
            "Revenue grew 40% in 2024",
            "Launch in 12 markets",
            "Page turners: our best sellers",
            "12 months to profitability",
            "Slide deck review process",
            "12345",
            "",
        ] {
            assert!(!f.is_boilerplate(text), "{text}");
        }
    }

    #[test]
    fn unknown_token_rejected() {
        let err = compile("page {weekday}").unwrap_err();
        assert!(err.contains("{weekday}"), "{err}");
        assert!(compile("page {n").is_err());
        assert!(compile("   ").is_err());
    }

    #[test]
    fn literals_are_escaped() {
        let f = BoilerplateFilter::new(&["confidential (draft)"]).unwrap();
        assert!(f.is_boilerplate("Confidential (Draft)"));
        assert!(!f.is_boilerplate("confidential draft"));
    }

    #[test]
    fn cleared_text_is_not_rematched() {
        let f = BoilerplateFilter::default();
        assert!(!f.is_boilerplate("   "));
    }
}
