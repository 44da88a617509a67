//! Inline emphasis markup: `**bold**` and `*italic*`.
//!
//! Generated slide text carries emphasis as lightweight markup. Models often
//! glue markers to neighbouring words (`"is**bold**in"`) or misplace them
//! (`"due to** bold text"`), and the Injector's run parser trusts its input
//! unconditionally. [`repair_emphasis`] makes the markup well-formed:
//!
//! 1. Markers toggle their span open/closed; spans left open at the end of a
//!    line are closed before any trailing punctuation.
//! 2. Whitespace just inside a span moves outside it.
//! 3. Each span gets exactly one space on each outer side, except at a line
//!    edge, next to another marker, or before closing punctuation.
//! 4. Spans with no text are removed.
//!
//! Lines are repaired independently. A lone `*` between spaces or between
//! digits is literal text, not a marker.

use crate::output::{Paragraph, TextRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bold,
    Italic,
}

impl Kind {
    fn marker(self) -> &'static str {
        match self {
            Kind::Bold => "**",
            Kind::Italic => "*",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Text(String),
    Mark { kind: Kind, open: bool },
}

const TRAILING_PUNCT: &[char] = &['.', ',', ';', ':', '!', '?', '…'];
const CLOSING_PUNCT: &[char] = &[
    '.', ',', ';', ':', '!', '?', '…', ')', ']', '}', '"', '\'', '”', '’', '%',
];
const OPENING_PUNCT: &[char] = &['(', '[', '{', '"', '\'', '“', '‘'];

// ── Tokenising ───────────────────────────────────────────────────────────

/// Split a line into text and unpaired markers.
fn lex(line: &str) -> Vec<(Option<Kind>, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut out: Vec<(Option<Kind>, String)> = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '*' {
            text.push(chars[i]);
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i] == '*' {
            i += 1;
        }
        let run = i - start;
        let before = start.checked_sub(1).map(|p| chars[p]);
        let after = chars.get(i).copied();

        let literal = run == 1
            && match (before, after) {
                (Some(b), Some(a)) => {
                    (b.is_whitespace() && a.is_whitespace())
                        || (b.is_ascii_digit() && a.is_ascii_digit())
                }
                (None, Some(a)) => a.is_whitespace(),
                (Some(b), None) => b.is_whitespace(),
                (None, None) => true,
            };
        if literal {
            text.push('*');
            continue;
        }

        if !text.is_empty() {
            out.push((None, std::mem::take(&mut text)));
        }
        let mut left = run;
        while left >= 2 {
            out.push((Some(Kind::Bold), String::new()));
            left -= 2;
        }
        if left == 1 {
            out.push((Some(Kind::Italic), String::new()));
        }
    }
    if !text.is_empty() {
        out.push((None, text));
    }
    out
}

/// Pair markers and close spans still open at the end of the line.
fn pair(lexed: Vec<(Option<Kind>, String)>) -> Vec<Tok> {
    let mut toks: Vec<Tok> = Vec::with_capacity(lexed.len() + 2);
    let mut open: Vec<Kind> = Vec::new();

    for (kind, text) in lexed {
        match kind {
            None => toks.push(Tok::Text(text)),
            Some(k) => {
                if let Some(pos) = open.iter().rposition(|o| *o == k) {
                    open.remove(pos);
                    toks.push(Tok::Mark { kind: k, open: false });
                } else {
                    open.push(k);
                    toks.push(Tok::Mark { kind: k, open: true });
                }
            }
        }
    }

    if open.is_empty() {
        return toks;
    }

    // Peel trailing punctuation off the last text so closers land before it.
    let mut tail = String::new();
    if let Some(Tok::Text(last)) = toks.last_mut() {
        let body_len = last.trim_end_matches(TRAILING_PUNCT).len();
        tail = last.split_off(body_len);
    }
    while let Some(k) = open.pop() {
        toks.push(Tok::Mark { kind: k, open: false });
    }
    if !tail.is_empty() {
        toks.push(Tok::Text(tail));
    }
    toks
}

fn merge_text(toks: Vec<Tok>) -> Vec<Tok> {
    let mut out: Vec<Tok> = Vec::with_capacity(toks.len());
    for tok in toks {
        if let (Some(Tok::Text(prev)), Tok::Text(t)) = (out.last_mut(), &tok) {
            prev.push_str(t);
            continue;
        }
        out.push(tok);
    }
    out
}

/// Remove `open … close` pairs that enclose only whitespace.
fn drop_empty_spans(mut toks: Vec<Tok>) -> Vec<Tok> {
    loop {
        let mut changed = false;
        let mut i = 0;
        while i < toks.len() {
            let Tok::Mark { kind, open: true } = toks[i] else {
                i += 1;
                continue;
            };
            let blank_then_close = |j: usize, toks: &[Tok]| {
                matches!(toks.get(j), Some(Tok::Mark { kind: k, open: false }) if *k == kind)
            };
            if blank_then_close(i + 1, &toks) {
                toks.drain(i..=i + 1);
                toks.insert(i, Tok::Text(" ".into()));
                changed = true;
                continue;
            }
            if let Some(Tok::Text(t)) = toks.get(i + 1) {
                if t.trim().is_empty() && blank_then_close(i + 2, &toks) {
                    toks.drain(i..=i + 2);
                    toks.insert(i, Tok::Text(" ".into()));
                    changed = true;
                    continue;
                }
            }
            i += 1;
        }
        toks = merge_text(toks);
        if !changed {
            return toks;
        }
    }
}

fn collapse_leading_ws(s: &str) -> String {
    let rest = s.trim_start();
    if rest.len() < s.len() {
        format!(" {rest}")
    } else {
        s.to_string()
    }
}

fn collapse_trailing_ws(s: &str) -> String {
    let rest = s.trim_end();
    if rest.len() < s.len() {
        format!("{rest} ")
    } else {
        s.to_string()
    }
}

/// Move inner whitespace outside each span and give every span one space
/// on each outer side.
fn fix_spacing(mut toks: Vec<Tok>) -> Vec<Tok> {
    // Close directly followed by open: the two spans need a separator.
    let mut i = 0;
    while i + 1 < toks.len() {
        if matches!(toks[i], Tok::Mark { open: false, .. })
            && matches!(toks[i + 1], Tok::Mark { open: true, .. })
        {
            toks.insert(i + 1, Tok::Text(" ".into()));
        }
        i += 1;
    }

    for i in 0..toks.len() {
        let Tok::Mark { open, .. } = toks[i] else {
            continue;
        };
        if open {
            if let Some(Tok::Text(next)) = toks.get_mut(i + 1) {
                *next = next.trim_start().to_string();
            }
            if let Some(i_prev) = i.checked_sub(1) {
                if let Tok::Text(prev) = &mut toks[i_prev] {
                    let fixed = collapse_trailing_ws(prev);
                    *prev = match fixed.chars().last() {
                        Some(c) if c.is_whitespace() || OPENING_PUNCT.contains(&c) => fixed,
                        Some(_) => format!("{fixed} "),
                        None => fixed,
                    };
                }
            }
        } else {
            if let Some(i_prev) = i.checked_sub(1) {
                if let Tok::Text(prev) = &mut toks[i_prev] {
                    *prev = prev.trim_end().to_string();
                }
            }
            if let Some(Tok::Text(next)) = toks.get_mut(i + 1) {
                let fixed = collapse_leading_ws(next);
                *next = match fixed.chars().next() {
                    Some(c) if c.is_whitespace() || CLOSING_PUNCT.contains(&c) => fixed,
                    Some(_) => format!(" {fixed}"),
                    None => fixed,
                };
            }
        }
    }
    toks
}

fn squeeze_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_ws = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !prev_ws {
                out.push(' ');
            }
            prev_ws = true;
        } else {
            out.push(c);
            prev_ws = false;
        }
    }
    out
}

fn tokens(line: &str) -> Vec<Tok> {
    let toks = drop_empty_spans(merge_text(pair(lex(line))))
        .into_iter()
        .map(|t| match t {
            Tok::Text(s) => Tok::Text(squeeze_ws(&s)),
            mark => mark,
        })
        .collect();
    fix_spacing(toks)
}

// ── Public API ───────────────────────────────────────────────────────────

/// Make emphasis markup well-formed. Idempotent.
///
/// ```rust
/// use deckwright::pipeline::markup::repair_emphasis;
///
/// assert_eq!(repair_emphasis("due to** bold text"), "due to **bold text**");
/// assert_eq!(repair_emphasis("is**bold**in"), "is **bold** in");
/// ```
pub fn repair_emphasis(text: &str) -> String {
    text.lines()
        .map(|line| {
            let mut out = String::with_capacity(line.len() + 4);
            for tok in tokens(line) {
                match tok {
                    Tok::Text(t) => out.push_str(&t),
                    Tok::Mark { kind, .. } => out.push_str(kind.marker()),
                }
            }
            out.trim().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse repaired markup into paragraphs of formatted runs. One paragraph per
/// non-blank line; empty text yields no paragraphs.
pub fn parse_runs(text: &str) -> Vec<Paragraph> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut runs: Vec<TextRun> = Vec::new();
            let (mut bold, mut italic) = (false, false);
            for tok in tokens(line.trim()) {
                match tok {
                    Tok::Mark { kind: Kind::Bold, open } => bold = open,
                    Tok::Mark { kind: Kind::Italic, open } => italic = open,
                    Tok::Text(t) if t.is_empty() => {}
                    Tok::Text(t) => match runs.last_mut() {
                        Some(r) if r.bold == bold && r.italic == italic => r.text.push_str(&t),
                        _ => runs.push(TextRun { text: t, bold, italic }),
                    },
                }
            }
            Paragraph { runs }
        })
        .collect()
}

/// Strip emphasis markers, keeping literal asterisks.
pub fn plain_text(text: &str) -> String {
    parse_runs(text)
        .iter()
        .map(Paragraph::plain_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Words in `text`, ignoring markup and standalone punctuation.
pub fn word_count(text: &str) -> usize {
    plain_text(text)
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

/// Keep the first `max` words, then repair so no span is left open.
pub fn truncate_words(text: &str, max: usize) -> String {
    let mut kept = 0;
    let mut out: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        let counts = word
            .chars()
            .filter(|c| *c != '*')
            .any(char::is_alphanumeric);
        if counts {
            if kept == max {
                break;
            }
            kept += 1;
        }
        out.push(word);
    }
    let joined = out.join(" ");
    let trimmed = joined.trim_end_matches([',', ';', ':', '-', '–', '—']);
    repair_emphasis(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misplaced_opening_marker() {
        assert_eq!(repair_emphasis("due to** bold text"), "due to **bold text**");
    }

    #[test]
    fn glued_markers_get_spaces() {
        assert_eq!(repair_emphasis("is**bold**in"), "is **bold** in");
        assert_eq!(repair_emphasis("an*italic*word"), "an *italic* word");
    }

    #[test]
    fn inner_whitespace_moves_out() {
        assert_eq!(repair_emphasis("grew ** 40% ** last year"), "grew **40%** last year");
    }

    #[test]
    fn well_formed_text_is_untouched() {
        for s in [
            "This is **bold text** in sentence",
            "Text with *italic* words here",
            "Multiple **bold** and *italic* runs",
            "Revenue grew **40%**.",
            "(**beta**) opens in May",
            "plain text only",
        ] {
            assert_eq!(repair_emphasis(s), s);
        }
    }

    #[test]
    fn unbalanced_span_closes_before_punctuation() {
        assert_eq!(repair_emphasis("ship **faster."), "ship **faster**.");
    }

    #[test]
    fn empty_spans_removed() {
        assert_eq!(repair_emphasis("nothing **** here"), "nothing here");
        assert_eq!(repair_emphasis("a ** ** b"), "a b");
    }

    #[test]
    fn adjacent_spans_are_separated() {
        assert_eq!(repair_emphasis("**a***b*"), "**a** *b*");
    }

    #[test]
    fn literal_asterisks_survive() {
        assert_eq!(repair_emphasis("5*3 = 15"), "5*3 = 15");
        assert_eq!(repair_emphasis("rated * by users"), "rated * by users");
    }

    #[test]
    fn repair_is_idempotent() {
        for s in [
            "due to** bold text",
            "is**bold**in",
            "x *y **z** w* v",
            "ship **faster.",
            "**a***b*",
        ] {
            let once = repair_emphasis(s);
            assert_eq!(repair_emphasis(&once), once, "{s}");
        }
    }

    #[test]
    fn lines_repaired_independently() {
        assert_eq!(
            repair_emphasis("first **open\nsecond line"),
            "first **open**\nsecond line"
        );
    }

    #[test]
    fn parse_runs_splits_formatting() {
        let paras = parse_runs("due to **bold text** and *more*");
        assert_eq!(paras.len(), 1);
        let runs = &paras[0].runs;
        assert_eq!(runs.len(), 4);
        assert_eq!(runs[0], TextRun::plain("due to "));
        assert!(runs[1].bold && !runs[1].italic);
        assert_eq!(runs[1].text, "bold text");
        assert_eq!(runs[2].text, " and ");
        assert!(runs[3].italic);
    }

    #[test]
    fn parse_runs_one_paragraph_per_line() {
        assert_eq!(parse_runs("a\n\nb").len(), 2);
        assert!(parse_runs("").is_empty());
    }

    #[test]
    fn word_count_ignores_markup() {
        assert_eq!(word_count("Launch **Aurora** in *three* markets"), 5);
        assert_eq!(word_count("Now: pilot — 2 teams"), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn truncate_keeps_markup_balanced() {
        assert_eq!(
            truncate_words("Grow **recurring revenue fast** across all regions", 3),
            "Grow **recurring revenue**"
        );
        assert_eq!(truncate_words("one two three,", 3), "one two three");
        assert_eq!(truncate_words("one two", 5), "one two");
    }
}
