//! Display formatting for one corpus line
//!
//! A corpus line looks like `[42] **Alice:** Hello **World**`. Formatting runs
//! as a small pipeline:
//! 1. split off the leading `[N]` unit id
//! 2. tokenize `**bold**` pairs
//! 3. render bold text as Unicode sans-serif bold; emphasis (not speaker
//!    tags) gets a line break before it unless it is the first bold segment
//! 4. break the line after each `Speaker: `
//!
//! Unexpected shapes pass through unchanged; formatting never fails.

/// A corpus line prepared for the selection widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayUnit {
    /// Number from a leading `[N]` marker
    pub unit_id: Option<u64>,
    /// Text shown to the annotator (spans are selected from this)
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Plain(&'a str),
    Bold(&'a str),
}

const BOLD_MARKER: &str = "**";

// Mathematical Sans-Serif Bold, capital A and small a
const BOLD_UPPER_A: u32 = 0x1D5D4;
const BOLD_LOWER_A: u32 = 0x1D5EE;

/// Extract the unit id and render the display text
pub fn format_for_display(raw: &str) -> DisplayUnit {
    let (unit_id, body) = split_unit_id(raw);
    let rendered = render(&tokenize(body));
    DisplayUnit {
        unit_id,
        text: break_after_speaker(&rendered),
    }
}

/// Split `[N]` plus following whitespace from the start of `raw`
///
/// Returns the input unchanged when there is no marker or N does not fit.
fn split_unit_id(raw: &str) -> (Option<u64>, &str) {
    let Some(rest) = raw.strip_prefix('[') else {
        return (None, raw);
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 || !rest[digits_len..].starts_with(']') {
        return (None, raw);
    }
    match rest[..digits_len].parse::<u64>() {
        Ok(id) => (Some(id), rest[digits_len + 1..].trim_start()),
        Err(_) => (None, raw),
    }
}

/// Pair up `**` markers left to right; an unpaired marker stays plain text
fn tokenize(body: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut pos = 0;

    while let Some(open) = body[pos..].find(BOLD_MARKER).map(|i| pos + i) {
        let inner_start = open + BOLD_MARKER.len();
        let Some(close) = body[inner_start..].find(BOLD_MARKER).map(|i| inner_start + i) else {
            break;
        };
        if open > pos {
            segments.push(Segment::Plain(&body[pos..open]));
        }
        segments.push(Segment::Bold(&body[inner_start..close]));
        pos = close + BOLD_MARKER.len();
    }

    if pos < body.len() {
        segments.push(Segment::Plain(&body[pos..]));
    }
    segments
}

fn render(segments: &[Segment<'_>]) -> String {
    let mut out = String::new();
    let mut seen_bold = false;

    for segment in segments {
        match *segment {
            Segment::Plain(text) => out.push_str(text),
            // `**Name:**` is a speaker tag: the colon stays plain and the
            // line break comes after it, not before
            Segment::Bold(inner) => match inner.strip_suffix(':') {
                Some(name) => {
                    seen_bold = true;
                    out.push_str(&to_bold(name));
                    out.push(':');
                }
                None => {
                    if seen_bold {
                        out.push('\n');
                    }
                    seen_bold = true;
                    out.push_str(&to_bold(inner));
                }
            },
        }
    }
    out
}

/// Replace the space in every `X: ` (X non-whitespace) with a line break
fn break_after_speaker(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        if c == ':' && chars.peek() == Some(&' ') && prev.is_some_and(|p| !p.is_whitespace()) {
            chars.next();
            out.push('\n');
            prev = Some(' ');
            continue;
        }
        prev = Some(c);
    }
    out
}

/// Map ASCII letters to Unicode sans-serif bold; everything else is unchanged
pub fn to_bold(text: &str) -> String {
    text.chars()
        .map(|c| {
            let code = match c {
                'A'..='Z' => BOLD_UPPER_A + (c as u32 - 'A' as u32),
                'a'..='z' => BOLD_LOWER_A + (c as u32 - 'a' as u32),
                _ => return c,
            };
            char::from_u32(code).unwrap_or(c)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speaker_and_bold_example() {
        let unit = format_for_display("[42] **Alice:** Hello **World**");
        assert_eq!(unit.unit_id, Some(42));
        assert_eq!(unit.text, format!("{}:\nHello \n{}", to_bold("Alice"), to_bold("World")));
    }

    #[test]
    fn test_no_break_before_first_bold_segment() {
        let unit = format_for_display("**Alice:** Hej");
        assert!(unit.text.starts_with(&to_bold("Alice")));
        assert!(!unit.text.starts_with('\n'));
    }

    #[test]
    fn test_later_speaker_tag_gets_no_leading_break() {
        let unit = format_for_display("[3] **Mette:** Ja. **Lars:** Nej.");
        assert_eq!(
            unit.text,
            format!("{}:\nJa. {}:\nNej.", to_bold("Mette"), to_bold("Lars"))
        );
    }

    #[test]
    fn test_emphasis_after_second_speaker_still_breaks() {
        let unit = format_for_display("**Mette:** Ja. **Lars:** Det er **forkert**.");
        assert_eq!(
            unit.text,
            format!(
                "{}:\nJa. {}:\nDet er \n{}.",
                to_bold("Mette"),
                to_bold("Lars"),
                to_bold("forkert")
            )
        );
    }

    #[test]
    fn test_leading_emphasis_has_no_break() {
        let unit = format_for_display("**Bemærk** teksten");
        assert_eq!(unit.text, format!("{} teksten", to_bold("Bemærk")));
    }

    #[test]
    fn test_missing_id_marker_leaves_text() {
        let unit = format_for_display("Ingen markør her");
        assert_eq!(unit.unit_id, None);
        assert_eq!(unit.text, "Ingen markør her");
    }

    #[test]
    fn test_malformed_id_markers_pass_through() {
        assert_eq!(format_for_display("[] tekst").unit_id, None);
        assert_eq!(format_for_display("[12 tekst").text, "[12 tekst");
        assert_eq!(format_for_display("[x1] tekst").text, "[x1] tekst");
        assert_eq!(format_for_display(" [1] tekst").unit_id, None);
    }

    #[test]
    fn test_oversized_id_is_left_in_text() {
        let raw = "[99999999999999999999999] tekst";
        let unit = format_for_display(raw);
        assert_eq!(unit.unit_id, None);
        assert_eq!(unit.text, raw);
    }

    #[test]
    fn test_unmatched_marker_stays_literal() {
        let unit = format_for_display("[1] **Alice:** siger **noget");
        assert_eq!(unit.text, format!("{}:\nsiger **noget", to_bold("Alice")));
    }

    #[test]
    fn test_plain_speaker_colon_breaks_line() {
        let unit = format_for_display("Ordstyrer: Velkommen. Klokken er 10:30.");
        assert_eq!(unit.text, "Ordstyrer:\nVelkommen. Klokken er 10:30.");
    }

    #[test]
    fn test_colon_after_whitespace_is_untouched() {
        assert_eq!(format_for_display("a : b").text, "a : b");
    }

    #[test]
    fn test_to_bold_only_maps_ascii_letters() {
        assert_eq!(to_bold("Az"), "\u{1D5D4}\u{1D607}");
        assert_eq!(to_bold("Ærø 2030!"), "Æ\u{1D5FF}ø 2030!");
    }

    #[test]
    fn test_tokenize_non_greedy_pairs() {
        assert_eq!(
            tokenize("a **b** c **d**"),
            vec![
                Segment::Plain("a "),
                Segment::Bold("b"),
                Segment::Plain(" c "),
                Segment::Bold("d"),
            ]
        );
        assert_eq!(tokenize("****"), vec![Segment::Bold("")]);
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let raw = "[5] **Ordfører:** Skattetrykket er **højest** i Europa.";
        assert_eq!(format_for_display(raw), format_for_display(raw));
    }
}
