//! Paragraph scanning over `word/document.xml`
//!
//! This is a lexical scan, not a full XML parse: paragraphs are located by
//! their `<w:p>` element boundaries and their text is rebuilt from `<w:t>`
//! runs, tabs and breaks.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Self-closing form first so `<w:p/>` is never read as an opening tag
    static ref PARAGRAPH_RE: Regex =
        Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>.*?</w:p>").unwrap();
    static ref TEXT_TOKEN_RE: Regex = Regex::new(
        r"(?s)<w:t(?:\s[^>]*)?>(?P<text>[^<]*)</w:t>|<w:(?P<tab>tab)/>|<w:(?P<br>br|cr)(?:\s[^>]*)?/>"
    )
    .unwrap();
}

/// A body paragraph and its byte span inside `word/document.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Paragraph {
    pub fn is_self_closing(&self, xml: &str) -> bool {
        xml[self.start..self.end].ends_with("/>")
    }

    /// Whether the paragraph carries more than `min` non-whitespace characters.
    pub fn is_substantive(&self, min: usize) -> bool {
        self.text.chars().filter(|c| !c.is_whitespace()).count() > min
    }
}

pub fn paragraphs(document_xml: &str) -> Vec<Paragraph> {
    PARAGRAPH_RE
        .find_iter(document_xml)
        .enumerate()
        .map(|(index, m)| Paragraph {
            index,
            start: m.start(),
            end: m.end(),
            text: paragraph_text(m.as_str()),
        })
        .collect()
}

pub fn paragraph_text(paragraph_xml: &str) -> String {
    let mut text = String::new();
    for caps in TEXT_TOKEN_RE.captures_iter(paragraph_xml) {
        if let Some(t) = caps.name("text") {
            text.push_str(&unescape_xml(t.as_str()));
        } else if caps.name("tab").is_some() {
            text.push('\t');
        } else if caps.name("br").is_some() {
            text.push('\n');
        }
    }
    text
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const BODY: &str = concat!(
        r#"<w:body>"#,
        r#"<w:p w:rsidR="00A1"><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Board</w:t></w:r><w:r><w:t xml:space="preserve"> Resolution</w:t></w:r></w:p>"#,
        r#"<w:p/>"#,
        r#"<w:p><w:r><w:t>A</w:t><w:tab/><w:t>B &amp; C</w:t><w:br/><w:t>D</w:t></w:r></w:p>"#,
        r#"<w:sectPr/></w:body>"#
    );

    #[test]
    fn test_finds_paragraphs_in_order() {
        let found = paragraphs(BODY);
        let texts: Vec<_> = found.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Board Resolution", "", "A\tB & C\nD"]);
        assert_eq!(found[1].index, 1);
        assert!(found[1].is_self_closing(BODY));
        assert!(!found[0].is_self_closing(BODY));
    }

    #[test]
    fn test_paragraph_properties_are_not_paragraphs() {
        let xml = r#"<w:p><w:pPr><w:spacing w:after="0"/></w:pPr><w:proofErr w:type="spellStart"/><w:r><w:t>x</w:t></w:r></w:p>"#;
        let found = paragraphs(xml);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].end, xml.len());
    }

    #[test]
    fn test_substantive_counts_non_whitespace() {
        let p = |text: &str| Paragraph { index: 0, start: 0, end: 0, text: text.to_string() };
        assert!(!p("  a b c  ").is_substantive(3));
        assert!(p("abcd").is_substantive(3));
        assert!(!p("").is_substantive(3));
    }

    #[test]
    fn test_unescape_numeric_and_unknown_entities() {
        assert_eq!(unescape_xml("&#65;&#x42;&foo;&amp"), "AB&foo;&amp");
    }

    proptest! {
        #[test]
        fn escaped_text_round_trips_through_unescape(text in "\\PC{0,64}") {
            prop_assert_eq!(unescape_xml(&escape_xml(&text)), text);
        }
    }
}
