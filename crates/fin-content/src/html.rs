//! Readable text from HTML

use crate::Result;
use regex::{Captures, Regex};

/// Title, description and body text of a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: String,
}

/// Regex-based HTML to text conversion
///
/// Drops `script`, `style`, `noscript` and comments, removes the remaining
/// tags, decodes entities and collapses whitespace.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    hidden: Vec<Regex>,
    comment: Regex,
    tag: Regex,
    title: Regex,
    meta_description: Regex,
    meta_content: Regex,
    entity: Regex,
    whitespace: Regex,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        let hidden = ["script", "style", "noscript"]
            .iter()
            .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            hidden,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            title: Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>")?,
            meta_description: Regex::new(r#"(?is)<meta\b[^>]*\bname\s*=\s*["']description["'][^>]*>"#)?,
            meta_content: Regex::new(r#"(?is)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            entity: Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    pub fn extract(&self, html: &str) -> Extracted {
        let title = self
            .title
            .captures(html)
            .map(|c| self.clean(&c[1]))
            .filter(|t| !t.is_empty());

        let description = self
            .meta_description
            .find(html)
            .and_then(|m| self.meta_content.captures(m.as_str()))
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|v| self.clean(v.as_str()))
            .filter(|d| !d.is_empty());

        let mut body = self.comment.replace_all(html, " ").into_owned();
        for pattern in &self.hidden {
            body = pattern.replace_all(&body, " ").into_owned();
        }
        if let Some(range) = self.title.find(&body).map(|m| m.range()) {
            body.replace_range(range, " ");
        }

        Extracted {
            title,
            description,
            text: self.clean(&self.tag.replace_all(&body, " ")),
        }
    }

    fn clean(&self, fragment: &str) -> String {
        let decoded = self.decode_entities(fragment);
        self.whitespace.replace_all(&decoded, " ").trim().to_string()
    }

    pub fn decode_entities(&self, text: &str) -> String {
        self.entity
            .replace_all(text, |caps: &Captures<'_>| {
                decode_entity(&caps[1]).map_or_else(|| caps[0].to_string(), String::from)
            })
            .into_owned()
    }
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = name.strip_prefix('#') {
        return dec.parse().ok().and_then(char::from_u32);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "euro" => '\u{20AC}',
        "pound" => '\u{00A3}',
        "copy" => '\u{00A9}',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
  <title>Fed holds rates &amp; signals cuts</title>
  <meta name="description" content="Markets rally after the decision">
  <style>body { color: red; }</style>
  <script type="text/javascript">var x = "<p>not text</p>";</script>
</head>
<body>
  <!-- tracking pixel -->
  <noscript>Enable JavaScript</noscript>
  <h1>Fed&nbsp;decision</h1>
  <p>Rates stay at 5.25&#37;&ndash;5.50%.</p>
  <p>Stocks  rose &lt;2%&gt; on &#x201C;dovish&#x201D; tone.</p>
</body></html>"#;

    #[test]
    fn test_extract_page() {
        let extracted = HtmlExtractor::new().unwrap().extract(PAGE);
        assert_eq!(extracted.title.as_deref(), Some("Fed holds rates & signals cuts"));
        assert_eq!(extracted.description.as_deref(), Some("Markets rally after the decision"));
        assert_eq!(
            extracted.text,
            "Fed decision Rates stay at 5.25%\u{2013}5.50%. Stocks rose <2%> on \u{201C}dovish\u{201D} tone."
        );
    }

    #[test]
    fn test_unknown_entity_kept() {
        let extractor = HtmlExtractor::new().unwrap();
        assert_eq!(extractor.decode_entities("a &bogus; b &amp; c"), "a &bogus; b & c");
    }

    #[test]
    fn test_plain_text_passthrough() {
        let extracted = HtmlExtractor::new().unwrap().extract("just   text\n here");
        assert_eq!(extracted.text, "just text here");
        assert!(extracted.title.is_none());
    }
}
