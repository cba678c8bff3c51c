//! Spec tag scanner
//!
//! Finds `<spec ...>` markers in arbitrary text, whatever comment syntax hosts
//! them. For every marker the scanner records its attributes, its spans, and
//! the comment prefix and indentation of each line of its body, so that the
//! rewriter can re-emit the body exactly the way it found it.

use crate::error::{TagError, TagErrorKind};

const OPEN: &str = "<spec";
const CLOSE: &str = "</spec>";

/// Byte span in scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    /// Byte offset from start of text
    pub offset: usize,
    /// Byte length
    pub length: usize,
}

impl SourceSpan {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.end()
    }
}

/// Ordered `name="value"` pairs of an opening marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Update an attribute in place, or append it if absent
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render an opening marker carrying these attributes
    pub fn to_opening(&self, self_closing: bool) -> String {
        let mut out = String::from(OPEN);
        for (k, v) in self.iter() {
            out.push_str(&format!(" {k}=\"{v}\""));
        }
        out.push_str(if self_closing { " />" } else { ">" });
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The non-content text in front of one line of a tag body
///
/// `prefix` is the leading whitespace plus the comment marker (`    //`,
/// `#`, ` *`, or nothing at all), `indent` the whitespace separating the
/// marker from the content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTemplate {
    pub prefix: String,
    pub indent: String,
}

impl LineTemplate {
    pub fn new(prefix: impl Into<String>, indent: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            indent: indent.into(),
        }
    }

    /// Build a template from the text in front of a marker, e.g. `"    // "`
    pub fn from_leader(leader: &str) -> Self {
        let prefix = leader.trim_end_matches([' ', '\t']);
        Self::new(prefix, &leader[prefix.len()..])
    }

    /// `prefix` followed by `indent`
    pub fn full(&self) -> String {
        format!("{}{}", self.prefix, self.indent)
    }

    /// Emit one content line with this template. `fallback_indent` is used
    /// when this template was captured from a blank line and has no indent.
    pub fn render(&self, content: &str, fallback_indent: &str) -> String {
        if content.is_empty() {
            return self.full().trim_end().to_string();
        }
        let indent = if self.indent.is_empty() {
            fallback_indent
        } else {
            &self.indent
        };
        format!("{}{}{}", self.prefix, indent, content)
    }

    /// Split a body line into its template and content.
    ///
    /// Lines starting with the opening template keep it. Blank comment lines
    /// capture themselves verbatim. Anything else is split generically.
    pub fn capture<'l>(line: &'l str, opening: &LineTemplate) -> (LineTemplate, &'l str) {
        let full = opening.full();
        if let Some(content) = line.strip_prefix(full.as_str()) {
            return (opening.clone(), content);
        }
        if line.trim_end() == full.trim_end() {
            return (LineTemplate::new(line, ""), "");
        }
        Self::split_generic(line)
    }

    fn split_generic(line: &str) -> (LineTemplate, &str) {
        let ws = line.len() - line.trim_start().len();
        let rest = &line[ws..];
        let marker = rest.find(|c| !is_comment_marker(c)).unwrap_or(rest.len());
        let after = &rest[marker..];
        let indent = if after.starts_with([' ', '\t']) { 1 } else { 0 };
        (
            LineTemplate::new(&line[..ws + marker], &after[..indent]),
            &after[indent..],
        )
    }
}

fn is_comment_marker(c: char) -> bool {
    matches!(c, '/' | '*' | '#' | '-' | ';' | '!' | '%' | '\'')
}

/// One line of an existing tag body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyLine {
    pub template: LineTemplate,
    pub content: String,
}

/// A spec tag found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Attributes of the opening marker, in source order
    pub attributes: Attributes,
    /// Line number of the opening marker (1-indexed)
    pub line: usize,
    /// The whole tag, from `<spec` to the end of `</spec>` (or `/>`)
    pub span: SourceSpan,
    /// The opening marker
    pub opening: SourceSpan,
    /// Everything between the opening marker and `</spec>`
    pub body: SourceSpan,
    /// Whether the tag was written `<spec ... />`
    pub self_closing: bool,
    /// Template derived from the text in front of `<spec`
    pub opening_template: LineTemplate,
    /// Template of the `</spec>` line, if it sits on its own line
    pub closing_template: Option<LineTemplate>,
    /// Existing body lines, between the opening and closing lines
    pub lines: Vec<BodyLine>,
    /// Line terminator used on the opening line
    pub newline: &'static str,
}

impl Tag {
    /// Captured templates, one per existing body line
    pub fn templates(&self) -> impl Iterator<Item = &LineTemplate> {
        self.lines.iter().map(|l| &l.template)
    }

    /// Existing body contents with templates removed
    pub fn contents(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.content.as_str()).collect()
    }
}

/// Scan text for spec tags.
///
/// The returned [`Scanner`] is lazy and can be cloned to restart from the
/// same position.
pub fn scan(text: &str) -> Scanner<'_> {
    Scanner {
        text,
        pos: 0,
        counted: 0,
        line: 1,
    }
}

/// Iterator over the tags of a text, in document order
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    counted: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn line_at(&mut self, offset: usize) -> usize {
        self.line += self.text[self.counted..offset].matches('\n').count();
        self.counted = offset;
        self.line
    }

    fn parse_at(&self, start: usize, line: usize) -> Result<Tag, String> {
        let text = self.text;
        let (attributes, open_end, self_closing) = parse_opening(text, start)?;

        let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let opening_template = LineTemplate::from_leader(&text[line_start..start]);
        let newline = match text[open_end..].find('\n') {
            Some(i) if text[..open_end + i].ends_with('\r') => "\r\n",
            _ => "\n",
        };

        let mut tag = Tag {
            attributes,
            line,
            span: SourceSpan::new(start, open_end - start),
            opening: SourceSpan::new(start, open_end - start),
            body: SourceSpan::new(open_end, 0),
            self_closing,
            opening_template,
            closing_template: None,
            lines: Vec::new(),
            newline,
        };

        if self_closing {
            return Ok(tag);
        }

        let rest = &text[open_end..];
        let close = rest
            .find(CLOSE)
            .ok_or_else(|| "missing closing `</spec>`".to_string())?;
        if rest[..close].contains(OPEN) {
            return Err("missing closing `</spec>` before the next `<spec`".to_string());
        }

        let body = &rest[..close];
        tag.body = SourceSpan::new(open_end, close);
        tag.span = SourceSpan::new(start, open_end + close + CLOSE.len() - start);

        if let Some(first_nl) = body.find('\n') {
            let last_nl = body.rfind('\n').unwrap_or(first_nl);
            tag.closing_template = Some(LineTemplate::from_leader(&body[last_nl + 1..]));
            if last_nl > first_nl {
                tag.lines = body[first_nl + 1..last_nl]
                    .split('\n')
                    .map(|raw| {
                        let raw = raw.strip_suffix('\r').unwrap_or(raw);
                        let (template, content) =
                            LineTemplate::capture(raw, &tag.opening_template);
                        BodyLine {
                            template,
                            content: content.to_string(),
                        }
                    })
                    .collect();
            }
        }

        Ok(tag)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Tag, TagError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.pos + self.text[self.pos..].find(OPEN)?;
            let after = start + OPEN.len();

            // `<specification>` and friends are not markers
            match self.text[after..].chars().next() {
                Some(c) if c.is_whitespace() || c == '>' || c == '/' => {}
                _ => {
                    self.pos = after;
                    continue;
                }
            }

            let line = self.line_at(start);
            return Some(match self.parse_at(start, line) {
                Ok(tag) => {
                    self.pos = tag.span.end();
                    Ok(tag)
                }
                Err(message) => {
                    self.pos = after;
                    Err(TagError {
                        line,
                        span: SourceSpan::new(start, OPEN.len()),
                        kind: TagErrorKind::Malformed(message),
                    })
                }
            });
        }
    }
}

/// Parse `<spec k="v" ...>` starting at `start`.
///
/// Returns the attributes, the offset just past the marker, and whether it
/// was self-closing.
fn parse_opening(text: &str, start: usize) -> Result<(Attributes, usize, bool), String> {
    let bytes = text.as_bytes();
    let mut attributes = Attributes::new();
    let mut i = start + OPEN.len();

    loop {
        let ws_start = i;
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        let had_space = i > ws_start;

        match bytes.get(i) {
            None | Some(b'\n') | Some(b'\r') => {
                return Err("opening marker is not terminated on its line".to_string());
            }
            Some(b'>') => return Ok((attributes, i + 1, false)),
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                return Ok((attributes, i + 2, true));
            }
            _ => {}
        }

        if !had_space {
            return Err("expected whitespace between attributes".to_string());
        }

        let name_start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
            i += 1;
        }
        if i == name_start {
            let c = text[i..].chars().next().unwrap_or(' ');
            return Err(format!("unexpected character `{c}` in opening marker"));
        }
        let name = &text[name_start..i];

        if bytes.get(i) != Some(&b'=') {
            return Err(format!("attribute `{name}` has no value"));
        }
        i += 1;
        if bytes.get(i) != Some(&b'"') {
            return Err(format!("value of `{name}` must be double-quoted"));
        }
        i += 1;

        let value_start = i;
        let value_len = text[i..]
            .find(['"', '\n'])
            .filter(|&n| bytes[i + n] == b'"')
            .ok_or_else(|| format!("unterminated value for `{name}`"))?;
        let value = &text[value_start..value_start + value_len];
        i = value_start + value_len + 1;

        if attributes.contains(name) {
            return Err(format!("duplicate attribute `{name}`"));
        }
        attributes.set(name, value);
    }
}
