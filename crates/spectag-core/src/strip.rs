//! Comment stripping for item renderings
//!
//! Renderings carry editorial comments such as `# [New in Electra:EIP7251]`
//! that track fork history. They are removed before renderings are compared
//! or diffed.

/// Open string literal carried across lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenString {
    quote: u8,
    triple: bool,
}

/// Remove `#` comments from a Python rendering.
///
/// Comment-only lines are dropped, blank lines are kept (as empty lines),
/// trailing comments are cut, and kept lines lose trailing whitespace. `#`
/// inside string literals, including multi-line triple-quoted strings, is
/// left alone.
pub fn strip_comments(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut open: Option<OpenString> = None;

    for line in text.lines() {
        let started_in_string = open.is_some();
        let code = strip_line(line, &mut open);

        if started_in_string {
            // continuation of a multi-line string: content is significant
            out.push(code.trim_end().to_string());
        } else if line.trim().is_empty() {
            out.push(String::new());
        } else if !code.trim().is_empty() {
            out.push(code.trim_end().to_string());
        }
    }

    out
}

/// Cut the comment off one line, tracking string state across lines
fn strip_line<'a>(line: &'a str, open: &mut Option<OpenString>) -> &'a str {
    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match *open {
            Some(s) => {
                if bytes[i] == b'\\' {
                    i += 2;
                    continue;
                }
                if bytes[i] == s.quote {
                    if !s.triple {
                        *open = None;
                    } else if bytes[i..].starts_with(&[s.quote; 3]) {
                        *open = None;
                        i += 3;
                        continue;
                    }
                }
                i += 1;
            }
            None => match bytes[i] {
                b'#' => return &line[..i],
                q @ (b'"' | b'\'') => {
                    let triple = bytes[i..].starts_with(&[q; 3]);
                    *open = Some(OpenString { quote: q, triple });
                    i += if triple { 3 } else { 1 };
                }
                _ => i += 1,
            },
        }
    }

    // single-quoted strings never span lines
    if matches!(open, Some(OpenString { triple: false, .. })) {
        *open = None;
    }
    line
}
