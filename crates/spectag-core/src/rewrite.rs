//! Splicing resolved bodies back into text
//!
//! A tag is rewritten as one [`Replacement`] covering its span. The opening
//! marker is kept as written unless its `hash` has to change, and every body
//! line is emitted with the comment prefix captured from the line it
//! replaces, so the host file's comment style survives.

use crate::resolve::{Resolution, Style};
use crate::tag::{LineTemplate, SourceSpan, Tag};
use eyre::Result;

/// New text for a span of the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub span: SourceSpan,
    pub text: String,
}

/// Build the replacement for one resolved tag
pub fn render_tag(source: &str, tag: &Tag, resolution: &Resolution) -> Replacement {
    let mut attributes = tag.attributes.clone();
    let hash_changed = resolution.refresh_hash && attributes.get("hash") != Some(resolution.hash.as_str());
    if resolution.refresh_hash {
        attributes.set("hash", resolution.hash.as_str());
    }

    if resolution.style == Style::Hash {
        let text = if hash_changed || !tag.self_closing {
            attributes.to_opening(true)
        } else {
            source[tag.span.range()].to_string()
        };
        return Replacement { span: tag.span, text };
    }

    // self-closing tags grow a body and need a plain `>` terminator
    let opening = if hash_changed || tag.self_closing {
        attributes.to_opening(false)
    } else {
        source[tag.opening.range()].to_string()
    };

    Replacement {
        span: tag.span,
        text: render_body(tag, &opening, &resolution.lines),
    }
}

/// Opening marker, one templated line per body line, then `</spec>` on its
/// own line
fn render_body(tag: &Tag, opening: &str, lines: &[String]) -> String {
    let newline = tag.newline;
    let closing = tag
        .closing_template
        .as_ref()
        .unwrap_or(&tag.opening_template);
    let fallback_indent = tag.opening_template.indent.as_str();

    let mut out = String::from(opening);
    out.push_str(newline);
    for (i, line) in lines.iter().enumerate() {
        out.push_str(&template_for(tag, i).render(line, fallback_indent));
        out.push_str(newline);
    }
    out.push_str(&closing.full());
    out.push_str("</spec>");
    out
}

/// Template of body line `i`: the captured one, else the last captured one,
/// else the closing line's, else the opening line's
fn template_for(tag: &Tag, i: usize) -> &LineTemplate {
    tag.lines
        .get(i)
        .or_else(|| tag.lines.last())
        .map(|l| &l.template)
        .or(tag.closing_template.as_ref())
        .unwrap_or(&tag.opening_template)
}

/// Apply replacements to a text in a single pass.
///
/// Replacements may come in any order but must not overlap.
pub fn apply(text: &str, mut replacements: Vec<Replacement>) -> Result<String> {
    replacements.sort_by_key(|r| r.span.offset);

    for pair in replacements.windows(2) {
        if pair[0].span.end() > pair[1].span.offset {
            eyre::bail!(
                "overlapping replacements at bytes {}..{} and {}..{}",
                pair[0].span.offset,
                pair[0].span.end(),
                pair[1].span.offset,
                pair[1].span.end()
            );
        }
    }
    if let Some(last) = replacements.last() {
        if last.span.end() > text.len() {
            eyre::bail!("replacement at byte {} is past the end of the text", last.span.offset);
        }
    }

    // Apply from the last offset to the first so earlier spans stay valid
    let mut out = text.to_string();
    for r in replacements.iter().rev() {
        out.replace_range(r.span.range(), &r.text);
    }
    Ok(out)
}

/// Replace one tag's body with the given lines
pub fn rewrite(text: &str, tag: &Tag, lines: &[String]) -> Result<String> {
    let opening = &text[tag.opening.range()];
    let replacement = Replacement {
        span: tag.span,
        text: render_body(tag, opening, lines),
    };
    apply(text, vec![replacement])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::scan;
    use indoc::indoc;

    fn first_tag(text: &str) -> Tag {
        scan(text).next().expect("a tag").expect("valid tag")
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn resolution(style: Style, body: &[&str]) -> Resolution {
        Resolution {
            style,
            lines: lines(body),
            hash: "0123abcd".into(),
            refresh_hash: false,
        }
    }

    #[test]
    fn test_first_use() {
        let text = "fn a() {}\n    // <spec fn=\"f\" fork=\"deneb\"></spec>\nfn f() {}\n";
        let tag = first_tag(text);
        let body = lines(&["def f():", "", "    return 1"]);
        let out = rewrite(text, &tag, &body).unwrap();
        assert_eq!(
            out,
            indoc! {r#"
                fn a() {}
                    // <spec fn="f" fork="deneb">
                    // def f():
                    //
                    //     return 1
                    // </spec>
                fn f() {}
            "#}
        );
    }

    #[test]
    fn test_idempotent() {
        let text = "  # <spec fn=\"f\" fork=\"deneb\"></spec>\nx = 1\n";
        let body = lines(&["def f():", "", "    return 1"]);

        let once = rewrite(text, &first_tag(text), &body).unwrap();
        let twice = rewrite(&once, &first_tag(&once), &body).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_keeps_each_line_prefix() {
        let text = indoc! {r#"
            /**
             * <spec fn="f" fork="deneb">
             * old
             *
             * lines
             * </spec>
             */
        "#};
        let tag = first_tag(text);
        let body = lines(&["a", "", "b", "c"]);
        let out = rewrite(text, &tag, &body).unwrap();
        assert_eq!(
            out,
            indoc! {r#"
                /**
                 * <spec fn="f" fork="deneb">
                 * a
                 *
                 * b
                 * c
                 * </spec>
                 */
            "#}
        );

        // stripping each captured prefix gives the lines back
        let again = first_tag(&out);
        assert_eq!(again.contents(), vec!["a", "", "b", "c"]);
    }

    #[test]
    fn test_shorter_body_drops_templates() {
        let text = "// <spec fn=\"f\" fork=\"deneb\">\n// one\n// two\n// three\n// </spec>\n";
        let out = rewrite(text, &first_tag(text), &lines(&["only"])).unwrap();
        assert_eq!(out, "// <spec fn=\"f\" fork=\"deneb\">\n// only\n// </spec>\n");
    }

    #[test]
    fn test_crlf() {
        let text = "// <spec fn=\"f\" fork=\"deneb\"></spec>\r\nfn f() {}\r\n";
        let out = rewrite(text, &first_tag(text), &lines(&["a", "b"])).unwrap();
        assert_eq!(
            out,
            "// <spec fn=\"f\" fork=\"deneb\">\r\n// a\r\n// b\r\n// </spec>\r\nfn f() {}\r\n"
        );
    }

    #[test]
    fn test_hash_refresh() {
        let text = "// <spec fn=\"f\" fork=\"deneb\" hash=\"ffffffff\"></spec>\n";
        let tag = first_tag(text);
        let mut res = resolution(Style::Full, &["x"]);
        res.refresh_hash = true;
        let replacement = render_tag(text, &tag, &res);
        let out = apply(text, vec![replacement]).unwrap();
        assert_eq!(
            out,
            "// <spec fn=\"f\" fork=\"deneb\" hash=\"0123abcd\">\n// x\n// </spec>\n"
        );

        // unchanged hash keeps the opening marker byte for byte
        let tag = first_tag(&out);
        let again = apply(&out, vec![render_tag(&out, &tag, &res)]).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn test_hash_style_is_self_closing() {
        let text = "# <spec ssz_object=\"B\" fork=\"deneb\" style=\"hash\">\n# old\n# </spec>\n";
        let tag = first_tag(text);
        let mut res = resolution(Style::Hash, &[]);
        res.refresh_hash = true;
        let out = apply(text, vec![render_tag(text, &tag, &res)]).unwrap();
        assert_eq!(
            out,
            "# <spec ssz_object=\"B\" fork=\"deneb\" style=\"hash\" hash=\"0123abcd\" />\n"
        );

        let tag = first_tag(&out);
        assert!(tag.self_closing);
        let again = apply(&out, vec![render_tag(&out, &tag, &res)]).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn test_self_closing_expands() {
        let text = "// <spec fn=\"f\" fork=\"deneb\" />\n";
        let tag = first_tag(text);
        let out = apply(text, vec![render_tag(text, &tag, &resolution(Style::Full, &["x"]))]).unwrap();
        assert_eq!(out, "// <spec fn=\"f\" fork=\"deneb\">\n// x\n// </spec>\n");
    }

    #[test]
    fn test_apply_rejects_overlap() {
        let r = |offset, length| Replacement {
            span: SourceSpan::new(offset, length),
            text: String::new(),
        };
        assert!(apply("0123456789", vec![r(4, 3), r(0, 5)]).is_err());
        assert_eq!(apply("0123456789", vec![r(6, 2), r(0, 2)]).unwrap(), "234589");
    }
}
