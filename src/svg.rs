//! Rewriting of the SVG header emitted by dvisvgm.
//!
//! dvisvgm opens every file with an XML declaration, a comment naming the
//! tool version and the root `<svg>` element. For embedding into HTML the
//! first two lines go away, the root element receives the caller's class and
//! style attributes, and a `<title>`/`<description>` pair carrying the
//! formula source is inserted right after it.

use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::warn;

/// Version number dvisvgm writes into its header comment, e.g. `3.2.1`.
pub const DVISVGM_VERSION_PATTERN: &str = r"\d+\.\d+\.\d+";

const SVG_NAMESPACES: &str =
    "xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'";

/// Fixed title of every formula image.
pub const TITLE: &str = "LaTeX Math";

/// Outcome of [`rewrite_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// The header was replaced.
    Rewritten,
    /// No dvisvgm header found; the markup was passed through untouched.
    Unmatched,
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            "<\\?xml version='1\\.0' encoding='UTF-8'\\?>\n\
             <!-- This file was generated by dvisvgm {version} -->\n\
             <svg (?P<attribs>.+) {namespaces}>\n",
            version = DVISVGM_VERSION_PATTERN,
            namespaces = regex_lite::escape(SVG_NAMESPACES),
        );
        Regex::new(&pattern).expect("dvisvgm header pattern is valid")
    })
}

/// Replace the dvisvgm header of `svg`.
///
/// `attribs` is spliced verbatim into the root element, so it must start
/// with a space when non-empty. `formula` ends up in the `<description>`.
pub fn rewrite_header(svg: &str, attribs: &str, formula: &str) -> (String, Rewrite) {
    let Some(caps) = header_regex().captures(svg) else {
        warn!(
            target: "math_svg::svg",
            formula,
            "SVG header not recognized; embedding without title and description"
        );
        return (svg.to_string(), Rewrite::Unmatched);
    };

    let (Some(header), Some(original)) = (caps.get(0), caps.name("attribs")) else {
        return (svg.to_string(), Rewrite::Unmatched);
    };

    let mut out = String::with_capacity(svg.len() + formula.len() + attribs.len() + 64);
    out.push_str(&svg[..header.start()]);
    out.push_str(&format!(
        "<svg{} {} {}>\n<title>{}</title>\n<description>\n{}\n</description>\n",
        attribs,
        original.as_str(),
        SVG_NAMESPACES,
        TITLE,
        escape_formula(formula)
    ));
    out.push_str(&svg[header.end()..]);

    (out, Rewrite::Rewritten)
}

/// Make formula source safe to place in element text.
///
/// Backslashes are doubled so the control sequences show up literally,
/// markup characters are escaped.
pub fn escape_formula(formula: &str) -> String {
    formula
        .replace('\\', "\\\\")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::dvisvgm_svg;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rewrite_block_header() {
        let svg = dvisvgm_svg("<g id='page1'/>");
        let (out, outcome) = rewrite_header(&svg, "", "x^2");

        assert_eq!(outcome, Rewrite::Rewritten);
        assert_eq!(
            out,
            "<svg version='1.1' width='20.5pt' height='9.1pt' viewBox='0 -9.1 20.5 9.1' \
             xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>\n\
             <title>LaTeX Math</title>\n\
             <description>\nx^2\n</description>\n\
             <g id='page1'/>\n</svg>"
        );
    }

    #[test]
    fn test_rewrite_injects_attributes() {
        let svg = dvisvgm_svg("<g/>");
        let attribs = r#" class="m-math foo" style="vertical-align: -3.0pt;""#;
        let (out, _) = rewrite_header(&svg, attribs, "a");

        assert!(out.starts_with(
            r#"<svg class="m-math foo" style="vertical-align: -3.0pt;" version='1.1'"#
        ));
        assert!(out.contains("xmlns='http://www.w3.org/2000/svg'"));
        assert!(out.contains("xmlns:xlink='http://www.w3.org/1999/xlink'"));
        assert!(!out.contains("<?xml"));
        assert!(!out.contains("dvisvgm"));
    }

    #[test]
    fn test_title_then_single_description() {
        let (out, _) = rewrite_header(&dvisvgm_svg("<g/>"), "", r"\frac{a}{b}");

        assert_eq!(out.matches("<title>").count(), 1);
        assert_eq!(out.matches("<description>").count(), 1);
        let title = out.find("<title>").unwrap();
        let description = out.find("<description>").unwrap();
        assert!(title < description);
    }

    #[test]
    fn test_backslashes_doubled_in_description() {
        let (out, _) = rewrite_header(&dvisvgm_svg("<g/>"), "", "a\\b");

        let start = out.find("<description>").unwrap() + "<description>".len();
        let end = out.find("</description>").unwrap();
        let text = out[start..end].trim();
        assert_eq!(text.matches('\\').count(), 2);
        assert_eq!(text, "a\\\\b");
    }

    #[test]
    fn test_escape_formula() {
        assert_eq!(escape_formula(r"\alpha<\beta"), r"\\alpha&lt;\\beta");
        assert_eq!(escape_formula("a & b"), "a &amp; b");
    }

    #[test]
    fn test_unmatched_passthrough() {
        let svg = "<svg xmlns='http://www.w3.org/2000/svg'><g/></svg>";
        let (out, outcome) = rewrite_header(svg, " class=\"m-math\"", "x");

        assert_eq!(outcome, Rewrite::Unmatched);
        assert_eq!(out, svg);
    }

    #[test]
    fn test_unknown_version_format_is_unmatched() {
        let svg = dvisvgm_svg("<g/>").replace("3.2.1", "3.2");
        assert_eq!(rewrite_header(&svg, "", "x").1, Rewrite::Unmatched);
    }

    #[test]
    fn test_dollar_signs_survive() {
        let (out, _) = rewrite_header(&dvisvgm_svg("<g/>"), "", "$1 + $2");
        assert!(out.contains("<description>\n$1 + $2\n</description>"));
    }
}
