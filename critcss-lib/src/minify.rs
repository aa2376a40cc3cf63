//! Whitespace minification for CSS and HTML text.
//!
//! Both transforms are textual heuristics, not syntax-aware rewrites.
//! The CSS pass can mangle values that carry the targeted punctuation
//! inside string literals or URLs; that is a documented limitation of
//! this minifier, not something it tries to detect.

use regex::Regex;
use std::sync::LazyLock;

static CSS_PUNCT_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{}|:;,])\s+").expect("valid pattern"));

static HTML_TAG_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s{2,}<").expect("valid pattern"));

/// Trims the text, collapses whitespace runs around `{ } | : ; ,` and
/// drops semicolons that directly precede a closing brace.
pub fn minify_css(css: &str) -> String {
    CSS_PUNCT_WS
        .replace_all(css.trim(), "$1")
        .replace(";}", "}")
}

/// Trims the text and collapses whitespace runs of two or more characters
/// between adjacent tags. Documents containing a `<pre` tag anywhere are
/// only trimmed: the heuristic cannot scope itself to the outside of the
/// element, so it disables itself globally rather than corrupt preformatted
/// content.
pub fn minify_html(html: &str) -> String {
    if html.contains("<pre") {
        return html.trim().to_string();
    }
    HTML_TAG_GAP.replace_all(html.trim(), "> <").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minifies_css_whitespace_and_trailing_semicolons() {
        assert_eq!(minify_css(" body { color : red; } "), "body{color:red}");
    }

    #[test]
    fn minifies_across_rules() {
        assert_eq!(
            minify_css("p {\n  color: red;\n}\n.card {\n  margin: 0;\n}"),
            "p{color:red}.card{margin:0}"
        );
    }

    #[test]
    fn css_minify_is_idempotent_on_minified_input() {
        let minified = minify_css(" body { color : red; } ");
        assert_eq!(minify_css(&minified), minified);
    }

    #[test]
    fn collapses_gaps_between_tags() {
        assert_eq!(
            minify_html("  <div>\n    <p>Hi</p>\n  </div>  "),
            "<div> <p>Hi</p> </div>"
        );
    }

    #[test]
    fn keeps_single_space_gaps_untouched() {
        assert_eq!(minify_html("<b>a</b> <i>b</i>"), "<b>a</b> <i>b</i>");
    }

    #[test]
    fn pre_tag_disables_html_minification_globally() {
        let html = " <div>\n   <span>x</span>\n</div><pre>  keep\n  this</pre> ";
        assert_eq!(minify_html(html), html.trim());
    }
}
