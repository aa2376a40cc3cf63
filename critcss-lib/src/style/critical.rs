//! The critical-rule selection engine.
//!
//! Walks stylesheets in order and decides per rule whether it is needed
//! to render the document's current structure. Selector rules are kept
//! when their pseudo-stripped selector matches at least one element;
//! `@font-face` rules are kept when their family is in use, either
//! against the resolved family set or, lacking one, by textual
//! co-occurrence with the CSS already selected.

use crate::dom::dom_tree::Document;
use crate::minify;
use crate::style::fonts::sanitize_family;
use crate::style::matcher::{query_matches, strip_pseudo_selectors};
use crate::style::stylesheet::{Rule, Stylesheet};
use regex::Regex;
use std::collections::HashSet;

/// Assembles the critical CSS for `document` from `stylesheets`.
///
/// Output order is stylesheet-then-rule order; each included rule's raw
/// text is appended with a single leading separator space. With `minify`
/// the assembled string is passed through the CSS minifier.
pub fn select_critical(
    document: &Document,
    stylesheets: &[Stylesheet],
    families: &HashSet<String>,
    minify_output: bool,
) -> String {
    let mut css = String::new();
    let mut deferred: Vec<(&str, &str)> = Vec::new();

    for sheet in stylesheets {
        for rule in &sheet.rules {
            match rule {
                Rule::Style {
                    selector,
                    css_text,
                    declarations,
                } => {
                    if css_text.is_empty() {
                        continue;
                    }
                    if *declarations == 0 {
                        continue;
                    }
                    // Pseudo-selectors are not answerable by structural
                    // lookup; left in place they would sink the rule.
                    let stripped = strip_pseudo_selectors(selector);
                    if query_matches(document, &stripped) {
                        css.push(' ');
                        css.push_str(css_text);
                    } else {
                        log::debug!("dropping rule with no matching elements: {}", selector);
                    }
                }
                Rule::FontFace { family, css_text } => {
                    let Some(family) = family.as_deref() else {
                        continue;
                    };
                    if !families.is_empty() {
                        if families.contains(&sanitize_family(family)) {
                            css.push(' ');
                            css.push_str(css_text);
                        }
                    } else {
                        // Usage is unknowable up front; decide after the
                        // main pass against the selected CSS itself.
                        deferred.push((family, css_text));
                    }
                }
            }
        }
    }

    for (family, css_text) in deferred {
        if references_family(&css, &sanitize_family(family)) {
            css.push(' ');
            css.push_str(css_text);
        }
    }

    if minify_output {
        css = minify::minify_css(&css);
    }
    css
}

/// True if the CSS text contains a `font` or `font-family` declaration
/// mentioning the family, case-insensitively.
///
/// Contract: purely textual, used only when no live family set exists; it
/// can be fooled by the family name appearing in an unrelated declaration
/// on the same line, which errs toward inclusion.
pub fn references_family(css: &str, family: &str) -> bool {
    let pattern = format!(r"(?i)font(-family)?:.*?{}.*?[;}}]", regex::escape(family));
    Regex::new(&pattern)
        .map(|re| re.is_match(css))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::html::parse_document;
    use pretty_assertions::assert_eq;

    fn sheet(css: &str) -> Stylesheet {
        Stylesheet::parse(css).expect("test css parses")
    }

    #[test]
    fn references_family_finds_both_declaration_forms() {
        assert!(references_family(" p { font-family: Foo; }", "Foo"));
        assert!(references_family(" p { font: 12px Foo, serif; }", "Foo"));
        assert!(references_family(" p { font-family: foo; }", "Foo"));
        assert!(!references_family(" p { color: red; }", "Foo"));
        assert!(!references_family("", "Foo"));
    }

    #[test]
    fn keeps_rules_whose_selectors_match() {
        let document = parse_document("<html><body><p>x</p></body></html>");
        let sheets = [sheet("p { color: red; } .missing { color: blue; }")];
        let css = select_critical(&document, &sheets, &HashSet::new(), true);
        assert_eq!(css, "p{color:red}");
    }

    #[test]
    fn strips_pseudo_selectors_before_matching() {
        let document = parse_document("<html><body><a href=\"#\">x</a></body></html>");
        let sheets = [sheet("a:hover { color: red; }")];
        let css = select_critical(&document, &sheets, &HashSet::new(), true);
        assert_eq!(css, "a:hover{color:red}");
    }

    #[test]
    fn immediate_font_face_check_uses_the_family_set() {
        let document = parse_document("<html><body><p>x</p></body></html>");
        let sheets = [sheet(
            "@font-face { font-family: Foo; src: url(foo.woff2); }\
             @font-face { font-family: Bar; src: url(bar.woff2); }",
        )];
        let families: HashSet<String> = ["Foo".to_string(), "serif".to_string()].into();
        let css = select_critical(&document, &sheets, &families, true);
        assert!(css.contains("font-family:Foo"));
        assert!(!css.contains("Bar"));
    }

    #[test]
    fn deferred_font_face_rides_along_with_referencing_rules() {
        let document = parse_document("<html><body><p>x</p></body></html>");
        let sheets = [sheet(
            "p { font-family: Foo; }\
             @font-face { font-family: Foo; src: url(foo.woff2); }\
             @font-face { font-family: Bar; src: url(bar.woff2); }",
        )];
        let css = select_critical(&document, &sheets, &HashSet::new(), true);
        assert!(css.contains("@font-face"));
        assert!(css.contains("font-family:Foo;src:"));
        assert!(!css.contains("Bar"));
    }

    #[test]
    fn deferred_font_face_without_references_is_dropped() {
        let document = parse_document("<html><body><p>x</p></body></html>");
        let sheets = [sheet(
            "p { color: red; } @font-face { font-family: Foo; src: url(foo.woff2); }",
        )];
        let css = select_critical(&document, &sheets, &HashSet::new(), true);
        assert_eq!(css, "p{color:red}");
    }

    #[test]
    fn bare_pseudo_element_rules_are_dropped() {
        let document = parse_document("<html><body><p>x</p></body></html>");
        let sheets = [sheet("::before { content: \"*\"; } p { color: red; }")];
        let css = select_critical(&document, &sheets, &HashSet::new(), true);
        assert_eq!(css, "p{color:red}");
    }

    #[test]
    fn preserves_stylesheet_then_rule_order() {
        let document = parse_document("<html><body><p>x</p><a href=\"#\">y</a></body></html>");
        let sheets = [sheet("p { color: red; }"), sheet("a { color: green; }")];
        let css = select_critical(&document, &sheets, &HashSet::new(), true);
        assert_eq!(css, "p{color:red}a{color:green}");
    }

    #[test]
    fn unminified_output_keeps_leading_separator_spaces() {
        let document = parse_document("<html><body><p>x</p></body></html>");
        let sheets = [sheet("p { color: red; }")];
        let css = select_critical(&document, &sheets, &HashSet::new(), false);
        assert!(css.starts_with(' '));
        assert!(css.trim_start().starts_with("p {"));
    }
}
