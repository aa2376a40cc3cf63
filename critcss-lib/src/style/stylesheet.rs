//! Fully-owned stylesheet model.
//!
//! CSS text is parsed once with LightningCSS and immediately copied into
//! owned rules, so no parser lifetimes escape this module. Rule order is
//! preserved end-to-end; it decides output order during selection.

use lightningcss::printer::PrinterOptions;
use lightningcss::rules::font_face::{FontFaceProperty, FontFaceRule};
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, StyleSheet as LightningStyleSheet};
use lightningcss::traits::ToCss;

#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
    /// Carried over from the source node (`<link disabled>` and friends);
    /// disabled sheets are skipped during acquisition.
    pub disabled: bool,
}

/// One rule of a stylesheet. Identity is the raw `css_text`; a rule is
/// included in the output at most once, in original order.
#[derive(Debug, Clone)]
pub enum Rule {
    /// A selector rule: `selector { declarations }`.
    Style {
        /// Full selector list text, comma-joined.
        selector: String,
        /// The rule as CSS text, selector included.
        css_text: String,
        /// Number of declarations, important ones included.
        declarations: usize,
    },
    /// An `@font-face` block.
    FontFace {
        /// Declared `font-family` as the printer renders it; names that
        /// are valid identifiers come out unquoted.
        family: Option<String>,
        css_text: String,
    },
}

impl Stylesheet {
    /// Parses CSS text into an owned stylesheet.
    ///
    /// Error recovery is enabled so a broken declaration does not discard
    /// the whole sheet, matching browser behavior; text the parser cannot
    /// make sense of at all yields `None` and the caller skips the sheet.
    /// Rules other than selector rules and `@font-face` blocks (`@media`,
    /// `@keyframes`, ...) are not candidates for critical output and are
    /// dropped here.
    pub fn parse(css_text: &str) -> Option<Stylesheet> {
        let options = ParserOptions {
            error_recovery: true,
            ..ParserOptions::default()
        };
        let sheet = match LightningStyleSheet::parse(css_text, options) {
            Ok(sheet) => sheet,
            Err(err) => {
                log::warn!("discarding unparseable stylesheet: {}", err);
                return None;
            }
        };

        let mut rules = Vec::new();
        for rule in &sheet.rules.0 {
            let css_text = match rule.to_css_string(PrinterOptions::default()) {
                Ok(text) => text,
                Err(err) => {
                    log::warn!("skipping unprintable rule: {}", err);
                    continue;
                }
            };
            match rule {
                CssRule::Style(style) => {
                    let mut selectors = Vec::new();
                    for selector in &style.selectors.0 {
                        if let Ok(text) = selector.to_css_string(Default::default()) {
                            selectors.push(text);
                        }
                    }
                    let declarations = style.declarations.declarations.len()
                        + style.declarations.important_declarations.len();
                    rules.push(Rule::Style {
                        selector: selectors.join(", "),
                        css_text,
                        declarations,
                    });
                }
                CssRule::FontFace(font_face) => {
                    rules.push(Rule::FontFace {
                        family: font_face_family(font_face),
                        css_text,
                    });
                }
                other => {
                    log::trace!("ignoring non-candidate rule: {:?}", other);
                }
            }
        }

        Some(Stylesheet {
            rules,
            disabled: false,
        })
    }
}

fn font_face_family(rule: &FontFaceRule) -> Option<String> {
    rule.properties.iter().find_map(|property| match property {
        FontFaceProperty::FontFamily(family) => {
            family.to_css_string(PrinterOptions::default()).ok()
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_selector_rules_in_order() {
        let sheet = Stylesheet::parse("p { color: red; } .card { margin: 0; }").expect("parses");
        assert_eq!(sheet.rules.len(), 2);
        match &sheet.rules[0] {
            Rule::Style {
                selector,
                declarations,
                ..
            } => {
                assert_eq!(selector, "p");
                assert_eq!(*declarations, 1);
            }
            other => panic!("expected selector rule, got {:?}", other),
        }
        match &sheet.rules[1] {
            Rule::Style { selector, .. } => assert_eq!(selector, ".card"),
            other => panic!("expected selector rule, got {:?}", other),
        }
    }

    #[test]
    fn keeps_full_selector_lists() {
        let sheet = Stylesheet::parse("h1, h2 { margin: 0; }").expect("parses");
        match &sheet.rules[0] {
            Rule::Style { selector, .. } => assert_eq!(selector, "h1, h2"),
            other => panic!("expected selector rule, got {:?}", other),
        }
    }

    #[test]
    fn extracts_font_face_family() {
        let sheet =
            Stylesheet::parse(r#"@font-face { font-family: "Open Sans"; src: url("os.woff2"); }"#)
                .expect("parses");
        match &sheet.rules[0] {
            Rule::FontFace { family, css_text } => {
                // lightningcss serializes identifier-safe names unquoted.
                assert_eq!(family.as_deref(), Some("Open Sans"));
                assert!(css_text.starts_with("@font-face"));
            }
            other => panic!("expected font-face rule, got {:?}", other),
        }
    }

    #[test]
    fn drops_at_rules_that_cannot_be_critical() {
        let sheet = Stylesheet::parse(
            "@media (min-width: 600px) { p { color: red; } } a { color: blue; }",
        )
        .expect("parses");
        assert_eq!(sheet.rules.len(), 1);
        match &sheet.rules[0] {
            Rule::Style { selector, .. } => assert_eq!(selector, "a"),
            other => panic!("expected selector rule, got {:?}", other),
        }
    }

    #[test]
    fn empty_text_yields_empty_sheet() {
        let sheet = Stylesheet::parse("").expect("parses");
        assert!(sheet.rules.is_empty());
    }
}
