// src/markdown/html.rs
// =============================================================================
// Raw HTML embedded in Markdown.
//
// pulldown-cmark hands us HTML as opaque Html events. We parse each chunk with
// the `scraper` crate (html5ever underneath) for two things:
// - link targets: <a href>, <img src>, <source src>
// - explicit anchors: any id="..." and <a name="...">
//
// Chunks are usually fragments (an opening tag on its own, one line of an
// HTML block); html5ever copes with unclosed tags, so parsing each chunk on
// its own is enough.
// =============================================================================

use scraper::{Html, Selector};

// Extracts every link-like attribute value from an HTML chunk, in document order
pub fn extract_html_links(html: &str) -> Vec<String> {
    let mut links = Vec::new();

    let Ok(selector) = Selector::parse("a[href], img[src], source[src]") else {
        return links;
    };

    let fragment = Html::parse_fragment(html);
    for element in fragment.select(&selector) {
        let value = element.value();
        if let Some(target) = value.attr("href").or_else(|| value.attr("src")) {
            links.push(target.to_string());
        }
    }

    links
}

// Extracts explicit anchors: ids on any element and legacy <a name>.
// Returned in their canonical lowercase form.
pub fn explicit_anchors(html: &str) -> Vec<String> {
    let mut anchors = Vec::new();

    let (Ok(with_id), Ok(named)) = (Selector::parse("[id]"), Selector::parse("a[name]")) else {
        return anchors;
    };

    let fragment = Html::parse_fragment(html);
    for element in fragment.select(&with_id) {
        if let Some(id) = element.value().attr("id") {
            anchors.push(id.trim().to_lowercase());
        }
    }
    for element in fragment.select(&named) {
        if let Some(name) = element.value().attr("name") {
            anchors.push(name.trim().to_lowercase());
        }
    }

    anchors.retain(|a| !a.is_empty());
    anchors
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why not a regex over the HTML?
//    - Attribute quoting varies (single, double, none) and entities need
//      decoding; html5ever already does both the way a browser would
//
// 2. Why `let Ok(selector) = ... else`?
//    - Selector::parse returns a Result; our selectors are constants, but we
//      still degrade to "no links" rather than panic
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_anchor_and_image() {
        let html = r#"<p><a href="./guide.md#setup">Guide</a> <img src='img/logo.png'></p>"#;
        assert_eq!(extract_html_links(html), vec!["./guide.md#setup", "img/logo.png"]);
    }

    #[test]
    fn test_unclosed_tag_fragment() {
        let html = r#"<a href="https://example.com/docs">"#;
        assert_eq!(extract_html_links(html), vec!["https://example.com/docs"]);
    }

    #[test]
    fn test_explicit_anchors_are_lowercased() {
        let html = r#"<a name="Legacy-Anchor"></a><div id="Custom_ID">x</div>"#;
        let anchors = explicit_anchors(html);
        assert!(anchors.contains(&"legacy-anchor".to_string()));
        assert!(anchors.contains(&"custom_id".to_string()));
    }

    #[test]
    fn test_closing_tag_has_nothing() {
        assert!(extract_html_links("</a>").is_empty());
        assert!(explicit_anchors("</div>").is_empty());
    }
}
