//! Selector-driven table of contents extraction.
//!
//! Scraped pages mark up their tables of contents in wildly inconsistent
//! ways: items may be `<li>` wrappers or bare anchors, sublists may be
//! nested inside an item or dropped next to it as a sibling, and plenty
//! of entries are plain junk without an href. The extractor walks the
//! document with four caller-supplied selector roles and reconstructs the
//! hierarchy as faithfully as the markup allows, skipping what it can't
//! resolve.

use log::warn;

use crate::dom::{Dom, NodeId, Selector};
use crate::error::Result;
use crate::util::collapse_whitespace;

/// Selector patterns for the four semantic roles of a source document.
///
/// Each pattern is an opaque CSS selector string; the extractor never
/// interprets the syntax itself.
#[derive(Debug, Clone)]
pub struct Selectors {
    /// The document title element.
    pub title: String,
    /// The container holding the entire table of contents.
    pub toc_root: String,
    /// One table of contents entry (an anchor, or a wrapper around one).
    pub toc_item: String,
    /// A nested subsection container inside (or following) an item.
    pub toc_section: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            title: "h1".to_string(),
            toc_root: ".toc".to_string(),
            toc_item: "li".to_string(),
            toc_section: "ul".to_string(),
        }
    }
}

impl Selectors {
    /// Parse all four patterns up front.
    ///
    /// A malformed pattern is a configuration error and surfaces here,
    /// before any extraction begins.
    pub fn compile(&self) -> Result<CompiledSelectors> {
        Ok(CompiledSelectors {
            title: Selector::parse(&self.title)?,
            toc_root: Selector::parse(&self.toc_root)?,
            toc_item: Selector::parse(&self.toc_item)?,
            toc_section: Selector::parse(&self.toc_section)?,
        })
    }
}

/// Compiled form of [`Selectors`], ready for matching.
pub struct CompiledSelectors {
    title: Selector,
    toc_root: Selector,
    toc_item: Selector,
    toc_section: Selector,
}

/// One extracted table of contents entry. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
    title: String,
    uri: String,
    fragment: Option<String>,
    children: Vec<TocNode>,
}

impl TocNode {
    pub(crate) fn from_href(
        title: String,
        href: &str,
        current_asset: &str,
        children: Vec<TocNode>,
    ) -> Self {
        let (path, fragment) = match href.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment.to_string())),
            None => (href, None),
        };
        // An empty path segment means the link targets the enclosing document
        let uri = if path.is_empty() {
            current_asset.to_string()
        } else {
            path.to_string()
        };
        Self {
            title,
            uri,
            fragment,
            children,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Path component of the link, never empty.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Fragment component of the link, absent when the href had no `#`.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn children(&self) -> &[TocNode] {
        &self.children
    }

    /// Render the link as a `uri#fragment` content source.
    pub fn src(&self) -> String {
        match &self.fragment {
            Some(fragment) => format!("{}#{}", self.uri, fragment),
            None => self.uri.clone(),
        }
    }
}

/// Extract the document title: collapsed text of the first element
/// matching the `title` selector, or `None` when the document has none.
pub fn extract_title(dom: &Dom, selectors: &CompiledSelectors) -> Option<String> {
    dom.select_first(dom.document(), &selectors.title)
        .map(|id| collapse_whitespace(&dom.text_content(id)))
}

/// Extract the table of contents.
///
/// Returns an empty sequence when no element matches the `toc_root`
/// selector; that is the only whole-structure failure and it is
/// non-fatal. Individual items that cannot be resolved to a link are
/// skipped silently.
pub fn extract_toc(dom: &Dom, selectors: &CompiledSelectors, current_asset: &str) -> Vec<TocNode> {
    match dom.select_first(dom.document(), &selectors.toc_root) {
        Some(root) => walk_section(dom, root, selectors, current_asset),
        None => {
            warn!("table of contents not found ({})", current_asset);
            Vec::new()
        }
    }
}

fn walk_section(
    dom: &Dom,
    section: NodeId,
    selectors: &CompiledSelectors,
    current_asset: &str,
) -> Vec<TocNode> {
    let mut nodes = Vec::new();
    // Sibling sections adopted by an earlier item; their entries belong to
    // that item's recursion, not to this level.
    let mut adopted: Vec<NodeId> = Vec::new();

    // Outermost matches only: an item nested inside another matched item
    // belongs to the recursion below it, not to this level.
    for item in dom.select_outermost(section, &selectors.toc_item) {
        if has_ancestor_in(dom, item, section, &adopted) {
            continue;
        }

        let Some(anchor) = resolve_anchor(dom, item) else {
            continue;
        };
        let Some(href) = dom.get_attr(anchor, "href") else {
            continue;
        };

        let title = collapse_whitespace(&dom.text_content(anchor));

        let mut subsections = dom.select_outermost(item, &selectors.toc_section);
        if subsections.is_empty()
            && let Some(sibling) = dom.next_element_sibling(item)
            && dom.matches(sibling, &selectors.toc_section)
        {
            // Markup frequently nests a sibling list rather than a child
            subsections.push(sibling);
            adopted.push(sibling);
        }

        // When several subsections match, each is walked but only the last
        // result is kept. Inherited behavior, kept on purpose; see DESIGN.md.
        let mut children = Vec::new();
        for subsection in subsections {
            children = walk_section(dom, subsection, selectors, current_asset);
        }

        nodes.push(TocNode::from_href(
            title,
            href,
            current_asset,
            children,
        ));
    }

    nodes
}

/// Whether `node` has an ancestor in `set`, walking up to (but not
/// including) `stop`.
fn has_ancestor_in(dom: &Dom, node: NodeId, stop: NodeId, set: &[NodeId]) -> bool {
    if set.is_empty() {
        return false;
    }
    let mut current = dom.get(node).map(|n| n.parent).unwrap_or(NodeId::NONE);
    while current.is_some() && current != stop {
        if set.contains(&current) {
            return true;
        }
        current = dom.get(current).map(|n| n.parent).unwrap_or(NodeId::NONE);
    }
    false
}

/// The item itself when it is an anchor, otherwise its first descendant
/// anchor in document order.
fn resolve_anchor(dom: &Dom, item: NodeId) -> Option<NodeId> {
    let is_anchor = |id: NodeId| dom.element_name(id).is_some_and(|n| n.as_ref() == "a");

    if is_anchor(item) {
        return Some(item);
    }
    dom.descendants(item).find(|&id| is_anchor(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    const ASSET: &str = "doc.html";

    fn compiled() -> CompiledSelectors {
        Selectors::default().compile().unwrap()
    }

    fn toc(html: &str) -> Vec<TocNode> {
        let dom = parse_html(html);
        extract_toc(&dom, &compiled(), ASSET)
    }

    fn node(title: &str, uri: &str, fragment: Option<&str>, children: Vec<TocNode>) -> TocNode {
        TocNode {
            title: title.to_string(),
            uri: uri.to_string(),
            fragment: fragment.map(str::to_string),
            children,
        }
    }

    #[test]
    fn test_nested_list_extraction() {
        let result = toc(
            r##"<div class="toc"><ul>
                <li><a href="#a">Intro</a></li>
                <li><a href="#b">Ch1</a><ul><li><a href="#b1">Ch1.1</a></li></ul></li>
            </ul></div>"##,
        );

        assert_eq!(
            result,
            vec![
                node("Intro", ASSET, Some("a"), vec![]),
                node(
                    "Ch1",
                    ASSET,
                    Some("b"),
                    vec![node("Ch1.1", ASSET, Some("b1"), vec![])],
                ),
            ]
        );
    }

    #[test]
    fn test_missing_root_is_empty_not_error() {
        let result = toc(r##"<div class="contents"><ul><li><a href="#a">A</a></li></ul></div>"##);
        assert!(result.is_empty());
    }

    #[test]
    fn test_items_without_anchor_or_href_are_skipped() {
        let result = toc(
            r##"<div class="toc"><ul>
                <li>no link here</li>
                <li><a>anchor without href</a></li>
                <li><a href="#real">Real</a></li>
            </ul></div>"##,
        );

        assert_eq!(result, vec![node("Real", ASSET, Some("real"), vec![])]);
    }

    #[test]
    fn test_empty_href_targets_current_document() {
        let result = toc(r#"<div class="toc"><ul><li><a href="">Top</a></li></ul></div>"#);
        assert_eq!(result, vec![node("Top", ASSET, None, vec![])]);
    }

    #[test]
    fn test_href_without_fragment() {
        let result =
            toc(r#"<div class="toc"><ul><li><a href="other.html">Other</a></li></ul></div>"#);
        assert_eq!(result, vec![node("Other", "other.html", None, vec![])]);
        assert_eq!(result[0].src(), "other.html");
    }

    #[test]
    fn test_uri_and_fragment_split() {
        let result =
            toc(r#"<div class="toc"><ul><li><a href="ch2.html#s3">S3</a></li></ul></div>"#);
        assert_eq!(result, vec![node("S3", "ch2.html", Some("s3"), vec![])]);
        assert_eq!(result[0].src(), "ch2.html#s3");
    }

    #[test]
    fn test_title_whitespace_collapsed() {
        let result = toc(
            "<div class=\"toc\"><ul><li><a href=\"#a\">  Chapter\n\t  One  </a></li></ul></div>",
        );
        assert_eq!(result[0].title(), "Chapter One");
    }

    #[test]
    fn test_sibling_list_fallback() {
        // The sublist follows the item as a sibling instead of nesting in it
        let result = toc(
            r##"<div class="toc"><ul>
                <li><a href="#a">A</a></li>
                <ul><li><a href="#a1">A1</a></li></ul>
                <li><a href="#b">B</a></li>
            </ul></div>"##,
        );

        // The stray <ul> stays a sibling of the <li> entries, so A adopts
        // it, its entries are not repeated at the top level, and B stands
        // alone.
        assert_eq!(
            result,
            vec![
                node("A", ASSET, Some("a"), vec![node("A1", ASSET, Some("a1"), vec![])]),
                node("B", ASSET, Some("b"), vec![]),
            ]
        );
    }

    #[test]
    fn test_sibling_fallback_ignores_lists_inside_next_item() {
        // The next item's own nested list must not be adopted by this one
        let result = toc(
            r##"<div class="toc"><ul>
                <li><a href="#a">A</a></li>
                <li><a href="#b">B</a><ul><li><a href="#b1">B1</a></li></ul></li>
            </ul></div>"##,
        );

        assert!(result[0].children().is_empty());
        assert_eq!(result[1].children().len(), 1);
    }

    #[test]
    fn test_last_subsection_match_wins() {
        // Two sublists inside one item: only the last one's entries are kept
        let result = toc(
            r##"<div class="toc"><ol>
                <li><a href="#a">A</a>
                    <ul><li><a href="#a1">First</a></li></ul>
                    <ul><li><a href="#a2">Second</a></li></ul>
                </li>
            </ol></div>"##,
        );

        assert_eq!(
            result,
            vec![node(
                "A",
                ASSET,
                Some("a"),
                vec![node("Second", ASSET, Some("a2"), vec![])],
            )]
        );
    }

    #[test]
    fn test_item_that_is_itself_an_anchor() {
        let dom = parse_html(
            r##"<div class="toc">
                <a href="#one">One</a>
                <a href="#two">Two</a>
            </div>"##,
        );
        let selectors = Selectors {
            toc_item: "a".to_string(),
            ..Selectors::default()
        }
        .compile()
        .unwrap();

        let result = extract_toc(&dom, &selectors, ASSET);
        assert_eq!(
            result,
            vec![
                node("One", ASSET, Some("one"), vec![]),
                node("Two", ASSET, Some("two"), vec![]),
            ]
        );
    }

    #[test]
    fn test_deep_nesting() {
        let result = toc(
            r##"<div class="toc"><ul><li><a href="#1">1</a>
                <ul><li><a href="#11">1.1</a>
                    <ul><li><a href="#111">1.1.1</a></li></ul>
                </li></ul>
            </li></ul></div>"##,
        );

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].children().len(), 1);
        assert_eq!(result[0].children()[0].children().len(), 1);
        assert_eq!(
            result[0].children()[0].children()[0].title(),
            "1.1.1"
        );
    }

    #[test]
    fn test_extract_title() {
        let dom = parse_html("<html><body><h1>  The\n Title </h1><p>x</p></body></html>");
        assert_eq!(
            extract_title(&dom, &compiled()).as_deref(),
            Some("The Title")
        );

        let dom = parse_html("<html><body><p>no heading</p></body></html>");
        assert_eq!(extract_title(&dom, &compiled()), None);
    }

    #[test]
    fn test_malformed_selector_surfaces_before_extraction() {
        let bad = Selectors {
            toc_root: "div[".to_string(),
            ..Selectors::default()
        };
        assert!(matches!(
            bad.compile(),
            Err(crate::Error::InvalidSelector { .. })
        ));
    }
}
