//! Navigation document (NCX).
//!
//! Construction is two-phase: callers build the tree of navigation
//! points in document order, and `to_xml` finalizes it — one pre-order
//! traversal assigns play orders from a counter local to that call and
//! raises the depth high-water mark. Nothing is computed during the
//! build phase, and re-serializing an unchanged tree yields identical
//! output.

use crate::extract::TocNode;

use super::escape_xml;

/// One navigation point: a label, a content source, and nested children.
///
/// Play order and depth are not stored here; they exist only in the
/// serialized output.
#[derive(Debug, Clone)]
pub struct NavPoint {
    pub title: String,
    pub src: String,
    children: Vec<NavPoint>,
}

impl NavPoint {
    fn new(title: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            src: src.into(),
            children: Vec::new(),
        }
    }

    /// Append a child point and return a handle to it for further nesting.
    pub fn add_nav_point(
        &mut self,
        title: impl Into<String>,
        src: impl Into<String>,
    ) -> &mut NavPoint {
        let index = self.children.len();
        self.children.push(NavPoint::new(title, src));
        &mut self.children[index]
    }

    pub fn children(&self) -> &[NavPoint] {
        &self.children
    }
}

/// The navigation model: a forest of [`NavPoint`]s plus the document
/// title and unique identifier carried in the NCX head.
#[derive(Debug)]
pub struct Navigation {
    uid: String,
    pub title: String,
    points: Vec<NavPoint>,
}

/// Play-order counter. Created fresh for every serialization pass and
/// threaded through the traversal, so no state leaks across calls or
/// across models.
struct PlayOrder(usize);

impl PlayOrder {
    fn next(&mut self) -> usize {
        self.0 += 1;
        self.0
    }
}

impl Navigation {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            title: "Untitled".to_string(),
            points: Vec::new(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Append a root-level point and return a handle to it.
    pub fn add_nav_point(
        &mut self,
        title: impl Into<String>,
        src: impl Into<String>,
    ) -> &mut NavPoint {
        let index = self.points.len();
        self.points.push(NavPoint::new(title, src));
        &mut self.points[index]
    }

    /// Mirror an extracted table of contents into navigation points.
    pub fn add_toc_nodes(&mut self, nodes: &[TocNode]) {
        for node in nodes {
            let point = self.add_nav_point(node.title(), node.src());
            add_toc_children(point, node.children());
        }
    }

    pub fn points(&self) -> &[NavPoint] {
        &self.points
    }

    /// Serialize the NCX navigation document.
    ///
    /// `src` values are emitted as given; this layer performs no
    /// validation on them.
    pub fn to_xml(&self) -> String {
        // Render the map first: play order and depth fall out of the same
        // pre-order pass, and the head needs the final depth.
        let mut nav_map = String::new();
        let mut order = PlayOrder(0);
        // An empty map still declares depth 1
        let mut depth = 1usize;
        for point in &self.points {
            write_nav_point(point, 1, &mut order, &mut depth, &mut nav_map);
        }

        let mut ncx = String::new();
        ncx.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
        );
        ncx.push_str(&format!(
            "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
            escape_xml(&self.uid)
        ));
        ncx.push_str(&format!(
            "    <meta name=\"dtb:depth\" content=\"{depth}\"/>\n"
        ));
        ncx.push_str("    <meta name=\"dtb:totalPageCount\" content=\"0\"/>\n");
        ncx.push_str("    <meta name=\"dtb:maxPageNumber\" content=\"0\"/>\n");
        ncx.push_str("  </head>\n  <docTitle>\n");
        ncx.push_str(&format!("    <text>{}</text>\n", escape_xml(&self.title)));
        ncx.push_str("  </docTitle>\n  <navMap>\n");
        ncx.push_str(&nav_map);
        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }
}

fn add_toc_children(parent: &mut NavPoint, nodes: &[TocNode]) {
    for node in nodes {
        let point = parent.add_nav_point(node.title(), node.src());
        add_toc_children(point, node.children());
    }
}

fn write_nav_point(
    point: &NavPoint,
    level: usize,
    order: &mut PlayOrder,
    depth: &mut usize,
    out: &mut String,
) {
    if level > *depth {
        *depth = level;
    }
    let play_order = order.next();
    let indent = "  ".repeat(level + 1);

    out.push_str(&format!(
        "{indent}<navPoint id=\"navPoint-{play_order}\" playOrder=\"{play_order}\">\n"
    ));
    out.push_str(&format!(
        "{indent}  <navLabel>\n{indent}    <text>{}</text>\n{indent}  </navLabel>\n",
        escape_xml(&point.title)
    ));
    out.push_str(&format!(
        "{indent}  <content src=\"{}\"/>\n",
        escape_xml(&point.src)
    ));

    for child in &point.children {
        write_nav_point(child, level + 1, order, depth, out);
    }

    out.push_str(&format!("{indent}</navPoint>\n"));
}
