//! Package document (OPF): metadata, manifest, and derived spine.

use crate::error::{Error, Result};

use super::escape_xml;

const MEDIA_TYPE_DOCUMENT: &str = "application/xhtml+xml";
const MEDIA_TYPE_STYLESHEET: &str = "text/css";
const MEDIA_TYPE_NCX: &str = "application/x-dtbncx+xml";

/// Package metadata (Dublin Core).
///
/// `title` and `language` are required and always serialized; the
/// identifier is fixed at construction and can never be overridden.
/// Optional fields are serialized only when set.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub title: String,
    pub language: String,
    identifier: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub relation: Option<String>,
    pub creator: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
    pub rights: Option<String>,
}

impl Metadata {
    fn new(identifier: String) -> Self {
        Self {
            title: "Untitled".to_string(),
            language: "en".to_string(),
            identifier,
            subject: None,
            description: None,
            relation: None,
            creator: None,
            publisher: None,
            date: None,
            rights: None,
        }
    }

    /// The package's unique identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: &'static str,
}

impl ManifestItem {
    fn is_document(&self) -> bool {
        self.media_type == MEDIA_TYPE_DOCUMENT
    }
}

/// Derive the media type from a file extension.
///
/// Total over the supported extension set; anything else is an
/// [`Error::UnsupportedMediaType`].
fn media_type_for(href: &str) -> Result<&'static str> {
    let name = href.trim().to_ascii_lowercase();
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

    match extension {
        "html" | "htm" => Ok(MEDIA_TYPE_DOCUMENT),
        "css" => Ok(MEDIA_TYPE_STYLESHEET),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "gif" => Ok("image/gif"),
        "svg" => Ok("image/svg+xml"),
        "ncx" => Ok(MEDIA_TYPE_NCX),
        _ => Err(Error::UnsupportedMediaType(href.to_string())),
    }
}

/// The package model: an append-only manifest, the metadata record, and
/// the spine derived from document-typed manifest entries.
#[derive(Debug)]
pub struct Package {
    pub metadata: Metadata,
    items: Vec<ManifestItem>,
    document_count: usize,
    style_count: usize,
    image_count: usize,
    ncx_count: usize,
}

impl Package {
    /// Create a package with the given unique identifier.
    ///
    /// The navigation document's manifest entry is pre-seeded.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::new(identifier.into()),
            items: vec![ManifestItem {
                id: "ncx".to_string(),
                href: "toc.ncx".to_string(),
                media_type: MEDIA_TYPE_NCX,
            }],
            document_count: 0,
            style_count: 0,
            image_count: 0,
            ncx_count: 0,
        }
    }

    /// Add a file to the manifest.
    ///
    /// The media type is derived from the href's extension; an
    /// unsupported extension fails the call and leaves the manifest (and
    /// therefore the spine) unchanged. When `id` is `None`, one is
    /// synthesized from a role-specific counter (`item_N`, `css_N`,
    /// `img_N`). Caller-supplied ids must not collide with already-used
    /// ids; that is the caller's responsibility.
    pub fn add_item(&mut self, href: &str, id: Option<&str>) -> Result<&ManifestItem> {
        let media_type = media_type_for(href)?;

        let id = match id {
            Some(id) => id.to_string(),
            None => self.next_id(media_type),
        };

        let index = self.items.len();
        self.items.push(ManifestItem {
            id,
            href: href.to_string(),
            media_type,
        });
        Ok(&self.items[index])
    }

    fn next_id(&mut self, media_type: &str) -> String {
        if media_type == MEDIA_TYPE_DOCUMENT {
            self.document_count += 1;
            format!("item_{}", self.document_count)
        } else if media_type == MEDIA_TYPE_STYLESHEET {
            self.style_count += 1;
            format!("css_{}", self.style_count)
        } else if media_type.starts_with("image/") {
            self.image_count += 1;
            format!("img_{}", self.image_count)
        } else {
            self.ncx_count += 1;
            format!("ncx_{}", self.ncx_count)
        }
    }

    /// All manifest items in insertion order.
    pub fn manifest(&self) -> &[ManifestItem] {
        &self.items
    }

    /// The spine: document items, in manifest insertion order.
    pub fn spine(&self) -> impl Iterator<Item = &ManifestItem> {
        self.items.iter().filter(|item| item.is_document())
    }

    /// Serialize the OPF package document.
    pub fn to_xml(&self) -> String {
        let mut opf = String::new();

        opf.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="dcidid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"
      xmlns:dcterms="http://purl.org/dc/terms/"
      xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
      xmlns:opf="http://www.idpf.org/2007/opf">
"#,
        );

        // Required elements
        opf.push_str(&format!(
            "    <dc:title>{}</dc:title>\n",
            escape_xml(&self.metadata.title)
        ));
        opf.push_str(&format!(
            "    <dc:language xsi:type=\"dcterms:RFC3066\">{}</dc:language>\n",
            escape_xml(&self.metadata.language)
        ));
        opf.push_str(&format!(
            "    <dc:identifier id=\"dcidid\" opf:scheme=\"URI\">{}</dc:identifier>\n",
            escape_xml(&self.metadata.identifier)
        ));

        // Optional elements, emitted only when set
        let optional = [
            ("subject", &self.metadata.subject),
            ("description", &self.metadata.description),
            ("relation", &self.metadata.relation),
            ("creator", &self.metadata.creator),
            ("publisher", &self.metadata.publisher),
            ("date", &self.metadata.date),
            ("rights", &self.metadata.rights),
        ];
        for (element, value) in optional {
            if let Some(value) = value {
                opf.push_str(&format!(
                    "    <dc:{element}>{}</dc:{element}>\n",
                    escape_xml(value)
                ));
            }
        }

        opf.push_str("  </metadata>\n  <manifest>\n");

        for item in &self.items {
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
                escape_xml(&item.id),
                escape_xml(&item.href),
                item.media_type
            ));
        }

        opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");

        for item in self.spine() {
            opf.push_str(&format!(
                "    <itemref idref=\"{}\"/>\n",
                escape_xml(&item.id)
            ));
        }

        opf.push_str("  </spine>\n</package>\n");
        opf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ncx_entry_is_preseeded() {
        let package = Package::new("urn:uuid:test");
        assert_eq!(package.manifest().len(), 1);
        assert_eq!(package.manifest()[0].id, "ncx");
        assert_eq!(package.manifest()[0].media_type, MEDIA_TYPE_NCX);
        assert_eq!(package.spine().count(), 0);
    }

    #[test]
    fn test_manifest_ids_are_unique() {
        let mut package = Package::new("uid");
        package.add_item("intro.html", Some("intro")).unwrap();
        package.add_item("chapter-1.html", None).unwrap();
        package.add_item("chapter-2.html", None).unwrap();
        package.add_item("style.css", None).unwrap();
        package.add_item("more-style.css", None).unwrap();
        package.add_item("logo.jpg", None).unwrap();
        package.add_item("image.png", None).unwrap();
        package.add_item("picture.jpeg", None).unwrap();

        let ids: HashSet<_> = package.manifest().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), package.manifest().len());
    }

    #[test]
    fn test_spine_order_matches_insertion_order() {
        let mut package = Package::new("uid");
        package.add_item("intro.html", Some("intro")).unwrap();
        package.add_item("style.css", None).unwrap();
        package.add_item("chapter-1.html", None).unwrap();
        package.add_item("logo.jpg", None).unwrap();
        package.add_item("glossary.html", Some("glossary")).unwrap();

        let spine: Vec<_> = package.spine().map(|i| i.id.as_str()).collect();
        assert_eq!(spine, vec!["intro", "item_1", "glossary"]);
    }

    #[test]
    fn test_unsupported_media_type_is_atomic() {
        let mut package = Package::new("uid");
        package.add_item("cover.png", None).unwrap();
        let count = package.manifest().len();

        let err = package.add_item("photo.tiff", None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(_)));
        assert_eq!(package.manifest().len(), count);
        assert_eq!(package.spine().count(), 0);
    }

    #[test]
    fn test_media_type_inference() {
        assert_eq!(media_type_for("a.html").unwrap(), "application/xhtml+xml");
        assert_eq!(media_type_for("a.htm").unwrap(), "application/xhtml+xml");
        assert_eq!(media_type_for("a.css").unwrap(), "text/css");
        assert_eq!(media_type_for("a.jpg").unwrap(), "image/jpeg");
        assert_eq!(media_type_for("a.jpeg").unwrap(), "image/jpeg");
        assert_eq!(media_type_for("a.png").unwrap(), "image/png");
        assert_eq!(media_type_for("a.gif").unwrap(), "image/gif");
        assert_eq!(media_type_for("a.svg").unwrap(), "image/svg+xml");
        assert_eq!(media_type_for("a.ncx").unwrap(), "application/x-dtbncx+xml");
        assert!(media_type_for("a.tiff").is_err());
        assert!(media_type_for("no-extension").is_err());
        // Extension matching ignores case and surrounding whitespace
        assert_eq!(media_type_for(" LOGO.JPG ").unwrap(), "image/jpeg");
    }

    #[test]
    fn test_identifier_is_fixed() {
        let mut package = Package::new("urn:x:original");
        package.metadata.title = "New Title".to_string();
        assert_eq!(package.metadata.identifier(), "urn:x:original");
    }

    #[test]
    fn test_opf_required_metadata_always_present() {
        let package = Package::new("urn:uuid:abc");
        let xml = package.to_xml();

        assert!(xml.contains("<dc:title>Untitled</dc:title>"));
        assert!(xml.contains("<dc:language xsi:type=\"dcterms:RFC3066\">en</dc:language>"));
        assert!(xml.contains("<dc:identifier id=\"dcidid\" opf:scheme=\"URI\">urn:uuid:abc</dc:identifier>"));
        assert!(xml.contains("unique-identifier=\"dcidid\""));
    }

    #[test]
    fn test_opf_optional_metadata_only_when_set() {
        let mut package = Package::new("uid");
        let xml = package.to_xml();
        assert!(!xml.contains("<dc:creator>"));
        assert!(!xml.contains("<dc:rights>"));

        package.metadata.creator = Some("A. Author".to_string());
        let xml = package.to_xml();
        assert!(xml.contains("<dc:creator>A. Author</dc:creator>"));
        assert!(!xml.contains("<dc:rights>"));
    }

    #[test]
    fn test_opf_escapes_metadata() {
        let mut package = Package::new("uid");
        package.metadata.title = "Diamonds & <Rust>".to_string();
        let xml = package.to_xml();
        assert!(xml.contains("<dc:title>Diamonds &amp; &lt;Rust&gt;</dc:title>"));
    }

    #[test]
    fn test_opf_manifest_and_spine_blocks() {
        let mut package = Package::new("uid");
        package.add_item("doc.html", None).unwrap();
        package.add_item("style.css", None).unwrap();

        let xml = package.to_xml();
        assert!(xml.contains(
            "<item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>"
        ));
        assert!(xml.contains(
            "<item id=\"item_1\" href=\"doc.html\" media-type=\"application/xhtml+xml\"/>"
        ));
        assert!(xml.contains("<item id=\"css_1\" href=\"style.css\" media-type=\"text/css\"/>"));
        assert!(xml.contains("<spine toc=\"ncx\">"));
        assert!(xml.contains("<itemref idref=\"item_1\"/>"));
        assert!(!xml.contains("<itemref idref=\"css_1\"/>"));
    }
}
