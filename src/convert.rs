//! Conversion orchestration: one fetched HTML document in, one EPUB out.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use percent_encoding::percent_decode_str;

use crate::dom::{Dom, parse_html_bytes};
use crate::epub::{Epub, Navigation, Package};
use crate::error::{Error, Result};
use crate::extract::{Selectors, extract_title, extract_toc};
use crate::util::uuid_v4;

/// Options for a conversion run. Metadata fields left as `None` are
/// either derived from the document (title, identifier) or omitted from
/// the output entirely.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub selectors: Selectors,
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub language: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub relation: Option<String>,
    pub creator: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
    pub rights: Option<String>,
}

/// Convert a single HTML file on disk into an in-memory [`Epub`].
///
/// Stylesheets and images the document references by relative path are
/// picked up from the directory alongside it. References that cannot be
/// resolved or carry an unrecognized extension are skipped with a
/// warning; only the main document is load-bearing.
pub fn convert_file<P: AsRef<Path>>(path: P, options: &ConvertOptions) -> Result<Epub> {
    let path = path.as_ref();
    let asset_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidDocument(format!("not a file path: {}", path.display())))?;
    let bytes = fs::read(path)?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let dom = parse_html_bytes(&bytes);
    let selectors = options.selectors.compile()?;

    let identifier = options
        .identifier
        .clone()
        .unwrap_or_else(|| format!("urn:uuid:{}", uuid_v4()));

    let title = match options.title.clone().or_else(|| {
        extract_title(&dom, &selectors).filter(|title| !title.is_empty())
    }) {
        Some(title) => title,
        None => {
            warn!("document title not found ({asset_name})");
            "Untitled".to_string()
        }
    };

    let mut package = Package::new(identifier.clone());
    package.metadata.title = title;
    if let Some(language) = &options.language {
        package.metadata.language = language.clone();
    }
    package.metadata.subject = options.subject.clone();
    package.metadata.description = options.description.clone();
    package.metadata.relation = options.relation.clone();
    package.metadata.creator = options.creator.clone();
    package.metadata.publisher = options.publisher.clone();
    package.metadata.date = options.date.clone();
    package.metadata.rights = options.rights.clone();

    let mut resources = Vec::new();
    package.add_item(asset_name, None)?;
    resources.push((asset_name.to_string(), bytes));

    for href in discover_assets(&dom, asset_name) {
        // Only relative references can be packaged
        if href.contains("://") || href.starts_with("data:") {
            debug!("leaving external reference alone: {href}");
            continue;
        }
        let decoded = percent_decode_str(&href).decode_utf8_lossy();
        let data = match fs::read(base_dir.join(&*decoded)) {
            Ok(data) => data,
            Err(err) => {
                warn!("skipping missing asset {href}: {err}");
                continue;
            }
        };
        match package.add_item(&href, None) {
            Ok(_) => resources.push((href, data)),
            Err(Error::UnsupportedMediaType(_)) => {
                warn!("skipping asset with unrecognized type: {href}");
            }
            Err(err) => return Err(err),
        }
    }

    let mut navigation = Navigation::new(identifier);
    navigation.title = package.metadata.title.clone();
    navigation.add_toc_nodes(&extract_toc(&dom, &selectors, asset_name));

    Ok(Epub {
        package,
        navigation,
        resources,
    })
}

/// Hrefs of stylesheets and images the document references, in document
/// order, deduplicated. The main document's own name is excluded so a
/// self-referencing page cannot shadow it.
fn discover_assets(dom: &Dom, asset_name: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(asset_name.to_string());

    let mut hrefs = Vec::new();
    for id in dom.descendants(dom.document()) {
        let Some(name) = dom.element_name(id) else {
            continue;
        };
        let href = match &**name {
            "link" => {
                let rel = dom.get_attr(id, "rel").unwrap_or("");
                if rel.eq_ignore_ascii_case("stylesheet") {
                    dom.get_attr(id, "href")
                } else {
                    None
                }
            }
            "img" => dom.get_attr(id, "src"),
            _ => None,
        };
        if let Some(href) = href
            && !href.is_empty()
            && seen.insert(href.to_string())
        {
            hrefs.push(href.to_string());
        }
    }
    hrefs
}
