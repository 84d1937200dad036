//! # webpub
//!
//! A small library for turning a fetched HTML page into an EPUB ebook.
//!
//! ## Features
//!
//! - Selector-driven table of contents extraction from arbitrary markup
//! - EPUB 2 package (OPF) and navigation (NCX) generation
//! - Packages the document together with its local stylesheets and images
//!
//! ## Quick Start
//!
//! ```no_run
//! use webpub::{ConvertOptions, convert_file, write_epub};
//!
//! let epub = convert_file("page.html", &ConvertOptions::default()).unwrap();
//! write_epub(&epub, "page.epub").unwrap();
//! ```
//!
//! ## Tuning extraction
//!
//! Pages mark up their tables of contents inconsistently, so the four
//! extraction roles are plain CSS selectors you can override per site:
//!
//! ```no_run
//! use webpub::{ConvertOptions, convert_file};
//!
//! let mut options = ConvertOptions::default();
//! options.selectors.toc_root = "#contents".to_string();
//! options.selectors.toc_item = "a".to_string();
//!
//! let epub = convert_file("page.html", &options).unwrap();
//! ```

pub mod convert;
pub mod dom;
pub mod epub;
pub mod extract;
pub(crate) mod util;

mod error;

pub use convert::{ConvertOptions, convert_file};
pub use epub::{Epub, ManifestItem, Metadata, NavPoint, Navigation, Package, write_epub,
    write_epub_to_writer};
pub use error::{Error, Result};
pub use extract::{Selectors, TocNode, extract_title, extract_toc};
