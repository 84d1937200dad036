//! EPUB output: the package document (OPF), the navigation document
//! (NCX), and container assembly.

mod navigation;
mod package;
mod writer;

pub use navigation::{NavPoint, Navigation};
pub use package::{ManifestItem, Metadata, Package};
pub use writer::{Epub, write_epub, write_epub_to_writer};

pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
