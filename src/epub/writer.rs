//! EPUB container assembly.

use std::io::{Seek, Write};
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Result;

use super::{Navigation, Package};

/// A fully assembled conversion, ready to be written out.
#[derive(Debug)]
pub struct Epub {
    pub package: Package,
    pub navigation: Navigation,
    /// Resource bytes keyed by manifest href, in manifest order.
    pub resources: Vec<(String, Vec<u8>)>,
}

/// Write an [`Epub`] to a file on disk.
pub fn write_epub<P: AsRef<Path>>(epub: &Epub, path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_epub_to_writer(epub, file)
}

/// Write an [`Epub`] to any [`Write`] + [`Seek`] destination.
///
/// Useful for writing to memory buffers or network streams.
pub fn write_epub_to_writer<W: Write + Seek>(epub: &Epub, writer: W) -> Result<()> {
    let mut zip = ZipWriter::new(writer);

    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    // mimetype must be first and uncompressed
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file("OEBPS/content.opf", options_deflate)?;
    zip.write_all(epub.package.to_xml().as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", options_deflate)?;
    zip.write_all(epub.navigation.to_xml().as_bytes())?;

    for (href, data) in &epub.resources {
        zip.start_file(format!("OEBPS/{href}"), options_deflate)?;
        zip.write_all(data)?;
    }

    zip.finish()?;
    Ok(())
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
