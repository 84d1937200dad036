//! webpub - HTML to EPUB converter

use std::process::ExitCode;

use clap::Parser;

use webpub::{ConvertOptions, convert_file, write_epub};

#[derive(Parser)]
#[command(name = "webpub")]
#[command(version, about = "HTML to EPUB converter", long_about = None)]
#[command(after_help = "EXAMPLES:
    webpub page.html                          Convert with default selectors
    webpub page.html book.epub                Pick the output name
    webpub --toc-root '#contents' page.html   Tune extraction per site")]
struct Cli {
    /// Input HTML file
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output EPUB file (derived from the document title by default)
    #[arg(value_name = "OUTPUT")]
    output: Option<String>,

    /// CSS selector for the document title
    #[arg(long, value_name = "SELECTOR")]
    title_selector: Option<String>,

    /// CSS selector for the table of contents container
    #[arg(long, value_name = "SELECTOR")]
    toc_root: Option<String>,

    /// CSS selector for one table of contents entry
    #[arg(long, value_name = "SELECTOR")]
    toc_item: Option<String>,

    /// CSS selector for a nested subsection list
    #[arg(long, value_name = "SELECTOR")]
    toc_section: Option<String>,

    /// Override the document title
    #[arg(long, value_name = "TITLE")]
    title: Option<String>,

    /// Package identifier (a urn:uuid is generated by default)
    #[arg(long, value_name = "ID")]
    identifier: Option<String>,

    /// Document language code
    #[arg(long, value_name = "LANG")]
    language: Option<String>,

    /// Author
    #[arg(long, value_name = "NAME")]
    creator: Option<String>,

    /// Publisher
    #[arg(long, value_name = "NAME")]
    publisher: Option<String>,

    /// Subject
    #[arg(long, value_name = "TEXT")]
    subject: Option<String>,

    /// Description
    #[arg(long, value_name = "TEXT")]
    description: Option<String>,

    /// Related resource, typically the source URL
    #[arg(long, value_name = "TEXT")]
    relation: Option<String>,

    /// Publication date
    #[arg(long, value_name = "DATE")]
    date: Option<String>,

    /// Rights statement
    #[arg(long, value_name = "TEXT")]
    rights: Option<String>,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.quiet { "error" } else { "warn" }),
    )
    .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> webpub::Result<()> {
    let mut options = ConvertOptions {
        identifier: cli.identifier.clone(),
        title: cli.title.clone(),
        language: cli.language.clone(),
        subject: cli.subject.clone(),
        description: cli.description.clone(),
        relation: cli.relation.clone(),
        creator: cli.creator.clone(),
        publisher: cli.publisher.clone(),
        date: cli.date.clone(),
        rights: cli.rights.clone(),
        ..ConvertOptions::default()
    };
    if let Some(title) = &cli.title_selector {
        options.selectors.title = title.clone();
    }
    if let Some(toc_root) = &cli.toc_root {
        options.selectors.toc_root = toc_root.clone();
    }
    if let Some(toc_item) = &cli.toc_item {
        options.selectors.toc_item = toc_item.clone();
    }
    if let Some(toc_section) = &cli.toc_section {
        options.selectors.toc_section = toc_section.clone();
    }

    let epub = convert_file(&cli.input, &options)?;
    let output = match &cli.output {
        Some(output) => output.clone(),
        None => default_output_name(&epub.package.metadata.title),
    };
    write_epub(&epub, &output)?;

    if !cli.quiet {
        println!("wrote {output}");
    }
    Ok(())
}

/// Derive an output filename from the document title.
fn default_output_name(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{stem}.epub")
}
