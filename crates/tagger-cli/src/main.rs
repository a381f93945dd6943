//! Tagger CLI - Command-line interface
//!
//! Usage:
//!   tagger tag <file> --vocab <file>... [--keywords <file>...] [--markup]
//!   tagger tokens <file> [--html]
//!   tagger check-config
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tagger_core::{
    LexicalResources, LinkedDataStore, LoggingConfig, TagOptions, TaggerConfig,
    UnmatchedSink, VocabularyId, VocabularySelection,
};
use tagger_extractor::{FileUnmatchedSink, Tagger, VocabularyRegistry};
use tagger_linked::{store_from_config, MemoryLinkedDataStore, PgLinkedDataStore};
use tagger_text::decode_document;

#[derive(Parser)]
#[command(name = "tagger")]
#[command(about = "Vocabulary-driven entity and keyword tagger")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag a document and print the result as JSON
    Tag(TagArgs),
    /// Print the rated token stream of a document as JSON
    Tokens {
        /// Document to read, `-` for stdin
        input: PathBuf,

        /// Treat the document as HTML
        #[arg(long)]
        html: bool,
    },
    /// Load and validate the configuration and word lists
    CheckConfig,
}

#[derive(clap::Args)]
struct TagArgs {
    /// Document to read, `-` for stdin
    input: PathBuf,

    /// Entity vocabulary file (JSON or TOML)
    #[arg(long = "vocab", value_name = "FILE")]
    vocabularies: Vec<PathBuf>,

    /// Keyword vocabulary file (JSON or TOML)
    #[arg(long = "keywords", value_name = "FILE")]
    keywords: Vec<PathBuf>,

    /// Treat the document as HTML
    #[arg(long)]
    html: bool,

    /// Include the document with markers around matched tokens
    #[arg(long)]
    markup: bool,

    /// Render newlines as `<br />` in the marked-up text
    #[arg(long)]
    newlines: bool,

    /// Resolve tags competing for the same span
    #[arg(long)]
    disambiguate: bool,

    /// Attach linked-data URIs
    #[arg(long)]
    uris: bool,

    /// Include capitalized runs no vocabulary matched
    #[arg(long)]
    unmatched: bool,

    /// Linked-data JSON file used instead of the configured database
    #[arg(long, value_name = "FILE")]
    linked_data: Option<PathBuf>,

    /// Append unmatched candidates to this file
    #[arg(long, value_name = "FILE")]
    unmatched_log: Option<PathBuf>,
}

impl TagArgs {
    fn options(&self) -> TagOptions {
        TagOptions {
            disambiguate: self.disambiguate,
            return_uris: self.uris,
            return_unmatched: self.unmatched,
            structure_aware: self.html,
            normalize_newlines: self.newlines,
            return_marked_text: self.markup,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Tag(args) => tag(config, &args),
        Commands::Tokens { input, html } => tokens(config, &input, html),
        Commands::CheckConfig => check_config(config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TaggerConfig> {
    let config = match path {
        Some(path) => TaggerConfig::from_file(path)?.with_env_override()?,
        None => TaggerConfig::from_env()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Load every vocabulary file once, returning entity and keyword selections
fn load_vocabularies(args: &TagArgs) -> anyhow::Result<(VocabularyRegistry, VocabularySelection)> {
    let mut registry = VocabularyRegistry::new();
    let mut loaded: HashMap<PathBuf, VocabularyId> = HashMap::new();
    let mut load = |path: &PathBuf| -> anyhow::Result<VocabularyId> {
        if let Some(id) = loaded.get(path) {
            return Ok(id.clone());
        }
        let id = registry
            .load_file(path)
            .with_context(|| format!("Failed to load vocabulary {}", path.display()))?;
        loaded.insert(path.clone(), id.clone());
        Ok(id)
    };

    let mut selection = VocabularySelection::default();
    for path in &args.vocabularies {
        selection.ner.push(load(path)?);
    }
    for path in &args.keywords {
        selection.keywords.push(load(path)?);
    }
    Ok((registry, selection))
}

fn tag(config: TaggerConfig, args: &TagArgs) -> anyhow::Result<()> {
    let lexicon = Arc::new(LexicalResources::from_config(&config.lexicon)?);
    let (registry, selection) = load_vocabularies(args)?;

    let store = match &args.linked_data {
        Some(path) => {
            let store: Arc<dyn LinkedDataStore> =
                Arc::new(MemoryLinkedDataStore::from_json_file(path)?);
            Some(store)
        }
        None if args.uris => store_from_config(&config.linked_data)?,
        None => None,
    };

    let mut tagger = Tagger::new(config, lexicon, Arc::new(registry))?;
    if let Some(store) = store {
        tagger = tagger.with_linked_data(store);
    }
    if let Some(path) = &args.unmatched_log {
        let sink: Arc<dyn UnmatchedSink> = Arc::new(FileUnmatchedSink::new(path));
        tagger = tagger.with_unmatched_sink(Some(sink));
    }

    let input = read_input(&args.input)?;
    let result = tagger.tag_bytes(&input, &selection, &args.options())?;
    tracing::info!(tags = result.tags.len(), "Tagged {}", args.input.display());

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn tokens(config: TaggerConfig, input: &Path, html: bool) -> anyhow::Result<()> {
    let lexicon = Arc::new(LexicalResources::from_config(&config.lexicon)?);
    let tagger = Tagger::new(config, lexicon, Arc::new(VocabularyRegistry::new()))?;

    let bytes = read_input(input)?;
    let document = tagger.tokenize(&decode_document(&bytes), html);
    println!("{}", serde_json::to_string_pretty(document.tokens())?);
    Ok(())
}

fn check_config(config: TaggerConfig) -> anyhow::Result<()> {
    LexicalResources::from_config(&config.lexicon).context("Failed to load word lists")?;

    if config.linked_data.database_url.is_some() {
        PgLinkedDataStore::connect(&config.linked_data)
            .context("Failed to reach the linked-data database")?;
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    tracing::info!("Configuration is valid");
    Ok(())
}
