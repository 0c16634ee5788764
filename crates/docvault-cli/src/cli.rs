use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use docvault_store::RevisionSelector;
use docvault_types::DocumentId;

#[derive(Parser, Debug)]
#[command(
    name = "docvault",
    about = "Versioned schema and model documents with validated history",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the vault files
    #[arg(long, global = true, default_value = ".docvault")]
    pub root: PathBuf,

    /// Id of the acting user
    #[arg(long, global = true, default_value = "local")]
    pub user: String,

    /// Display name of the acting user (defaults to the id)
    #[arg(long, global = true)]
    pub user_name: Option<String>,

    /// Configuration file (defaults to <root>/docvault.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage schema documents
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// Manage model documents
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Validate an XML file against an XSD without storing anything
    Validate(ValidateArgs),
}

#[derive(Subcommand, Debug)]
pub enum SchemaAction {
    /// Store a new schema
    Add(AddArgs),
    /// Change a schema's metadata or content
    Update(UpdateArgs),
    /// Move a schema to the trash
    Delete(IdArgs),
    /// Take a schema out of the trash
    Undelete(IdArgs),
    /// List schemas
    List(ListArgs),
    /// Show one schema
    Show(ShowArgs),
    /// Show a schema's revision history
    History(IdArgs),
    /// Make a recorded revision current again
    Restore(RestoreArgs),
    /// Diff two revisions of a schema
    Diff(DiffArgs),
    /// Check a schema's history for integrity problems
    Verify(IdArgs),
}

#[derive(Subcommand, Debug)]
pub enum ModelAction {
    /// Store a new model, validated against its schema
    Add(ModelAddArgs),
    /// Change a model's metadata, schema, tags or content
    Update(ModelUpdateArgs),
    /// Move a model to the trash
    Delete(IdArgs),
    /// Take a model out of the trash
    Undelete(IdArgs),
    /// Flip a model's favorite flag
    Favorite(IdArgs),
    /// List models
    List(ListArgs),
    /// List trashed models
    Trash(OwnerArgs),
    /// Show one model
    Show(ShowArgs),
    /// Show a model's revision history
    History(IdArgs),
    /// Make a recorded revision current again
    Restore(RestoreArgs),
    /// Diff two revisions of a model
    Diff(DiffArgs),
    /// Check a model's history for integrity problems
    Verify(IdArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub name: String,
    /// File with the document content
    pub file: PathBuf,
    #[arg(short, long, default_value = "")]
    pub description: String,
}

#[derive(Args, Debug)]
pub struct ModelAddArgs {
    #[command(flatten)]
    pub common: AddArgs,
    /// Id of the schema the model must conform to
    #[arg(long)]
    pub schema: DocumentId,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: DocumentId,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    /// File with the new content
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ModelUpdateArgs {
    #[command(flatten)]
    pub common: UpdateArgs,
    /// Switch to another schema
    #[arg(long)]
    pub schema: Option<DocumentId>,
    /// Replace the tag set (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Remove all tags
    #[arg(long, conflicts_with = "tags")]
    pub clear_tags: bool,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: DocumentId,
}

#[derive(Args, Debug)]
pub struct OwnerArgs {
    /// Only documents owned by this user
    #[arg(long)]
    pub owner: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub owner: OwnerArgs,
    /// List trashed documents instead of active ones
    #[arg(long)]
    pub trashed: bool,
    /// List active and trashed documents
    #[arg(long, conflicts_with = "trashed")]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: DocumentId,
    /// Print the content instead of the metadata
    #[arg(long)]
    pub content: bool,
    /// Show a recorded revision instead of the current state
    #[arg(long)]
    pub revision: Option<u32>,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    pub id: DocumentId,
    /// History sequence to restore
    pub sequence: u32,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    pub id: DocumentId,
    /// `current` or a history sequence
    #[arg(value_parser = parse_selector)]
    pub from: RevisionSelector,
    /// `current` or a history sequence
    #[arg(value_parser = parse_selector, default_value = "current")]
    pub to: RevisionSelector,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// XSD file
    pub schema: PathBuf,
    /// XML file to check
    pub document: PathBuf,
}

fn parse_selector(value: &str) -> Result<RevisionSelector, String> {
    match value {
        "current" | "head" => Ok(RevisionSelector::Current),
        other => other
            .trim_start_matches('#')
            .parse::<u32>()
            .map(RevisionSelector::Sequence)
            .map_err(|_| format!("expected `current` or a sequence number, got `{other}`")),
    }
}
