use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context as _};
use colored::Colorize;
use serde_json::json;

use docvault_store::vault::CONFIG_FILE;
use docvault_store::{
    DocumentFilter, DocumentState, DocumentStore, DocumentUpdate, ModelFields, ModelPatch, ModelVariant, NewDocument,
    SchemaFields, StoreConfig, TagRef, Variant, Vault,
};
use docvault_types::{Actor, DocumentId, UserId};
use docvault_validate::{StructuralValidator, ValidationError, XsdValidator};

use crate::cli::*;
use crate::output;

/// Per-invocation settings shared by every command.
struct Context {
    actor: Actor,
    format: OutputFormat,
}

impl Context {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let name = cli.user_name.clone().unwrap_or_else(|| cli.user.clone());
    let ctx = Context {
        actor: Actor::new(cli.user.clone(), name),
        format: cli.format,
    };
    let config = load_config(&cli.root, cli.config.as_deref())?;

    match cli.command {
        Command::Validate(args) => cmd_validate(&args, &config, &ctx),
        Command::Schema { action } => {
            let vault = open_vault(&cli.root, config)?;
            run_schema(&vault, action, &ctx)
        }
        Command::Model { action } => {
            let vault = open_vault(&cli.root, config)?;
            run_model(&vault, action, &ctx)
        }
    }
}

fn load_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<StoreConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = root.join(CONFIG_FILE);
            if !default.exists() {
                return Ok(StoreConfig::default());
            }
            default
        }
    };
    StoreConfig::load(&path).with_context(|| format!("loading configuration from {}", path.display()))
}

fn open_vault(root: &Path, config: StoreConfig) -> anyhow::Result<Vault> {
    Vault::open(root, config).with_context(|| format!("opening vault at {}", root.display()))
}

fn read_content(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn run_schema(vault: &Vault, action: SchemaAction, ctx: &Context) -> anyhow::Result<()> {
    let store = vault.schemas();
    match action {
        SchemaAction::Add(args) => {
            let new = NewDocument::new(args.name, read_content(&args.file)?, SchemaFields {})
                .with_description(args.description);
            let doc = store.create(new, &ctx.actor)?;
            emit(&doc, "Added", ctx)
        }
        SchemaAction::Update(args) => {
            let (id, update) = common_update(args)?;
            let doc = store.update(&id, update, &ctx.actor)?;
            emit(&doc, "Updated", ctx)
        }
        SchemaAction::Delete(args) => emit(&store.soft_delete(&args.id, &ctx.actor)?, "Trashed", ctx),
        SchemaAction::Undelete(args) => emit(&store.restore_from_trash(&args.id, &ctx.actor)?, "Restored", ctx),
        SchemaAction::List(args) => cmd_list(store, &args, ctx),
        SchemaAction::Show(args) => cmd_show(store, &args, ctx),
        SchemaAction::History(args) => cmd_history(store, &args.id, ctx),
        SchemaAction::Restore(args) => cmd_restore(store, &args, ctx),
        SchemaAction::Diff(args) => cmd_diff(store, &args, ctx),
        SchemaAction::Verify(args) => cmd_verify(store, &args.id, ctx),
    }
}

fn run_model(vault: &Vault, action: ModelAction, ctx: &Context) -> anyhow::Result<()> {
    let store = vault.models();
    match action {
        ModelAction::Add(args) => {
            let fields = ModelFields::new(args.schema).with_tags(args.tags.into_iter().map(TagRef::new));
            let new = NewDocument::new(args.common.name, read_content(&args.common.file)?, fields)
                .with_description(args.common.description);
            let doc = store.create(new, &ctx.actor)?;
            emit(&doc, "Added", ctx)
        }
        ModelAction::Update(args) => {
            let tags = if args.clear_tags {
                Some(BTreeSet::new())
            } else if args.tags.is_empty() {
                None
            } else {
                Some(args.tags.into_iter().map(TagRef::new).collect())
            };
            let patch = ModelPatch {
                schema_ref: args.schema,
                tags,
            };
            let (id, update) = common_update::<ModelVariant>(args.common)?;
            let doc = store.update(&id, update.with_patch(patch), &ctx.actor)?;
            emit(&doc, "Updated", ctx)
        }
        ModelAction::Delete(args) => emit(&store.soft_delete(&args.id, &ctx.actor)?, "Trashed", ctx),
        ModelAction::Undelete(args) => emit(&store.restore_from_trash(&args.id, &ctx.actor)?, "Restored", ctx),
        ModelAction::Favorite(args) => {
            let doc = store.toggle_favorite(&args.id, &ctx.actor)?;
            let verb = if doc.fields.is_favorite() { "Favorited" } else { "Unfavorited" };
            emit(&doc, verb, ctx)
        }
        ModelAction::List(args) => cmd_list(store, &args, ctx),
        ModelAction::Trash(args) => {
            let list = ListArgs {
                owner: args,
                trashed: true,
                all: false,
            };
            cmd_list(store, &list, ctx)
        }
        ModelAction::Show(args) => cmd_show(store, &args, ctx),
        ModelAction::History(args) => cmd_history(store, &args.id, ctx),
        ModelAction::Restore(args) => cmd_restore(store, &args, ctx),
        ModelAction::Diff(args) => cmd_diff(store, &args, ctx),
        ModelAction::Verify(args) => cmd_verify(store, &args.id, ctx),
    }
}

fn common_update<V: Variant>(args: UpdateArgs) -> anyhow::Result<(DocumentId, DocumentUpdate<V>)> {
    let mut update = DocumentUpdate::new();
    update.name = args.name;
    update.description = args.description;
    if let Some(path) = &args.file {
        update.content = Some(read_content(path)?);
    }
    Ok((args.id, update))
}

fn emit<V: Variant>(doc: &docvault_store::Document<V>, verb: &str, ctx: &Context) -> anyhow::Result<()> {
    if ctx.json() {
        println!("{}", output::document_json(doc));
    } else {
        println!(
            "{} {} {} {} (v{})",
            "✓".green().bold(),
            verb,
            doc.kind().as_str(),
            doc.id.to_string().yellow(),
            doc.version
        );
    }
    Ok(())
}

fn cmd_list<V: Variant>(store: &DocumentStore<V>, args: &ListArgs, ctx: &Context) -> anyhow::Result<()> {
    let filter = DocumentFilter {
        owner: args.owner.owner.as_deref().map(UserId::new),
        state: match (args.all, args.trashed) {
            (true, _) => None,
            (false, true) => Some(DocumentState::Trashed),
            (false, false) => Some(DocumentState::Active),
        },
    };
    let docs = store.list(&filter)?;
    if ctx.json() {
        let items: Vec<_> = docs.iter().map(output::document_json).collect();
        println!("{}", serde_json::Value::Array(items));
    } else if docs.is_empty() {
        println!("No {}s.", V::KIND.as_str());
    } else {
        for doc in &docs {
            println!("{}", output::document_line(doc));
        }
    }
    Ok(())
}

fn cmd_show<V: Variant>(store: &DocumentStore<V>, args: &ShowArgs, ctx: &Context) -> anyhow::Result<()> {
    if let Some(sequence) = args.revision {
        let entry = store.get_revision(&args.id, sequence)?;
        if args.content {
            return write_raw(&entry.content);
        }
        if ctx.json() {
            println!("{}", output::revision_json(&entry));
        } else {
            println!("{}", output::revision_line(&entry));
        }
        return Ok(());
    }

    let doc = store.get(&args.id)?;
    if args.content {
        write_raw(&doc.content)
    } else if ctx.json() {
        println!("{}", output::document_json(&doc));
        Ok(())
    } else {
        output::print_document(&doc);
        Ok(())
    }
}

fn write_raw(bytes: &[u8]) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}

fn cmd_history<V: Variant>(store: &DocumentStore<V>, id: &DocumentId, ctx: &Context) -> anyhow::Result<()> {
    let entries = store.list_revisions(id)?;
    if ctx.json() {
        let items: Vec<_> = entries.iter().map(output::revision_json).collect();
        println!("{}", serde_json::Value::Array(items));
    } else if entries.is_empty() {
        println!("No history for {}.", id.to_string().yellow());
    } else {
        for entry in &entries {
            println!("{}", output::revision_line(entry));
        }
    }
    Ok(())
}

fn cmd_restore<V: Variant>(store: &DocumentStore<V>, args: &RestoreArgs, ctx: &Context) -> anyhow::Result<()> {
    let doc = store.restore_to_version(&args.id, args.sequence, &ctx.actor)?;
    emit(&doc, &format!("Restored #{} of", args.sequence), ctx)
}

fn cmd_diff<V: Variant>(store: &DocumentStore<V>, args: &DiffArgs, ctx: &Context) -> anyhow::Result<()> {
    let diff = store.diff(&args.id, args.from, args.to)?;
    if ctx.json() {
        let mut value = output::diff_json(&diff);
        value["from"] = json!(args.from.to_string());
        value["to"] = json!(args.to.to_string());
        println!("{value}");
    } else {
        println!("{} {} → {}", "diff".bold(), args.from, args.to);
        output::print_diff(&diff);
    }
    Ok(())
}

fn cmd_verify<V: Variant>(store: &DocumentStore<V>, id: &DocumentId, ctx: &Context) -> anyhow::Result<()> {
    let report = store.verify_history(id)?;
    if ctx.json() {
        println!("{}", output::report_json(&report));
    } else {
        output::print_report(&report);
    }
    if !report.is_valid() {
        bail!("history of {id} failed verification");
    }
    Ok(())
}

fn cmd_validate(args: &ValidateArgs, config: &StoreConfig, ctx: &Context) -> anyhow::Result<()> {
    let schema = read_content(&args.schema)?;
    let document = read_content(&args.document)?;
    let validator = XsdValidator::new(config.validation.clone());

    match validator.validate(&schema, &document) {
        Ok(()) => {
            if ctx.json() {
                println!("{}", json!({ "valid": true, "violations": [] }));
            } else {
                println!("{} {} is valid", "✓".green().bold(), args.document.display());
            }
            Ok(())
        }
        Err(ValidationError::StructuralViolation(diagnostic)) => {
            if ctx.json() {
                let violations: Vec<_> = diagnostic
                    .violations()
                    .iter()
                    .map(|v| {
                        json!({
                            "severity": v.severity.to_string(),
                            "line": v.line,
                            "column": v.column,
                            "message": v.message,
                        })
                    })
                    .collect();
                println!("{}", json!({ "valid": false, "violations": violations }));
            } else {
                for violation in diagnostic.violations() {
                    println!("{} {violation}", "✗".red());
                }
            }
            bail!("{} is not valid ({} violations)", args.document.display(), diagnostic.len())
        }
        Err(ValidationError::InvalidReferenceDefinition(message)) => {
            bail!("{} is not a usable schema: {message}", args.schema.display())
        }
    }
}
