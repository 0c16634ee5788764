//! Text and JSON rendering of store values.

use colored::Colorize;
use serde_json::{json, Value};

use docvault_ledger::{HistoryReport, RevisionEntry};
use docvault_store::{ContentDiff, DiffLine, Document, Variant};
use docvault_types::Timestamp;

pub fn timestamp(at: &Timestamp) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn document_json<V: Variant>(doc: &Document<V>) -> Value {
    json!({
        "id": doc.id.to_string(),
        "kind": doc.kind().as_str(),
        "name": doc.name,
        "description": doc.description,
        "version": doc.version,
        "based_on": doc.based_on,
        "owner": doc.owner.as_str(),
        "state": doc.state().to_string(),
        "created_at": doc.created_at.to_rfc3339(),
        "updated_at": doc.updated_at.to_rfc3339(),
        "deleted_at": doc.deleted_at.map(|at| at.to_rfc3339()),
        "digest": doc.digest().to_hex(),
        "size": doc.size(),
        "fields": serde_json::to_value(&doc.fields).unwrap_or(Value::Null),
    })
}

pub fn revision_json(entry: &RevisionEntry) -> Value {
    json!({
        "id": entry.id.to_string(),
        "document": entry.document.to_string(),
        "sequence": entry.sequence,
        "digest": entry.digest.to_hex(),
        "intact": entry.is_intact(),
        "size": entry.size(),
        "by_user": entry.by_user.as_str(),
        "snapshot_created_at": entry.snapshot_created_at.to_rfc3339(),
        "snapshot_updated_at": entry.snapshot_updated_at.to_rfc3339(),
        "recorded_at": entry.recorded_at.to_rfc3339(),
    })
}

pub fn report_json(report: &HistoryReport) -> Value {
    json!({
        "document": report.document.to_string(),
        "valid": report.is_valid(),
        "entries": report.entry_count,
        "sequences_unique": report.sequences_unique,
        "sequences_dense": report.sequences_dense,
        "digests_valid": report.digests_valid,
        "attributed": report.attributed,
        "violations": report
            .violations
            .iter()
            .map(|v| json!({
                "sequence": v.sequence,
                "kind": format!("{:?}", v.kind),
                "description": v.description,
            }))
            .collect::<Vec<_>>(),
    })
}

pub fn diff_json(diff: &ContentDiff) -> Value {
    json!({
        "additions": diff.additions(),
        "deletions": diff.deletions(),
        "old_lines": diff.old_lines,
        "new_lines": diff.new_lines,
        "unified": diff.to_unified(),
    })
}

/// One line per document for listings.
pub fn document_line<V: Variant>(doc: &Document<V>) -> String {
    let trashed = if doc.is_trashed() {
        format!(" {}", "(trashed)".red())
    } else {
        String::new()
    };
    format!(
        "{}  {}  v{}  {}  {}{}",
        doc.id.to_string().yellow(),
        doc.name.bold(),
        doc.version,
        doc.owner.as_str().cyan(),
        timestamp(&doc.updated_at).dimmed(),
        trashed
    )
}

pub fn print_document<V: Variant>(doc: &Document<V>) {
    println!("{} {}", doc.kind().as_str().bold(), doc.id.to_string().yellow());
    println!("  Name:     {}", doc.name.bold());
    if !doc.description.is_empty() {
        println!("  About:    {}", doc.description);
    }
    let based = doc
        .based_on
        .map(|seq| format!(" (restored from #{seq})"))
        .unwrap_or_default();
    println!("  Version:  {}{}", doc.version, based.dimmed());
    println!("  Owner:    {}", doc.owner.as_str().cyan());
    println!("  Created:  {}", timestamp(&doc.created_at));
    println!("  Updated:  {}", timestamp(&doc.updated_at));
    if let Some(at) = &doc.deleted_at {
        println!("  Trashed:  {}", timestamp(at).red());
    }
    println!("  Content:  {} bytes, {}", doc.size(), doc.digest().short_hex().dimmed());
}

pub fn revision_line(entry: &RevisionEntry) -> String {
    let integrity = if entry.is_intact() {
        "✓".green()
    } else {
        "✗ digest mismatch".red().bold()
    };
    format!(
        "{}  {}  {} bytes  {}  {}",
        format!("#{}", entry.sequence).yellow().bold(),
        timestamp(&entry.snapshot_updated_at),
        entry.size(),
        entry.by_user.as_str().cyan(),
        integrity
    )
}

pub fn print_diff(diff: &ContentDiff) {
    if diff.is_empty() {
        println!("No differences.");
        return;
    }
    for hunk in &diff.hunks {
        println!(
            "{}",
            format!(
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            )
            .cyan()
        );
        for line in &hunk.lines {
            match line {
                DiffLine::Context(_) => println!("{line}"),
                DiffLine::Added(_) => println!("{}", line.to_string().green()),
                DiffLine::Removed(_) => println!("{}", line.to_string().red()),
            }
        }
    }
    println!(
        "{} additions, {} deletions",
        diff.additions().to_string().green(),
        diff.deletions().to_string().red()
    );
}

pub fn print_report(report: &HistoryReport) {
    let mark = |ok: bool| if ok { "✓".green() } else { "✗".red() };
    if report.is_valid() {
        println!("{} History of {} verified", "✓".green().bold(), report.document.to_string().yellow());
    } else {
        println!("{} History of {} has problems", "✗".red().bold(), report.document.to_string().yellow());
    }
    println!("  Entries:    {}", report.entry_count);
    println!("  Unique:     {}", mark(report.sequences_unique));
    println!("  Dense:      {}", mark(report.sequences_dense));
    println!("  Digests:    {}", mark(report.digests_valid));
    println!("  Attributed: {}", mark(report.attributed));
    for violation in &report.violations {
        println!("  {} #{}: {}", "-".red(), violation.sequence, violation.description);
    }
}
