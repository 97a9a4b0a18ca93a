use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use odfkit_editor::{OdtDocument, Session, Signal, SignalKind};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::info;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// ODF document (flat XML) to start from
    pub document: PathBuf,

    /// JSON array of operation specs
    pub operations: PathBuf,

    /// Write the resulting document here
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Optypes of the operations that took effect, in order.
type Applied = Rc<RefCell<Vec<String>>>;

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let source = fs::read_to_string(&args.document)
        .with_context(|| format!("Cannot read document {}", args.document.display()))?;
    let specs = read_specs(&args.operations, config.default_member.as_deref())?;

    let document = OdtDocument::from_xml(&source, config.editor.clone())?;
    let mut session = Session::new(document);
    let applied = track_applied(&session);

    println!(
        "{} {} operations on {}",
        "▶".bright_blue().bold(),
        specs.len(),
        args.document.display()
    );
    let result = session.enqueue_specs(&specs);
    print_summary(&applied.borrow(), specs.len());
    result?;

    let document = session.document();
    info!(steps = document.step_count(), "Replay finished");
    println!("Last step: {}", document.step_count());

    if let Some(output) = &args.output {
        fs::write(output, document.to_xml()).with_context(|| format!("Cannot write {}", output.display()))?;
        println!("  {} {}", "✓".green(), output.display());
    }
    Ok(())
}

/// Reads the operation log, filling in `default_member` where an
/// operation carries no member id.
fn read_specs(path: &Path, default_member: Option<&str>) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path).with_context(|| format!("Cannot read operations {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)?;
    let Value::Array(mut specs) = value else {
        return Err(anyhow!("{} must contain a JSON array of operations", path.display()));
    };
    if let Some(member) = default_member {
        for spec in specs.iter_mut().filter_map(Value::as_object_mut) {
            spec.entry("memberid").or_insert_with(|| Value::String(member.to_string()));
        }
    }
    Ok(specs)
}

fn track_applied(session: &Session) -> Applied {
    let applied: Applied = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&applied);
    session.document().subscribe(SignalKind::OperationEnd, move |signal| {
        if let Signal::OperationEnd { optype, .. } = signal {
            sink.borrow_mut().push(optype.clone());
        }
    });
    applied
}

fn print_summary(applied: &[String], total: usize) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for optype in applied {
        *counts.entry(optype.as_str()).or_default() += 1;
    }
    for (optype, count) in &counts {
        println!("  {:<24} {}", optype, count);
    }

    println!();
    if applied.len() == total {
        println!("{} Applied {} operations", "✅".green(), applied.len());
    } else {
        println!(
            "{} Applied {} of {} operations",
            "⚠️".yellow(),
            applied.len(),
            total
        );
    }
}
