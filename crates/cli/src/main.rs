mod document;

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use ferry_engine::{ImportSpecification, Importer, JsonLinesResource, ProviderRegistry, Record};
use futures_util::StreamExt;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::document::{ImportDocument, equals_filter, parse_value};

#[derive(Debug, Parser)]
#[command(name = "ferry", version, about = "Import records through provider pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the import described by a YAML or JSON document
    Run {
        /// Path to the import document
        document: PathBuf,
        /// Use the asynchronous pipeline
        #[arg(long = "async")]
        asynchronous: bool,
        /// Import exactly one record; prints `null` when there is none
        #[arg(long)]
        one: bool,
    },
    /// Print the records of a JSON-lines file
    Cat {
        file: PathBuf,
        /// Keep only records whose FIELD equals VALUE (VALUE is parsed as JSON when possible)
        #[arg(long = "where", value_name = "FIELD=VALUE", value_parser = parse_condition)]
        conditions: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();

    match cli.command {
        Command::Run {
            document,
            asynchronous,
            one,
        } => {
            let document = ImportDocument::load(&document)?;
            let one = one || document.one;
            if asynchronous {
                run_async(&document, one, &mut stdout).await
            } else {
                run_sync(&document, one, &mut stdout)
            }
        }
        Command::Cat { file, conditions } => cat(file, conditions, &mut stdout),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn parse_condition(raw: &str) -> Result<(String, String)> {
    let (field, value) = raw.split_once('=').ok_or_else(|| anyhow!("expected FIELD=VALUE, got '{raw}'"))?;
    if field.is_empty() {
        anyhow::bail!("condition '{raw}' has an empty field name");
    }
    Ok((field.to_string(), value.to_string()))
}

fn run_sync(document: &ImportDocument, one: bool, out: &mut impl Write) -> Result<()> {
    let importer = document.importer()?;
    let specification = document.import_specification()?;
    if one {
        let record = importer.import_one(&specification).context("Import failed")?;
        return print_one(record, out);
    }

    let mut written = 0usize;
    for record in importer.import(&specification).context("Import failed")? {
        print_record(record.context("Import failed")?, out)?;
        written += 1;
    }
    info!(records = written, "import finished");
    Ok(())
}

async fn run_async(document: &ImportDocument, one: bool, out: &mut impl Write) -> Result<()> {
    let importer = document.importer()?;
    let specification = document.async_import_specification()?;
    if one {
        let record = importer.import_one_async(&specification).await.context("Import failed")?;
        return print_one(record, out);
    }

    let mut records = importer.import_async(&specification).await.context("Import failed")?;
    let mut written = 0usize;
    while let Some(record) = records.next().await {
        print_record(record.context("Import failed")?, out)?;
        written += 1;
    }
    info!(records = written, "import finished");
    Ok(())
}

fn cat(file: PathBuf, conditions: Vec<(String, String)>, out: &mut impl Write) -> Result<()> {
    let importer = Importer::new(ProviderRegistry::new());
    let mut specification = ImportSpecification::new(JsonLinesResource::new(file.to_string_lossy()));
    for (field, value) in conditions {
        specification.add_transformer(equals_filter(field, parse_value(&value)))?;
    }

    for record in importer.import(&specification).with_context(|| format!("Failed to read {}", file.display()))? {
        print_record(record?, out)?;
    }
    Ok(())
}

fn print_record(record: Record, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer(&mut *out, &Value::Object(record))?;
    writeln!(out)?;
    Ok(())
}

fn print_one(record: Option<Record>, out: &mut impl Write) -> Result<()> {
    match record {
        Some(record) => print_record(record, out),
        None => {
            writeln!(out, "null")?;
            Ok(())
        }
    }
}
