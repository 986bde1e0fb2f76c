//! DSON CLI - Command-line tool for DSON documents
//!
//! This binary provides command-line interfaces for:
//! - encode: JSON field tree → DSON document
//! - decode: DSON document → JSON field tree with inferred types
//! - inspect: header summary and per-field layout
//! - hash: name hashes as stored in meta2 entries

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dson_codec::{
    infer_data_type, DecodeOptions, DecodedDocument, DocumentEncoder, DocumentReader,
    EncodeOptions, FieldNode, FieldNodeSpec, Limits,
};
use dson_format::{hash_string, name_hash};
use serde::Serialize;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dson")]
#[command(about = "Encoder and inspector for DSON binary documents")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON field tree into a DSON document
    ///
    /// The input is a JSON array of fields; the first must be
    /// `__revision_dont_touch`:
    ///   [{"key": "__revision_dont_touch", "type": "int", "value": 0},
    ///    {"key": "base_root", "type": "object", "fields": [...]}]
    Encode {
        /// Input file (JSON field tree)
        input: PathBuf,
        /// Output file (DSON document)
        #[arg(short, long)]
        output: PathBuf,
        /// Encode values in parallel once a document has this many fields
        #[arg(long, default_value = "4096")]
        parallel_threshold: usize,
        /// Maximum number of fields
        #[arg(long)]
        max_fields: Option<usize>,
    },
    /// Decode a DSON document into a JSON field tree
    ///
    /// Data types are not stored on disk and are inferred from payload
    /// shapes, so the output may need type corrections before re-encoding.
    Decode {
        /// Input file (DSON document)
        input: PathBuf,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
        /// Skip name hash verification
        #[arg(long)]
        no_verify: bool,
    },
    /// Show the header and field layout of a DSON document
    ///
    /// Examples:
    ///   dson inspect persist.roster.json
    ///   dson inspect persist.roster.json --format json
    Inspect {
        /// Input file (DSON document)
        input: PathBuf,
        /// Output format (table, json)
        #[arg(long, value_enum, default_value_t = InspectFormat::Table)]
        format: InspectFormat,
        /// Skip name hash verification
        #[arg(long)]
        no_verify: bool,
    },
    /// Print the hashes of field names
    Hash {
        /// Names to hash
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum InspectFormat {
    Table,
    Json,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Encode {
            input,
            output,
            parallel_threshold,
            max_fields,
        } => {
            handle_encode(&input, &output, parallel_threshold, max_fields)?;
        }
        Commands::Decode {
            input,
            output,
            pretty,
            no_verify,
        } => {
            handle_decode(&input, output.as_deref(), pretty, !no_verify)?;
        }
        Commands::Inspect {
            input,
            format,
            no_verify,
        } => {
            handle_inspect(&input, format, !no_verify)?;
        }
        Commands::Hash { names } => {
            handle_hash(&names)?;
        }
    }

    Ok(())
}

fn handle_encode(
    input: &Path,
    output: &Path,
    parallel_threshold: usize,
    max_fields: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let json = fs::read_to_string(input)?;
    let roots = FieldNode::parse_json(&json)?;
    debug!(roots = roots.len(), input = %input.display(), "parsed field tree");

    let mut limits = Limits::default();
    if let Some(max_fields) = max_fields {
        limits.max_fields = max_fields;
    }
    let encoder = DocumentEncoder::new(EncodeOptions {
        parallel_threshold,
        limits,
    });
    let doc = encoder.encode_tree(&roots)?;

    let writer = BufWriter::new(File::create(output)?);
    doc.write_to(writer)?;

    info!(output = %output.display(), "wrote document");
    println!(
        "Encoded {} fields ({} objects) into {} bytes",
        doc.header.num_meta2_entries,
        doc.header.num_meta1_entries,
        doc.header.document_length()
    );
    Ok(())
}

fn read_document(input: &Path, verify_name_hashes: bool) -> Result<DecodedDocument, Box<dyn Error>> {
    let bytes = fs::read(input)?;
    let reader = DocumentReader::new(DecodeOptions {
        verify_name_hashes,
        ..DecodeOptions::default()
    });
    Ok(reader.read(&bytes)?)
}

fn handle_decode(
    input: &Path,
    output: Option<&Path>,
    pretty: bool,
    verify_name_hashes: bool,
) -> Result<(), Box<dyn Error>> {
    let doc = read_document(input, verify_name_hashes)?;
    let specs: Vec<FieldNodeSpec> = doc
        .to_tree(infer_data_type)?
        .iter()
        .map(FieldNode::to_spec)
        .collect();

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &specs)?;
    } else {
        serde_json::to_writer(&mut writer, &specs)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct FieldReport {
    index: usize,
    name: String,
    #[serde(rename = "type")]
    type_name: &'static str,
    offset: u32,
    payload_len: usize,
    is_object: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direct_children: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    all_children: Option<usize>,
}

fn field_reports(doc: &DecodedDocument) -> Vec<FieldReport> {
    doc.fields
        .iter()
        .enumerate()
        .map(|(index, field)| FieldReport {
            index,
            name: field.name.clone(),
            type_name: infer_data_type(field).name(),
            offset: field.meta2.offset,
            payload_len: field.payload.len(),
            is_object: field.is_object(),
            parent: field.meta1.map(|m| m.parent_index),
            direct_children: field.meta1.map(|_| field.num_direct_children()),
            all_children: field.meta1.map(|_| field.num_all_children()),
        })
        .collect()
}

fn handle_inspect(
    input: &Path,
    format: InspectFormat,
    verify_name_hashes: bool,
) -> Result<(), Box<dyn Error>> {
    let doc = read_document(input, verify_name_hashes)?;
    let reports = field_reports(&doc);

    match format {
        InspectFormat::Table => print_inspect_table(&doc, &reports),
        InspectFormat::Json => {
            let root = serde_json::json!({
                "revision": doc.revision(),
                "document_length": doc.header.document_length(),
                "num_objects": doc.header.num_meta1_entries,
                "num_fields": doc.header.num_meta2_entries,
                "data_offset": doc.header.data_offset,
                "data_length": doc.header.data_length,
                "fields": reports,
            });
            println!("{}", serde_json::to_string_pretty(&root)?);
        }
    }
    Ok(())
}

fn print_inspect_table(doc: &DecodedDocument, reports: &[FieldReport]) {
    let header = &doc.header;
    println!("Revision: {}", doc.revision());
    println!(
        "Document length: {} bytes (meta1 @ {}, meta2 @ {}, data @ {})",
        header.document_length(),
        header.meta1_offset,
        header.meta2_offset,
        header.data_offset
    );
    println!(
        "Fields: {} ({} objects)",
        header.num_meta2_entries, header.num_meta1_entries
    );
    println!();
    println!(
        "{:>5}  {:<32} {:<14} {:>8} {:>8}  children",
        "index", "name", "type", "offset", "len"
    );
    for report in reports {
        let children = match (report.direct_children, report.all_children) {
            (Some(direct), Some(all)) => format!("{}/{}", direct, all),
            _ => String::new(),
        };
        println!(
            "{:>5}  {:<32} {:<14} {:>8} {:>8}  {}",
            report.index,
            report.name,
            report.type_name,
            report.offset,
            report.payload_len,
            children
        );
    }
}

fn handle_hash(names: &[String]) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for name in names {
        writeln!(
            out,
            "{}\tname_hash={}\thash={}",
            name,
            name_hash(name),
            hash_string(name)
        )?;
    }
    Ok(())
}
