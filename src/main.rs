//! Purpose: `strenum` CLI entry point; drains text elements through the binary enumerator interface.
//! Role: Binary crate root; parses args, builds a producer, exports it as an `IEnumString`
//! handle and consumes it back through the vtable.
//! Invariants: One JSON object per batch on stdout (or one item per line with `--lines`).
//! Invariants: Errors are emitted as JSON on stderr; exit code comes from `api::to_exit_code`.
//! Invariants: Logging goes to stderr and is filtered by `RUST_LOG` (default `warn`).
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueHint, error::ErrorKind as ClapErrorKind};
use serde::Serialize;
use serde_json::json;
use strenum::api::{
    Batches, DrainOptions, EnumObject, EnumString, Error, ErrorKind, ForeignEnum, Generated,
    Progress, Sequence, SequenceEnumerator, Snapshot, to_exit_code,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "strenum",
    version,
    about = "Enumerate text elements through a cloneable, batched enumerator",
    after_help = r#"EXAMPLES
  $ strenum a b c --batch 2
  $ strenum --file names.txt --skip 10 --limit 5
  $ seq 1 100 | strenum --clone-at 50 --lines

ENVIRONMENT
  STRENUM_BATCH   default batch size when --batch is not given (16)
  RUST_LOG        log filter for stderr diagnostics (default: warn)"#
)]
struct Cli {
    #[arg(help = "Elements to enumerate (default: read lines from --file or stdin)")]
    items: Vec<String>,
    #[arg(long, help = "Read one element per line from this file", value_hint = ValueHint::FilePath)]
    file: Option<PathBuf>,
    #[arg(long, help = "Read --file lazily instead of snapshotting it up front")]
    lazy: bool,
    #[arg(long, help = "Elements requested per Next call")]
    batch: Option<usize>,
    #[arg(long, help = "Skip this many elements before reading")]
    skip: Option<usize>,
    #[arg(long, help = "Stop after this many elements")]
    limit: Option<usize>,
    #[arg(
        long,
        help = "Clone the enumerator after this many elements and drain the clone afterwards"
    )]
    clone_at: Option<usize>,
    #[arg(long, help = "Print one element per line instead of JSON batches")]
    lines: bool,
}

#[derive(Serialize)]
struct BatchLine<'a> {
    enumerator: &'a str,
    batch: usize,
    status: &'static str,
    items: Vec<String>,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                return Ok(());
            }
            _ => {
                return Err(Error::new(ErrorKind::InvalidArgument)
                    .with_message(clap_error_summary(&err)));
            }
        },
    };

    let mut options = match cli.batch {
        Some(batch) => DrainOptions::new(batch)?,
        None => DrainOptions::from_env()?,
    };
    if let Some(limit) = cli.limit {
        options = options.with_limit(limit);
    }

    let sequence = build_sequence(&cli)?;
    let handle = EnumObject::from_enumerator(SequenceEnumerator::new(sequence));
    let mut original = unsafe { ForeignEnum::from_raw(handle)? };
    tracing::debug!(batch = options.batch(), "enumerator exported");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(count) = cli.skip {
        let progress = original.skip(count)?;
        if progress != Progress::Complete {
            tracing::info!(count, status = progress.as_str(), "skip ran past the end");
        }
    }

    let mut batch_index = 0;
    let Some(clone_at) = cli.clone_at else {
        return emit_all(
            &mut out,
            "original",
            &mut original,
            options,
            cli.lines,
            &mut batch_index,
        );
    };

    let head_limit = options.limit().map_or(clone_at, |limit| limit.min(clone_at));
    let head = options.with_limit(head_limit);
    emit_all(&mut out, "original", &mut original, head, cli.lines, &mut batch_index)?;
    let mut clone = original.clone_enum()?;
    let rest = remaining(options, head_limit);
    emit_all(&mut out, "original", &mut original, rest, cli.lines, &mut batch_index)?;
    let mut clone_index = 0;
    emit_all(&mut out, "clone", clone.as_mut(), rest, cli.lines, &mut clone_index)
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or("invalid arguments");
    first.trim_start_matches("error: ").to_string()
}

fn remaining(options: DrainOptions, taken: usize) -> DrainOptions {
    match options.limit() {
        Some(limit) => options.with_limit(limit.saturating_sub(taken)),
        None => options,
    }
}

fn build_sequence(cli: &Cli) -> Result<Arc<dyn Sequence>, Error> {
    if !cli.items.is_empty() {
        return Ok(Arc::new(Snapshot::new(cli.items.iter().map(String::as_str))));
    }
    match &cli.file {
        Some(path) if cli.lazy => {
            let file = File::open(path).map_err(|err| open_error(path, err))?;
            let mut lines = BufReader::new(file).lines();
            Ok(Arc::new(Generated::new(move || {
                Some(lines.next()?.map_err(|err| {
                    tracing::warn!(error = %err, "read failed");
                    Error::new(ErrorKind::Io)
                        .with_message("failed to read input")
                        .with_source(err)
                }))
            })))
        }
        Some(path) => {
            let file = File::open(path).map_err(|err| open_error(path, err))?;
            Ok(Arc::new(Snapshot::new(read_lines(file)?)))
        }
        None => Ok(Arc::new(Snapshot::new(read_lines(io::stdin().lock())?))),
    }
}

fn read_lines(input: impl Read) -> Result<Vec<String>, Error> {
    BufReader::new(input)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read input")
                .with_source(err)
        })
}

fn open_error(path: &std::path::Path, err: io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(format!("failed to open {}", path.display()))
        .with_source(err)
}

fn emit_all(
    out: &mut impl Write,
    name: &str,
    source: &mut dyn EnumString,
    options: DrainOptions,
    lines: bool,
    batch_index: &mut usize,
) -> Result<(), Error> {
    for batch in Batches::new(source, options) {
        let batch = batch?;
        let index = *batch_index;
        *batch_index += 1;
        let items = batch
            .items
            .iter()
            .map(|item| item.to_utf8())
            .collect::<Result<Vec<_>, _>>()?;
        if lines {
            for item in &items {
                writeln!(out, "{item}").map_err(write_error)?;
            }
            continue;
        }
        let line = BatchLine {
            enumerator: name,
            batch: index,
            status: batch.progress.as_str(),
            items,
        };
        let json = serde_json::to_string(&line).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode batch")
                .with_source(err)
        })?;
        writeln!(out, "{json}").map_err(write_error)?;
    }
    Ok(())
}

fn write_error(err: io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write output")
        .with_source(err)
}

fn emit_error(err: &Error) {
    let value = json!({
        "error": {
            "kind": format!("{:?}", err.kind()),
            "message": err.message().unwrap_or(""),
            "hresult": err.hresult().to_string(),
        }
    });
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
