//! `hrw4u`: translate between hrw4u rules and header_rewrite directives.

mod config;

use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser, Subcommand};
use hrw4u::{
    Context, Diagnostic, ErrorKind, Options, Reader, SectionType, Tables, Translation, Writer,
    compile_source, decompile, reader_for_extension, reader_for_format, readers, writers,
};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hrw4u", version, about = "Translate between hrw4u rules and header_rewrite directives")]
struct Cli {
    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile hrw4u source to header_rewrite directives
    Compile {
        /// Source files (stdin if none)
        files: Vec<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rebuild hrw4u source from header_rewrite directives
    Decompile {
        /// Directive files (stdin if none)
        files: Vec<PathBuf>,

        /// Section for rules without a hook condition
        #[arg(long, value_parser = parse_section)]
        default_section: Option<SectionType>,
    },
    /// Report errors without writing output
    Check {
        /// File to check; `.conf` and `.config` are read as directives
        file: PathBuf,

        /// Input format, overriding the file extension
        #[arg(long, value_parser = parse_format)]
        format: Option<String>,

        /// Print errors as a JSON array on stdout
        #[arg(long)]
        json: bool,
    },
}

fn parse_section(name: &str) -> Result<SectionType, String> {
    SectionType::from_name(name).ok_or_else(|| {
        let names: Vec<_> = SectionType::ALL.iter().map(|s| s.name()).collect();
        format!("unknown section '{name}', expected one of {}", names.join(", "))
    })
}

fn parse_format(name: &str) -> Result<String, String> {
    match reader_for_format(name) {
        Some(reader) => Ok(reader.format().to_string()),
        None => {
            let names: Vec<_> = readers().iter().map(|r| r.format()).collect();
            Err(format!("unknown format '{name}', expected one of {}", names.join(", ")))
        }
    }
}

/// One unit of input, named for diagnostics.
struct Input {
    name: String,
    text: String,
}

fn read_inputs(files: &[PathBuf]) -> Result<Vec<Input>> {
    if files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(vec![Input {
            name: "<stdin>".to_string(),
            text,
        }]);
    }
    files
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(Input {
                name: path.display().to_string(),
                text,
            })
        })
        .collect()
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// A diagnostic as printed by `check --json`.
#[derive(Debug, Serialize)]
struct Report<'a> {
    file: &'a str,
    line: Option<usize>,
    column: Option<usize>,
    kind: ErrorKind,
    message: String,
}

impl<'a> From<&'a Diagnostic> for Report<'a> {
    fn from(diag: &'a Diagnostic) -> Self {
        Self {
            file: &diag.file,
            line: diag.line,
            column: diag.column,
            kind: diag.kind(),
            message: diag.message(),
        }
    }
}

fn report(errors: &[Diagnostic]) {
    for error in errors {
        eprintln!("{error}");
    }
}

fn report_json(errors: &[Diagnostic]) -> Result<()> {
    let reports: Vec<Report<'_>> = errors.iter().map(Report::from).collect();
    let json = serde_json::to_string_pretty(&reports)?;
    write_output(None, &format!("{json}\n"))
}

/// Compile every input. Returns the joined output and the errors.
fn compile_all(inputs: &[Input], tables: &Tables, options: &Options) -> (String, Vec<Diagnostic>) {
    let mut lines = Vec::new();
    let mut errors = Vec::new();
    for input in inputs {
        let ctx = Context::new(tables, options, &input.name);
        let translation = compile_source(&input.text, &ctx);
        tracing::debug!(
            file = %input.name,
            lines = translation.output.len(),
            errors = translation.errors.len(),
            "compiled"
        );
        lines.extend(translation.output);
        errors.extend(translation.errors);
    }
    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    (text, errors)
}

/// Decompile every input. Sources are separated by a blank line.
fn decompile_all(
    inputs: &[Input],
    tables: &Tables,
    options: &Options,
) -> (String, Vec<Diagnostic>) {
    let mut sources = Vec::new();
    let mut errors = Vec::new();
    for input in inputs {
        let ctx = Context::new(tables, options, &input.name);
        let lines: Vec<&str> = input.text.lines().collect();
        let translation = decompile(&lines, &ctx);
        tracing::debug!(
            file = %input.name,
            errors = translation.errors.len(),
            "decompiled"
        );
        if !translation.output.is_empty() {
            sources.push(translation.output);
        }
        errors.extend(translation.errors);
    }
    (sources.join("\n"), errors)
}

/// Reader for `path`: the named format, else the extension, else hrw4u.
fn reader_for(path: &Path, format: Option<&str>) -> Option<&'static dyn Reader> {
    match format {
        Some(format) => reader_for_format(format),
        None => path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(reader_for_extension)
            .or_else(|| reader_for_format("hrw4u")),
    }
}

/// Writer for the format a reader translates into.
fn counterpart(reader: &dyn Reader) -> Option<&'static dyn Writer> {
    writers().iter().copied().find(|w| w.format() != reader.format())
}

/// Read `input`, then write it in the other format. Input with read
/// errors is not written.
fn check_input(
    input: &Input,
    reader: &dyn Reader,
    tables: &Tables,
    options: &Options,
) -> Vec<Diagnostic> {
    let ctx = Context::new(tables, options, &input.name);
    let Translation {
        output: program,
        mut errors,
    } = reader.read(&input.text, &ctx);
    if errors.is_empty()
        && let Some(writer) = counterpart(reader)
    {
        errors.extend(writer.write(&program, &ctx).errors);
    }
    tracing::debug!(
        file = %input.name,
        format = reader.format(),
        errors = errors.len(),
        "checked"
    );
    errors
}

fn run(cli: Cli) -> Result<bool> {
    let root = std::env::current_dir().context("failed to get current directory")?;
    let mut options = config::load(&root)?;
    let tables = Tables::new();

    let errors = match cli.command {
        Command::Compile { files, output } => {
            let inputs = read_inputs(&files)?;
            let (text, errors) = compile_all(&inputs, &tables, &options);
            write_output(output.as_deref(), &text)?;
            errors
        }
        Command::Decompile {
            files,
            default_section,
        } => {
            if let Some(section) = default_section {
                options.decompile.default_section = section;
            }
            let inputs = read_inputs(&files)?;
            let (text, errors) = decompile_all(&inputs, &tables, &options);
            write_output(None, &text)?;
            errors
        }
        Command::Check { file, format, json } => {
            let reader = reader_for(&file, format.as_deref())
                .with_context(|| format!("no reader for {}", file.display()))?;
            let inputs = read_inputs(std::slice::from_ref(&file))?;
            let errors: Vec<_> = inputs
                .iter()
                .flat_map(|input| check_input(input, reader, &tables, &options))
                .collect();
            if json {
                report_json(&errors)?;
                return Ok(errors.is_empty());
            }
            errors
        }
    };
    report(&errors);
    Ok(errors.is_empty())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
