// Command line front-end for textrle.
//
// Subcommands map onto the library: `compress` and `decompress` wrap the
// stream helpers in `crate::io`, `inspect` prints the token tree produced by
// `crate::grammar::parse`, and `config` prints build details and defaults.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::codec::decoder::{DEFAULT_MAX_OUTPUT, DecodeOptions};
use crate::codec::encoder::{EncodeOptions, Strategy};
use crate::grammar::{self, DEFAULT_MAX_DEPTH, Event, Token};
use crate::io::{self as rle_io, CompressStats, DecompressStats};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1u64),
    };
    let num: u64 = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Run-length encoder/decoder for printable text.
#[derive(Parser, Debug)]
#[command(
    name = "textrle",
    version,
    about = "Run-length encoder/decoder for printable text",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compress plain text.
    Compress(CompressArgs),
    /// Decompress text produced by either compression mode.
    Decompress(DecompressArgs),
    /// Print the token tree of a compressed file.
    Inspect(InspectArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Single-character runs only.
    Single,
    /// Nested repeat groups.
    Multi,
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// Input file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Check/compute only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    /// Compression mode.
    #[arg(long, short = 'm', value_enum, default_value_t = ModeArg::Multi)]
    mode: ModeArg,

    /// Fail on digits or parentheses in the input.
    #[arg(long)]
    strict: bool,

    /// Input file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DecompressArgs {
    /// Input file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Check/compute only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    /// Maximum decoded size (supports K/M/G suffix).
    #[arg(long = "max-output", value_parser = parse_byte_size, default_value_t = DEFAULT_MAX_OUTPUT as u64)]
    max_output: u64,

    /// Maximum group nesting.
    #[arg(long = "max-depth", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Input file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Compressed input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Maximum group nesting.
    #[arg(long = "max-depth", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Compress,
    Decompress,
    Inspect,
    Config,
}

struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    no_output: bool,
    strategy: Strategy,
    strict: bool,
    max_output: usize,
    max_depth: usize,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    json_output: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Config,
        use_stdout: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        no_output: false,
        strategy: Strategy::MultiPass,
        strict: false,
        max_output: DEFAULT_MAX_OUTPUT,
        max_depth: DEFAULT_MAX_DEPTH,
        input_file: None,
        output_file: None,
        json_output: cli.json_output,
    };

    match cli.command {
        Cmd::Compress(args) => {
            opts.command = Command::Compress;
            opts.use_stdout = args.stdout;
            opts.no_output = args.no_output;
            opts.strategy = match args.mode {
                ModeArg::Single => Strategy::SinglePass,
                ModeArg::Multi => Strategy::MultiPass,
            };
            opts.strict = args.strict;
            opts.input_file = args.input.or(args.input_pos);
            opts.output_file = args.output.or(args.output_pos);
        }
        Cmd::Decompress(args) => {
            opts.command = Command::Decompress;
            opts.use_stdout = args.stdout;
            opts.no_output = args.no_output;
            opts.max_output = usize::try_from(args.max_output).unwrap_or(usize::MAX);
            opts.max_depth = args.max_depth;
            opts.input_file = args.input.or(args.input_pos);
            opts.output_file = args.output.or(args.output_pos);
        }
        Cmd::Inspect(args) => {
            opts.command = Command::Inspect;
            opts.max_depth = args.max_depth;
            opts.input_file = Some(args.input);
        }
        Cmd::Config => {}
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("textrle".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Input / output plumbing
// ---------------------------------------------------------------------------

fn open_input(opts: &Options) -> Result<Box<dyn Read>, i32> {
    match &opts.input_file {
        Some(path) => match File::open(path) {
            Ok(f) => Ok(Box::new(BufReader::with_capacity(BUF_SIZE, f))),
            Err(e) => {
                eprintln!("textrle: input file: {}: {e}", path.display());
                Err(1)
            }
        },
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Write `data` to the configured destination. Called only after the whole
/// input has been processed, so failed runs never leave partial files.
fn write_output(opts: &Options, data: &[u8]) -> i32 {
    if opts.no_output {
        return 0;
    }

    let mut writer: Box<dyn Write> = match (opts.use_stdout, &opts.output_file) {
        (true, _) | (_, None) => Box::new(BufWriter::with_capacity(BUF_SIZE, io::stdout().lock())),
        (false, Some(path)) => {
            if path.exists() && !opts.force {
                eprintln!(
                    "textrle: output file exists, use -f to overwrite: {}",
                    path.display()
                );
                return 1;
            }
            match File::create(path) {
                Ok(f) => Box::new(BufWriter::with_capacity(BUF_SIZE, f)),
                Err(e) => {
                    eprintln!("textrle: output file: {}: {e}", path.display());
                    return 1;
                }
            }
        }
    };

    if let Err(e) = writer.write_all(data).and_then(|()| writer.flush()) {
        eprintln!("textrle: write error: {e}");
        return 1;
    }
    0
}

fn digest_field(digest: Option<[u8; 32]>) -> serde_json::Value {
    match digest {
        Some(d) => serde_json::Value::String(rle_io::hex_digest(&d)),
        None => serde_json::Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("textrle version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;

    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("DEFAULT_MAX_OUTPUT={DEFAULT_MAX_OUTPUT}");
    eprintln!("DEFAULT_MAX_DEPTH={DEFAULT_MAX_DEPTH}");
    eprintln!("RESERVED=0-9 {} {}", grammar::OPEN, grammar::CLOSE);

    0
}

// ---------------------------------------------------------------------------
// Compress command
// ---------------------------------------------------------------------------

fn report_compress(opts: &Options, stats: &CompressStats) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "textrle: compress: input size: {}, output size: {}, ratio: {:.3}",
            stats.input_size,
            stats.output_size,
            stats.ratio()
        );
    }
    if opts.json_output {
        let mode = match stats.strategy {
            Strategy::SinglePass => "single",
            Strategy::MultiPass => "multi",
        };
        let json = serde_json::json!({
            "command": "compress",
            "mode": mode,
            "input_size": stats.input_size,
            "output_size": stats.output_size,
            "input_chars": stats.input_chars,
            "output_chars": stats.output_chars,
            "input_sha256": digest_field(stats.input_sha256),
        });
        eprintln!("{json:#}");
    }
}

fn cmd_compress(opts: &Options) -> i32 {
    let mut reader = match open_input(opts) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let encode_opts = EncodeOptions {
        strategy: opts.strategy,
        strict: opts.strict,
    };
    let mut encoded = Vec::new();
    let stats = match rle_io::compress_stream(&mut reader, &mut encoded, &encode_opts) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("textrle: compress error: {e}");
            return 1;
        }
    };
    log::info!(
        "compressed {} -> {} bytes",
        stats.input_size,
        stats.output_size
    );

    let code = write_output(opts, &encoded);
    if code == 0 {
        report_compress(opts, &stats);
    }
    code
}

// ---------------------------------------------------------------------------
// Decompress command
// ---------------------------------------------------------------------------

fn report_decompress(opts: &Options, stats: &DecompressStats) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "textrle: decompress: input size: {}, output size: {}",
            stats.input_size, stats.output_size
        );
    }
    if opts.json_output {
        let json = serde_json::json!({
            "command": "decompress",
            "input_size": stats.input_size,
            "output_size": stats.output_size,
            "output_sha256": digest_field(stats.output_sha256),
        });
        eprintln!("{json:#}");
    }
}

fn cmd_decompress(opts: &Options) -> i32 {
    let mut reader = match open_input(opts) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let decode_opts = DecodeOptions {
        max_output: Some(opts.max_output),
        max_depth: opts.max_depth,
    };
    let mut decoded = Vec::new();
    let stats = match rle_io::decompress_stream(&mut reader, &mut decoded, &decode_opts) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("textrle: decompress error: {e}");
            return 1;
        }
    };
    log::info!(
        "decompressed {} -> {} bytes",
        stats.input_size,
        stats.output_size
    );

    let code = write_output(opts, &decoded);
    if code == 0 {
        report_decompress(opts, &stats);
    }
    code
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

// Deeper groups are printed at this indentation level.
const MAX_INDENT_LEVELS: usize = 32;

fn print_tokens(tokens: &[Token]) {
    for event in grammar::events(tokens) {
        match event {
            Event::Run { count, ch, depth } => {
                let indent = depth.min(MAX_INDENT_LEVELS) * 2;
                println!("{:indent$}run   {ch:?} x{count}", "");
            }
            Event::Open {
                count,
                tokens,
                depth,
            } => {
                let indent = depth.min(MAX_INDENT_LEVELS) * 2;
                println!("{:indent$}group x{count} ({} tokens)", "", tokens.len());
            }
            Event::Close { .. } => {}
        }
    }
}

fn cmd_inspect(opts: &Options) -> i32 {
    let mut reader = match open_input(opts) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let text = match rle_io::read_text(&mut reader) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("textrle: read error: {e}");
            return 1;
        }
    };
    let tokens = match grammar::parse(&text, opts.max_depth) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("textrle: invalid input: {e}");
            return 1;
        }
    };

    let depth = grammar::depth(&tokens);
    let expanded = grammar::expanded_len(&tokens);

    print_tokens(&tokens);
    println!();
    println!("Tokens:          {}", tokens.len());
    println!("Nesting depth:   {depth}");
    println!("Encoded chars:   {}", text.chars().count());
    println!("Expanded chars:  {expanded}");

    if opts.json_output {
        let json = serde_json::json!({
            "command": "inspect",
            "tokens": tokens.len(),
            "depth": depth,
            "encoded_chars": text.chars().count(),
            "expanded_chars": expanded,
        });
        eprintln!("{json:#}");
    }
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let default_filter = match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Compress => cmd_compress(&opts),
        Command::Decompress => cmd_decompress(&opts),
        Command::Inspect => cmd_inspect(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
