//! ann-search: approximate nearest-neighbor search over a vector index.
//!
//! ```bash
//! ann-search -path idx/ -word king -encoding fw -stored
//! ann-search -path idx/ -word king -encoding lexlsh -input glove.txt -lexlsh.b 600
//! ```
//!
//! Flags may be written with one dash (`-path`) or two (`--path`).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lexann::fw::DEFAULT_Q;
use lexann::query::to_json_pretty;
use lexann::search::{Searcher, DEFAULT_CLI_CUTOFF, DEFAULT_DEPTH};
use lexann::{EncoderConfig, Encoding, FakeWordsParams, LexLshParams, SearchRequest, VectorSource};

/// Approximate nearest-neighbor search
#[derive(Parser, Debug)]
#[command(name = "ann-search")]
#[command(about = "Find nearest neighbors of a word vector in an encoded vector index")]
#[command(version)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "stored"])))]
struct Args {
    /// Index directory (contains vectors.txt)
    #[arg(long, value_name = "DIR", allow_hyphen_values = true)]
    path: PathBuf,

    /// Word whose vector is the query
    #[arg(long, allow_hyphen_values = true)]
    word: String,

    /// Encoding: fw or lexlsh
    #[arg(long)]
    encoding: Encoding,

    /// Model file to read the query vector from
    #[arg(long, value_name = "FILE", allow_hyphen_values = true)]
    input: Option<PathBuf>,

    /// Read the query vector from the index instead of a model file
    #[arg(long)]
    stored: bool,

    /// Retrieval depth
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    depth: usize,

    /// High-frequency document cutoff
    #[arg(long, default_value_t = DEFAULT_CLI_CUTOFF)]
    cutoff: f32,

    /// Minimum should match (fraction if < 1, count otherwise)
    #[arg(long, default_value_t = 0.0)]
    msm: f32,

    /// Fake Words quantization factor
    #[arg(long = "fw.q", default_value_t = DEFAULT_Q)]
    q: f32,

    /// LexLSH n-gram length
    #[arg(long = "lexlsh.n", default_value_t = 2)]
    ngrams: usize,

    /// LexLSH decimals
    #[arg(long = "lexlsh.d", default_value_t = 1)]
    decimals: u32,

    /// LexLSH hash count
    #[arg(long = "lexlsh.h", default_value_t = 1)]
    hash_count: u32,

    /// LexLSH bucket count
    #[arg(long = "lexlsh.b", default_value_t = 300)]
    bucket_count: u64,

    /// LexLSH hash set size
    #[arg(long = "lexlsh.hsize", default_value_t = 1)]
    hash_set_size: usize,

    /// Index encoding threads (0 = all cores)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Print each assembled query as JSON on stderr
    #[arg(long)]
    explain: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn encoder_config(&self) -> EncoderConfig {
        match self.encoding {
            Encoding::FakeWords => EncoderConfig::FakeWords(FakeWordsParams { q: self.q }),
            Encoding::LexLsh => EncoderConfig::LexLsh(LexLshParams {
                decimals: self.decimals,
                ngrams: self.ngrams,
                hash_count: self.hash_count,
                bucket_count: self.bucket_count,
                hash_set_size: self.hash_set_size,
            }),
        }
    }

    fn request(&self) -> SearchRequest {
        let source = match &self.input {
            Some(path) if !self.stored => VectorSource::Model(path.clone()),
            _ => VectorSource::Stored,
        };
        SearchRequest {
            depth: self.depth,
            cutoff: self.cutoff,
            msm: self.msm,
            workers: self.threads,
            ..SearchRequest::new(&self.path, &self.word, source, self.encoder_config())
        }
    }
}

/// Declared long flags and whether each one takes a value.
fn long_flags() -> Vec<(String, bool)> {
    let mut command = Args::command();
    command.build();
    command
        .get_arguments()
        .filter_map(|arg| {
            arg.get_long()
                .map(|long| (long.to_string(), arg.get_action().takes_values()))
        })
        .collect()
}

/// Rewrites single-dash long flags (`-path`, `-fw.q`) to `--path`, `--fw.q`.
///
/// Only declared flag names are rewritten, and the argument following a
/// value-taking flag is passed through untouched, so `-word -lrb-` looks up
/// the word `-lrb-`. Short flags (`-h`) and negative numbers are left alone.
fn normalize_flags(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let flags = long_flags();
    let mut out = Vec::new();
    let mut expects_value = false;

    for (i, arg) in args.into_iter().enumerate() {
        if i == 0 || std::mem::take(&mut expects_value) {
            out.push(arg);
            continue;
        }
        let declared = arg
            .strip_prefix("--")
            .or_else(|| arg.strip_prefix('-'))
            .and_then(|body| {
                let (name, inline) = match body.split_once('=') {
                    Some((name, _)) => (name, true),
                    None => (body, false),
                };
                flags
                    .iter()
                    .find(|(long, _)| long == name)
                    .map(|(_, takes_value)| *takes_value && !inline)
            });
        match declared {
            Some(takes_value) => {
                expects_value = takes_value;
                if arg.starts_with("--") {
                    out.push(arg);
                } else {
                    out.push(format!("-{arg}"));
                }
            }
            None => out.push(arg),
        }
    }
    out
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: &Args) -> lexann::AnnResult<()> {
    let request = args.request();
    let searcher = Searcher::open(&request)?;
    for vector in searcher.query_vectors(&request.word, &request.source)? {
        let report = searcher.search_vector(&request.word, &vector, request.depth)?;
        if args.explain {
            eprintln!("{}", to_json_pretty(&report.query)?);
        }
        println!("{report}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse_from(normalize_flags(std::env::args()));
    init_tracing(args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
