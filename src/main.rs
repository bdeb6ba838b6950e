// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! confluence CLI: merge teacher replies into one corpus entry.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;

use confluence::DistillerConfig;
use confluence::distill::Distiller;
use confluence::distill::ParsedArtifact;
use confluence::distill::TeacherReply;
use confluence::distill::distinct_replica_ids;
use confluence::ir::decode_stream;
use confluence::ir::render;
use glyph::Vocabulary;

#[derive(Parser)]
#[command(name = "confluence", version, about = "Conflict-free merging of reasoning artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge saved teacher replies and print the corpus.
    Distill {
        /// The query the replies answer.
        #[arg(long)]
        query: String,

        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Append the training record to this JSONL file.
        #[arg(long)]
        jsonl: Option<PathBuf>,

        /// Write the master snapshot to this JSON file.
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Reply files, each a JSON object `{"model": ..., "content": ...}`.
        #[arg(required = true)]
        replies: Vec<PathBuf>,
    },

    /// Decode a hex-encoded IR program and print its listing.
    Decode {
        /// Program bytes as hex, whitespace allowed.
        hex: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Distill {
            query,
            config,
            jsonl,
            checkpoint,
            replies,
        } => {
            let config = match config {
                Some(path) => DistillerConfig::load(&path).with_context(|| format!("loading {}", path.display()))?,
                None => DistillerConfig::default(),
            };
            let mut distiller = Distiller::with_config(Vocabulary::builtin(), config)?;

            let mut loaded: Vec<TeacherReply> = Vec::with_capacity(replies.len());
            for path in &replies {
                let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
                let reply = serde_json::from_str(&text).with_context(|| format!("parsing reply {}", path.display()))?;
                loaded.push(reply);
            }

            // Several replies may come from one model.
            let ids = distinct_replica_ids(loaded.iter().map(|r| r.model.as_str()));
            let artifacts = ids
                .into_iter()
                .zip(&loaded)
                .map(|(id, reply)| (id, ParsedArtifact::parse(&reply.content)))
                .collect();

            for compiled in distiller.compile_all(artifacts) {
                distiller.collect(compiled)?;
            }
            let master = distiller.merge_all();
            if let Some(path) = checkpoint {
                std::fs::write(&path, master.to_json()?).with_context(|| format!("writing {}", path.display()))?;
            }

            let corpus = distiller.build_corpus(&query)?;
            print!("{}", corpus.listing);
            println!("{}", corpus.symbols);
            if let Some(answer) = &corpus.answer {
                println!("answer: {answer}");
            }

            if let Some(path) = jsonl {
                let line = corpus.to_training_record(&query).to_jsonl()?;
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("opening {}", path.display()))?;
                writeln!(file, "{line}")?;
            }
        }

        Commands::Decode { hex } => {
            let bytes = parse_hex(&hex)?;
            let vocab = Vocabulary::builtin();
            for program in decode_stream(&bytes) {
                print!("{}", render(&program, &vocab));
            }
        }
    }

    return Ok(());
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        let pair: String = pair.iter().collect();
        let byte = u8::from_str_radix(&pair, 16).with_context(|| format!("invalid hex byte `{pair}`"))?;
        bytes.push(byte);
    }
    return Ok(bytes);
}
