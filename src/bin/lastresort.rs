use clap::{crate_version, Parser};

use futures::prelude::*;
use serde::Serialize;
use std::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::spawn;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use lastresort::chunks::{split_into_chunks, QrChunk, ShareLink};
use lastresort::config::ResortConfig;
use lastresort::constants::DEFAULT_CONFIG_DIR;
use lastresort::pipeline::{combine, split, Recovered};
use lastresort::scanner::{self, ScanEvent};
use lastresort::session::{ScanOutcome, ScanSession};
use lastresort::ShareError;

#[derive(Debug, Parser)]
#[command(name = "lastresort")]
#[command(version = crate_version!())]
#[command(
    about = "Split a secret into QR-ready pieces and restore it from a threshold of them",
    long_about = "lastresort splits a secret into pieces for trusted people, any threshold-sized group of which can restore it while fewer reveal nothing. Each piece is printable text; pieces longer than one QR code holds are cut into numbered parts (SHARE_<n>_OF_<m>|...). Restoring accepts pieces typed in, as mylastresort:// links, or as scanned QR parts, and verifies the recovered secret against a checksum stored at split time."
)]
enum CliArgument {
    /// Split a secret into pieces.
    Split {
        /// Secret to split.
        #[clap(long)]
        secret: String,

        /// Number of pieces to create, defaults to the configured value.
        #[clap(long, short)]
        shares: Option<usize>,

        /// Pieces needed to restore, defaults to the configured value.
        #[clap(long, short)]
        threshold: Option<usize>,

        /// Characters per QR code, defaults to the configured value.
        #[clap(long, short)]
        chunk_size: Option<usize>,

        /// Print the QR payloads of every piece
        #[clap(long, short)]
        verbose: bool,

        /// Print machine-readable JSON
        #[clap(long)]
        json: bool,
    },
    /// Restore a secret from pieces, links or QR parts.
    Combine {
        /// A piece, a mylastresort:// link, or one QR part. Parts of one piece must be given together.
        #[clap(long = "share", short = 's', required = true)]
        shares: Vec<String>,

        /// Print machine-readable JSON
        #[clap(long)]
        json: bool,
    },
    /// Read decoded QR text from stdin, one scan per line, and print every completed piece.
    Scan {
        /// Restore the secret from the scanned pieces at end of input.
        #[clap(long)]
        combine: bool,
    },
}

#[derive(Parser, Debug)]
#[clap(name = "lastresort")]
struct Opt {
    /// Directory holding conf.toml.
    #[clap(long, default_value = DEFAULT_CONFIG_DIR)]
    config: String,

    /// Subcommand to run.
    #[clap(subcommand)]
    argument: CliArgument,
}

#[derive(Debug, Serialize)]
struct PieceOutput {
    number: usize,
    share: String,
    link: String,
    chunks: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let opt = Opt::parse();
    let config = ResortConfig::new(&opt.config)?;
    debug!("Using config: {:?}", config);

    match opt.argument {
        CliArgument::Split {
            secret,
            shares,
            threshold,
            chunk_size,
            verbose,
            json,
        } => {
            let shares = shares.unwrap_or(config.shares);
            let threshold = threshold.unwrap_or(config.threshold);
            let chunk_size = chunk_size.unwrap_or(config.chunk_size);

            let encoded = split(&secret, shares, threshold).map_err(explain)?;

            let pieces = encoded
                .iter()
                .enumerate()
                .map(|(i, share)| -> Result<PieceOutput, Box<dyn Error>> {
                    let chunks = split_into_chunks(share, chunk_size).map_err(explain)?;
                    Ok(PieceOutput {
                        number: i + 1,
                        share: share.clone(),
                        link: ShareLink::for_share(i + 1, share).to_string(),
                        chunks: chunks.iter().map(QrChunk::payload).collect(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&pieces)?);
                return Ok(());
            }

            println!("✂️  Secret has been split into {} pieces.", shares);
            println!("    threshold: {}", threshold);
            for piece in &pieces {
                println!();
                println!("🧩 Piece #{} ({} QR codes)", piece.number, piece.chunks.len());
                println!("  {}", piece.share);
                if verbose {
                    println!("  link: {}", piece.link);
                    for chunk in &piece.chunks {
                        println!("  qr: {}", chunk);
                    }
                }
            }
        }

        CliArgument::Combine { shares, json } => {
            let pieces = collect_pieces(&shares)?;
            debug!("Collected {} pieces from {} inputs.", pieces.len(), shares.len());

            let recovered = combine(&pieces).map_err(explain)?;
            report(&recovered, json)?;
        }

        CliArgument::Scan { combine: restore } => {
            let (mut events, mut completed, scan_loop) = scanner::new(64, config.debounce());
            let handle = spawn(scan_loop.run());

            let printer = spawn(async move {
                let mut pieces = Vec::new();
                while let Some(piece) = completed.next().await {
                    println!("📷 Piece scanned: {}", piece);
                    pieces.push(piece);
                }
                pieces
            });

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if events.send(ScanEvent::Decoded(line)).await.is_err() {
                    break;
                }
            }
            events.close_channel();

            let summary = handle.await?;
            let pieces = printer.await?;
            debug!("Scan summary: {:?}", summary);

            if restore {
                let recovered = combine(&pieces).map_err(explain)?;
                report(&recovered, false)?;
            }
        }
    }

    Ok(())
}

/// Turns command line inputs into whole pieces, unwrapping links and joining QR parts.
fn collect_pieces(inputs: &[String]) -> Result<Vec<String>, Box<dyn Error>> {
    let mut session = ScanSession::new();
    let mut pieces = Vec::new();

    for input in inputs {
        let input = input.trim();
        let text = ShareLink::parse(input).map_or(input.to_string(), |link| link.data);
        match session.ingest(&text) {
            ScanOutcome::Complete(piece) => pieces.push(piece),
            ScanOutcome::Restarted { discarded, .. } => {
                return Err(explain(ShareError::MalformedShare(format!(
                    "{discarded} QR parts of a piece were followed by parts of another piece"
                ))))
            }
            ScanOutcome::Rejected => {
                return Err(explain(ShareError::MalformedShare(format!(
                    "QR part {input:?} has an impossible position or total"
                ))))
            }
            outcome => debug!("input outcome: {:?}", outcome),
        }
    }

    if let Some(progress) = session.progress() {
        let missing: Vec<String> = progress.missing.iter().map(|p| format!("#{p}")).collect();
        return Err(explain(ShareError::MalformedShare(format!(
            "piece is missing QR parts {}",
            missing.join(", ")
        ))));
    }

    Ok(pieces)
}

fn report(recovered: &Recovered, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(recovered)?);
    } else {
        println!("🔑 secret: {}", recovered.secret);
        println!("    checksum: {}", recovered.checksum);
    }

    if !recovered.is_valid {
        return Err("❌ Checksum mismatch. The pieces don't match the original secret. Try again with the correct pieces.".into());
    }
    Ok(())
}

fn explain(err: ShareError) -> Box<dyn Error> {
    format!("❌ {}\n   {}", err, err.hint()).into()
}
