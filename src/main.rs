//! Entry point for `file-over-udp`.
//!
//! Parses CLI arguments, initialises logging, opens the input file, connects
//! the UDP channel, and hands off to the library's transfer session.  All
//! protocol work lives in library modules; `main.rs` owns only process setup
//! and exit-status mapping.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use file_over_udp::session::{Session, SessionConfig, TransferStats};
use file_over_udp::transport::UdpChannel;

/// Reliable one-way file push over UDP using a Go-Back-N sliding window.
#[derive(Parser)]
#[command(author, version, about, disable_help_flag = true)]
struct Cli {
    /// Input file to push to the receiver.
    #[arg(short = 'f', long, default_value = "file1.html")]
    file: PathBuf,

    /// Receiver hostname.
    #[arg(short = 'h', long, default_value = "isengard.mines.edu")]
    host: String,

    /// Receiver UDP port.
    #[arg(short = 'p', long, default_value_t = 12345)]
    port: u16,

    /// Log verbosity: 0 = error, 1 = warn, 2 = info, 3 = debug, 4+ = trace.
    #[arg(short = 'd', long = "debug", default_value_t = 2)]
    debug_level: u8,

    /// Print help (`-h` is taken by the hostname flag).
    #[arg(long, action = clap::ArgAction::HelpLong)]
    help: Option<bool>,
}

fn init_logging(level: u8) {
    let filter = match level {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(filter).init();
}

async fn transfer(cli: &Cli) -> anyhow::Result<TransferStats> {
    let file = File::open(&cli.file)
        .with_context(|| format!("unable to open file {}", cli.file.display()))?;
    log::info!("file opened successfully: {}", cli.file.display());

    let mut channel = UdpChannel::connect((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("unable to reach {}:{}", cli.host, cli.port))?;

    let session = Session::new(BufReader::new(file), SessionConfig::default());
    let stats = session.run(&mut channel).await?;
    Ok(stats)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Argument problems surface as a typed parse error, printed and mapped
    // to exit status 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    init_logging(cli.debug_level);
    log::trace!(
        "arguments: file={} host={} port={} debug={}",
        cli.file.display(),
        cli.host,
        cli.port,
        cli.debug_level
    );

    match transfer(&cli).await {
        Ok(stats) => {
            log::info!(
                "transfer complete: {} bytes in {} datagram(s), {} retransmission(s), \
                 {} ACK(s) accepted, {} discarded",
                stats.payload_bytes,
                stats.datagrams_sent,
                stats.retransmissions,
                stats.acks_accepted,
                stats.acks_discarded
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
