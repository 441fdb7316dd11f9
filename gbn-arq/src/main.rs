//! Entry point for `gbn-arq`.
//!
//! Parses CLI arguments and dispatches into either **send** or **receive**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, signal handling, argument parsing).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use gbn_arq::receiver::ReceiverPeer;
use gbn_arq::{Session, SenderConfig};

/// Go-Back-N ARQ over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a numbered packet stream to a receiver.
    Send {
        /// Receiver address (e.g. 127.0.0.1:8080).
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        peer: SocketAddr,
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
        /// Window size N.
        #[arg(short, long, default_value_t = 4)]
        window: u32,
        /// Retransmission timeout in seconds.
        #[arg(short, long, default_value_t = 2.0)]
        timeout: f64,
        /// Simulated outbound loss probability, 0.0 to 1.0.
        #[arg(short, long, default_value_t = 0.1)]
        loss: f64,
        /// Seed for the loss simulator.
        #[arg(long)]
        seed: Option<u64>,
        /// Number of packets to send.
        #[arg(short = 'n', long, default_value_t = 15)]
        packets: u32,
        /// Give up after this many seconds.
        #[arg(long, default_value_t = 30.0)]
        max_wait: f64,
    },
    /// Acknowledge incoming packets with cumulative ACKs.
    Receive {
        /// Local address to bind (e.g. 0.0.0.0:8080).
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
        /// Exit after this many packets have been delivered in order.
        #[arg(short = 'n', long)]
        packets: Option<u32>,
    },
}

fn seconds(value: f64, what: &str) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("invalid {what}: {value}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity; progress is shown at info by default.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Send {
            peer,
            bind,
            window,
            timeout,
            loss,
            seed,
            packets,
            max_wait,
        } => {
            let config = SenderConfig {
                peer,
                bind,
                window_size: window,
                timeout: seconds(timeout, "timeout")?,
                loss_rate: loss,
                seed,
                drop_list: Vec::new(),
                total_packets: packets,
                max_wait: seconds(max_wait, "max wait")?,
            };
            let session = Session::start(&config).await?;

            let sender = session.sender();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("interrupted; stopping session");
                    sender.stop();
                }
            });

            let report = session.run().await;
            println!("{report}");
            if !report.is_complete() {
                std::process::exit(1);
            }
        }
        Mode::Receive { bind, packets } => {
            let peer = ReceiverPeer::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            log::info!("Receiving on {}", peer.local_addr()?);

            let (stop_tx, stop_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = stop_tx.send(true);
                }
            });

            let state = peer.serve(packets, stop_rx).await?;
            println!("delivered {} packet(s)", state.delivered().len());
        }
    }

    Ok(())
}
