use clap::Parser;
use futures::StreamExt;
use ntrip_dgnss_client::{connect_with_config, ClientConfig};
use tokio::select;
use tracing::{debug, error, info, level_filters::LevelFilter};
use tracing_subscriber::{fmt::Subscriber as FmtSubscriber, EnvFilter};

/// DGNSS correction stream command line tool
#[derive(Clone, PartialEq, Debug, Parser)]
struct Args {
    #[clap(flatten)]
    pub config: ClientConfig,

    #[clap(long, default_value = "info")]
    /// Set log level
    pub log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let filter = EnvFilter::from_default_env().add_directive(args.log_level.into());
    let _ = FmtSubscriber::builder()
        .compact()
        .without_time()
        .with_max_level(args.log_level)
        .with_env_filter(filter)
        .try_init();

    info!("Start DGNSS correction stream tool");
    debug!("Args {args:?}");

    let (exit_tx, mut exit_rx) = tokio::sync::broadcast::channel(1);
    let e = exit_tx.clone();
    tokio::task::spawn(async move {
        tokio::signal::ctrl_c().await.unwrap();
        debug!("Received Ctrl-C, shutting down...");
        let _ = e.send(());
    });

    info!("Connecting to {}", args.config.service);
    let mut handle = connect_with_config(&args.config).await?;

    loop {
        select! {
            chunk = handle.next() => match chunk {
                Some(bytes) => {
                    info!("Received {} correction bytes", bytes.len());
                },
                None => {
                    error!("DGNSS stream ended");
                    break;
                }
            },
            _ = exit_rx.recv() => {
                info!("Exiting on signal");
                break;
            }
        }
    }

    debug!("Exiting");

    Ok(())
}
