//! Debug collector
//!
//! Listens on the tracer's well-known channel, strips the greeting, decodes
//! every record and logs a live-heap summary per connection.

use anyhow::{Context, Result};
use memtrace::collector::HeapLedger;
use memtrace::config::{load_config, validate_config, TracerConfig};
use memtrace::MessageReader;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn, Level};

/// Records between two progress lines
const SUMMARY_INTERVAL: u64 = 10_000;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starting memtrace collector v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("loading memtrace.toml")?;
    validate_config(&config).context("validating memtrace.toml")?;
    info!(channel = %config.channel.name, "configuration loaded");

    tokio::select! {
        result = serve(&config) => result,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutting down memtrace collector");
            Ok(())
        }
    }
}

/// Reads one tracer connection to the end
async fn consume<S: AsyncRead + Unpin>(mut stream: S, greeting: &str) -> Result<()> {
    let mut reader = MessageReader::new(greeting.as_bytes());
    let mut ledger = HeapLedger::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut records = 0u64;

    loop {
        let read = stream.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        reader.feed(&buf[..read]);

        while let Some(next) = reader.next_record() {
            match next {
                Ok(record) => {
                    debug!(record = %serde_json::to_string(&record)?, "record");
                    ledger.record(&record);
                    records += 1;
                    if records % SUMMARY_INTERVAL == 0 {
                        info!(summary = %serde_json::to_string(&ledger.summary())?, "progress");
                    }
                }
                Err(e) => warn!(error = %e, "skipping malformed message"),
            }
        }
    }

    if !reader.greeted() {
        warn!("connection closed before the greeting arrived");
    }
    info!(
        records,
        summary = %serde_json::to_string(&ledger.summary())?,
        "tracer disconnected"
    );
    Ok(())
}

#[cfg(unix)]
async fn serve(config: &TracerConfig) -> Result<()> {
    use memtrace::channel::SocketConnector;
    use tokio::net::UnixListener;

    let path = SocketConnector::new().socket_path(&config.channel.name);
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("removing stale socket {}", path.display()))?;
    }
    let listener =
        UnixListener::bind(&path).with_context(|| format!("binding {}", path.display()))?;
    info!(path = %path.display(), "Listening for tracers");

    loop {
        let (stream, _) = listener.accept().await?;
        info!("tracer connected");
        let greeting = config.channel.greeting.clone();
        tokio::spawn(async move {
            if let Err(e) = consume(stream, &greeting).await {
                warn!(error = %e, "connection failed");
            }
        });
    }
}

#[cfg(windows)]
async fn serve(config: &TracerConfig) -> Result<()> {
    use memtrace::channel::PipeConnector;
    use tokio::net::windows::named_pipe::{PipeMode, ServerOptions};

    let path = PipeConnector::pipe_path(&config.channel.name);
    let mut server = ServerOptions::new()
        .first_pipe_instance(true)
        .pipe_mode(PipeMode::Message)
        .create(&path)
        .with_context(|| format!("creating {}", path))?;
    info!(path = %path, "Listening for tracers");

    loop {
        server.connect().await?;
        info!("tracer connected");
        let connected = server;
        server = ServerOptions::new()
            .pipe_mode(PipeMode::Message)
            .create(&path)?;

        let greeting = config.channel.greeting.clone();
        tokio::spawn(async move {
            if let Err(e) = consume(connected, &greeting).await {
                warn!(error = %e, "connection failed");
            }
        });
    }
}
