use std::io::{self, BufRead, Write as _};

use clap::{Parser, Subcommand};
use hubd::config::{DEFAULT_HOST, DEFAULT_PORT};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Debug, Parser)]
#[command(name = "hub-cli", version, author)]
/// A line-oriented TCP client for hubd, for manual testing and one-shot commands.
struct HubCli {
    /// Host to connect to.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    /// Port to connect to.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    #[clap(subcommand)]
    command: Option<HubSubcommand>,
}

#[derive(Debug, Subcommand)]
enum HubSubcommand {
    /// Send a single raw command line and print the response.
    Send {
        /// The full command line, e.g. "gpio set 4 1".
        line: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = HubCli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);
    let stream = TcpStream::connect(&addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    match cli.command {
        Some(HubSubcommand::Send { line }) => {
            send_line(&mut write_half, &mut reader, &line).await?;
        }
        None => interactive_mode(&mut write_half, &mut reader).await?,
    }

    Ok(())
}

async fn interactive_mode(
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
) -> anyhow::Result<()> {
    let stdin = io::stdin();
    print!("hub> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            print!("hub> ");
            io::stdout().flush()?;
            continue;
        }
        send_line(write_half, reader, &line).await?;
        print!("hub> ");
        io::stdout().flush()?;
    }
    Ok(())
}

async fn send_line(
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    line: &str,
) -> anyhow::Result<()> {
    write_half.write_all(line.as_bytes()).await?;
    write_half.write_all(b"\n").await?;
    write_half.flush().await?;

    let mut response = String::new();
    reader.read_line(&mut response).await?;
    print!("{response}");
    Ok(())
}
