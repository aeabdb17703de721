use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for the relay proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the relay is up
    Health,
    /// Ask the lookup API what media lives at a page URL
    Lookup {
        #[arg(long)]
        target: String,
    },
    /// Download a file through the relay
    Download {
        #[arg(long)]
        target: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        ext: Option<String>,
        /// Output path; defaults to the filename the relay suggests
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Lookup { target } => {
            let res = client
                .get(format!("{}/api/aio-proxy", cli.url))
                .query(&[("url", target)])
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Download {
            target,
            title,
            ext,
            output,
        } => {
            let mut query = vec![("url", target)];
            if let Some(title) = title {
                query.push(("title", title));
            }
            if let Some(ext) = ext {
                query.push(("ext", ext));
            }

            let res = client
                .get(format!("{}/api/download-proxy", cli.url))
                .query(&query)
                .send()
                .await?;
            if !res.status().is_success() {
                return print_response(res).await;
            }

            let path = output
                .or_else(|| suggested_filename(&res).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("download"));
            let mut file = tokio::fs::File::create(&path).await?;
            let mut written: u64 = 0;
            let mut body = res.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            println!("Saved {} bytes to {}", written, path.display());
        }
    }

    Ok(())
}

/// Pull the quoted filename out of the relay's `Content-Disposition`.
fn suggested_filename(res: &reqwest::Response) -> Option<String> {
    let value = res.headers().get(CONTENT_DISPOSITION)?;
    let value = String::from_utf8_lossy(value.as_bytes());
    let (_, rest) = value.split_once("filename=\"")?;
    let name = rest.strip_suffix('"')?.replace("\\\"", "\"").replace("\\\\", "\\");
    // Never let a server-chosen name escape the working directory.
    let name = name.rsplit(['/', '\\']).next()?.to_string();
    (!name.is_empty()).then_some(name)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
