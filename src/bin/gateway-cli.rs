use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the route gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show listener state and route count
    Status,
    /// List routes in match order
    Routes,
    /// Register a route
    Add {
        method: String,
        path: String,
        target: String,
        /// Replace an existing route with the same method and path
        #[arg(long)]
        replace: bool,
    },
    /// Start the gateway listener
    Listen {
        host: String,
        port: i64,
    },
    /// Stop the gateway listener
    Stop,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Routes => client.get(format!("{base}/admin/routes")),
        Commands::Add { method, path, target, replace } => {
            let body = json!({ "method": method, "path": path, "target": target });
            let url = format!("{base}/admin/routes");
            if replace {
                client.put(url).json(&body)
            } else {
                client.post(url).json(&body)
            }
        }
        Commands::Listen { host, port } => client
            .post(format!("{base}/admin/listen"))
            .json(&json!({ "host": host, "port": port })),
        Commands::Stop => client.post(format!("{base}/admin/stop")),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
