use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "order-cli")]
#[command(about = "Operator CLI for the order service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place an order
    Order {
        order_id: String,
        product_id: String,
    },
    /// Show the state of every circuit breaker
    CircuitStatus,
    /// Force a circuit open (payment, inventory or shipping)
    Trip { service: String },
    /// Show rate limiter counters
    RateLimit,
    /// Reset the rate limiter window
    ResetRateLimit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Order { order_id, product_id } => {
            client
                .post(format!("{}/orders", base))
                .json(&json!({ "orderId": order_id, "productId": product_id }))
                .send()
                .await?
        }
        Commands::CircuitStatus => client.get(format!("{}/circuit-status", base)).send().await?,
        Commands::Trip { service } => {
            client
                .post(format!("{}/trip-circuit/{}", base, service))
                .send()
                .await?
        }
        Commands::RateLimit => client.get(format!("{}/rate-limit-status", base)).send().await?,
        Commands::ResetRateLimit => client.post(format!("{}/reset-rate-limit", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: order service returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
