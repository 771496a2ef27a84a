//! Connectivity check: prints the backend URL, a masked key and the ticket count.

use ambiente::backend::rest::RestClient;
use ambiente::config;
use ambiente::data::{StatusRecord, Ticket};
use ambiente::util::mask_key;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match config::load(None) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    let url = config.backend.base_url();
    println!("Backend URL: {}", url);
    println!("Anon key:    {}", mask_key(&config.backend.anon_key));

    let rest = RestClient::new(url, &config.backend.anon_key);
    println!("\n=== Counting {} ===", Ticket::TABLE);
    match rest.count(Ticket::TABLE, rest.anon_key()).await {
        Ok(Some(count)) => println!("OK: {} rows", count),
        Ok(None) => println!("OK: connected, but the response carried no row count"),
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
