use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;

use server::session::Session;

// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[clap(short, long, default_value = "3999")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    // Print a message about setting RUST_LOG if not set
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Warning: RUST_LOG environment variable not set. Set it to display logs!");
        eprintln!("Recommended: RUST_LOG=info cargo run");
    }

    // Parse command line arguments
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let listener = TcpListener::bind(&addr).await?;
    info!("Guidance server listening on {}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Robot connected from {}", peer);

        // Each robot is steered by its own task; sessions share no state
        tokio::spawn(async move {
            match Session::new(stream).run().await {
                Ok(secret) => info!("Robot {} delivered the secret: {}", peer, secret),
                Err(err) => error!("Robot {} session failed: {}", peer, err),
            }
        });
    }
}
