use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::info;

use relay_server::{db, grpc, storage};

#[derive(Parser)]
#[command(name = "relay-server")]
#[command(about = "Mailbox relay for multi-process matrix multiplication runs")]
#[command(version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:50051")]
    addr: SocketAddr,
    /// SQLite database URL.
    #[arg(long, default_value = "sqlite::memory:")]
    database: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let pool = db::init_pool(&cli.database).await?;
    let storage = Arc::new(storage::Storage::new(pool));
    let server = grpc::create_server(storage);

    info!(addr = %cli.addr, database = %cli.database, "relay listening");
    Server::builder().add_service(server).serve(cli.addr).await?;

    Ok(())
}
