use clap::Parser;
use log::{error, info};
use server::config::{
    parse_route, IdScheme, OverflowPolicy, RelayPolicy, RoutingTable, ServerConfig,
};
use server::network::Server;

#[derive(Parser, Debug)]
#[command(author, version, about = "JSON relay for tile-world multiplayer sessions")]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8081")]
    port: u16,

    /// How session ids are assigned
    #[arg(long, value_enum, default_value_t = IdScheme::Counter)]
    id_scheme: IdScheme,

    /// Frames buffered per connection before the overflow policy applies
    #[arg(long, default_value = "256")]
    queue_size: usize,

    /// What to do when a connection's queue is full
    #[arg(long, value_enum, default_value_t = OverflowPolicy::Drop)]
    overflow: OverflowPolicy,

    /// Extra or overriding routes, e.g. `--route ping=toSender`
    #[arg(long = "route", value_parser = parse_route)]
    routes: Vec<(String, RelayPolicy)>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let mut routes = RoutingTable::default();
        for (kind, policy) in self.routes {
            routes.insert(kind, policy);
        }

        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            id_scheme: self.id_scheme,
            queue_size: self.queue_size,
            overflow: self.overflow,
            routes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        println!("Tip: Set RUST_LOG=info to see connection logs");
    }

    let config = Args::parse().into_config();
    info!(
        "Starting relay: ids={:?} queue={} overflow={:?} routes={}",
        config.id_scheme,
        config.queue_size,
        config.overflow,
        config.routes.len()
    );

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind: {}", e);
            return Err(e.into());
        }
    };

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
