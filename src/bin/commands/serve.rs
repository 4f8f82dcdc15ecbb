use clap::Args;
use geoscope::server::{start_server, ServerConfig};
use geoscope::GeoscopeConfig;

/// Arguments for the Serve command
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind to, overrides the configured address
    #[clap(short, long)]
    pub address: Option<String>,

    /// Port to listen on, overrides the configured port
    #[clap(short, long)]
    pub port: Option<u16>,
}

pub fn run(config: &GeoscopeConfig, args: ServeArgs) {
    let ServeArgs { address, port } = args;

    let mut server_config = ServerConfig::from(config);
    if let Some(address) = address {
        server_config = server_config.with_address(address);
    }
    if let Some(port) = port {
        server_config = server_config.with_port(port);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("ERROR: unable to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(start_server(server_config)) {
        eprintln!("ERROR: server failed: {}", e);
        std::process::exit(1);
    }
}
