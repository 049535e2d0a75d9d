use clap::Parser;
use log::info;
use section_scheduler::config::Args;
use section_scheduler::server::{self, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let solver = args.solver_config();
    info!("Using {:?} backend with {:?}", args.backend, solver);

    let state = AppState {
        backend: args.backend,
        solver: Arc::new(solver),
    };
    server::run_server(args.addr, state).await
}
