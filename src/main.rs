#[cfg(not(target_arch = "wasm32"))]
mod app;
#[cfg(not(target_arch = "wasm32"))]
mod cli;

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    env_logger::init();
    let cli = cli::Cli::parse();
    app::run(cli).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
