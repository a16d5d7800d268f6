use clap::Parser;
use clap_handler::Handler;

mod commands;

#[derive(Parser, clap_handler::Handler, Clone)]
#[clap(name = "segfetch", version, about)]
struct SegfetchArgs {
    #[clap(subcommand)]
    command: commands::SegfetchCommand,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = SegfetchArgs::parse();
    args.run().await
}
