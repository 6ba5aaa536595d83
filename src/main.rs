#[tokio::main]
async fn main() -> anyhow::Result<()> {
    splitledger::cli::run_with_sys_args().await
}
