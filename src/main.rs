#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = proctor_session::run().await {
        eprintln!("proctor-session fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
