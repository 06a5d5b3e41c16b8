#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sarraf::run().await
}
