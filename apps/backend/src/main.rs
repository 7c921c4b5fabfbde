#[tokio::main]
async fn main() -> anyhow::Result<()> {
    anki_packager_backend::run().await
}
