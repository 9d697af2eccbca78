#[tokio::main]
async fn main() -> anyhow::Result<()> {
    exposure_tracker_lib::run().await
}
