#[tokio::main]
async fn main() {
    steady_cli::run().await;
}
