#[tokio::main]
async fn main() {
    if let Err(e) = pestops_backend::run().await {
        eprintln!("pestops-backend failed to start: {}", e);
        std::process::exit(1);
    }
}
