#[tokio::main]
async fn main() -> std::io::Result<()> {
    place::start_server().await
}
