#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    showcase::server::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {
    showcase::frontend::run();
}
