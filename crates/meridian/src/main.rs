//! Binary entry point for the Meridian relay.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_meridian::init().await
}
