use salesboard::app;
use salesboard::config::Config;

/// Main entry point for the dashboard server
///
/// Reads configuration from the environment, initializes logging, and runs
/// the web server until shutdown.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env();
    app::run(config).await
}
