// Humanscan Command Line Interface
// Send an image to the human-detection service and show the annotated result

mod console;

use clap::{Parser, Subcommand};
use humanscan_client::{ClientConfig, Completion, DetectError, DetectionSession};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "humanscan")]
#[command(about = "Humanscan - count the people in an image with a remote detection service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Detection service endpoint (overrides config file and environment)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Configuration file (JSON or TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect people in one image and exit
    Detect {
        /// Image file to send
        #[arg(long, short)]
        image: PathBuf,

        /// Confidence threshold (0.0 - 1.0)
        #[arg(long, short)]
        threshold: Option<String>,

        /// Write the annotated PNG here
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Interactive detection console
    Console {
        /// Image to select on startup
        #[arg(long, short)]
        image: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.endpoint.as_deref())?;
    debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Detect { image, threshold, output } => {
            if !detect_once(config, &image, threshold.as_deref(), output.as_deref()).await? {
                // The cause is already on the diagnostic log
                eprintln!("❌ Detection did not complete");
                std::process::exit(1);
            }
        }
        Commands::Console { image } => {
            let mut session = DetectionSession::from_config(config)?;
            if let Some(ref path) = image {
                session.select_image(Some(path.as_path())).await?;
            }
            let mut console = console::InteractiveConsole::new(session);
            console.run().await?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults, then config file, then `HUMANSCAN_*` environment, then flags
fn load_config(path: Option<&Path>, endpoint: Option<&str>) -> anyhow::Result<ClientConfig> {
    let mut config = match path {
        Some(p) => ClientConfig::from_file(p)?.merge_env(),
        None => ClientConfig::from_env(),
    };

    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint.to_string();
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

/// One detection round trip. `Ok(false)` means the service call failed and
/// has already been logged.
async fn detect_once(
    config: ClientConfig,
    image: &Path,
    threshold: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<bool> {
    let mut session = DetectionSession::from_config(config)?;

    if let Some(raw) = threshold {
        if !session.edit_threshold(raw).is_accepted() {
            return Err(DetectError::InvalidThreshold(raw.to_string()).into());
        }
    }

    session.select_image(Some(image)).await?;
    info!("Sending {} to {}", image.display(), session.config().endpoint);

    match session.dispatch().await? {
        Completion::Applied(result) => {
            println!("Number of people in the image: {}", result.person_count);
            if let Some(path) = output {
                let png = result.annotated_png()?;
                tokio::fs::write(path, &png).await?;
                println!("Annotated image written to {}", path.display());
            }
            Ok(true)
        }
        Completion::Failed(_) | Completion::Stale => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_detect() {
        let cli = Cli::parse_from([
            "humanscan", "detect", "--image", "crowd.jpg", "-t", "0.3", "--endpoint",
            "http://10.0.0.5:8000/api/v1/predict",
        ]);
        assert_eq!(cli.endpoint.as_deref(), Some("http://10.0.0.5:8000/api/v1/predict"));
        match cli.command {
            Commands::Detect { image, threshold, output } => {
                assert_eq!(image, PathBuf::from("crowd.jpg"));
                assert_eq!(threshold.as_deref(), Some("0.3"));
                assert!(output.is_none());
            }
            _ => panic!("Expected detect command"),
        }
    }

    #[test]
    fn test_load_config_from_file_with_flag_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("humanscan.toml");
        std::fs::write(&path, "endpoint = \"http://file-host:8000/api/v1/predict\"\ndefault_threshold = 0.4\n").unwrap();

        let config = load_config(Some(path.as_path()), Some("http://flag-host:9000/predict")).unwrap();
        assert_eq!(config.endpoint, "http://flag-host:9000/predict");
        assert_eq!(config.default_threshold, 0.4);
    }

    #[test]
    fn test_load_config_rejects_bad_endpoint() {
        assert!(load_config(None, Some("not-a-url")).is_err());
    }

    fn png_file(dir: &Path) -> PathBuf {
        let path = dir.join("people.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
        path
    }

    #[tokio::test]
    async fn test_detect_once_failure_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let image = png_file(dir.path());
        let mut config = ClientConfig::default();
        config.endpoint = "http://127.0.0.1:9/api/v1/predict".to_string();
        config.request_timeout_secs = Some(2);

        let completed = detect_once(config, &image, None, None).await.unwrap();
        assert!(!completed);
    }

    #[tokio::test]
    async fn test_detect_once_rejects_bad_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let image = png_file(dir.path());

        let err = detect_once(ClientConfig::default(), &image, Some("abc"), None)
            .await
            .unwrap_err();
        let detect_err = err.downcast_ref::<DetectError>().unwrap();
        assert!(matches!(detect_err, DetectError::InvalidThreshold(raw) if raw == "abc"));
    }
}
