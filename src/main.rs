use std::path::PathBuf;
use std::sync::Arc;

use formula_lens::capture::StillImageCamera;
use formula_lens::services::{BroadcastPresenter, OpenAiVisionClient, WolframComputeClient};
use formula_lens::{AppError, Configuration, CoordinatorBuilder};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};

const CONFIG_ENV: &str = "FORMULA_LENS_CONFIG";

fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let configuration = Configuration::load(config_path.as_deref())?;
    init_logging(&configuration.logging.level);

    let image_path = configuration
        .capture
        .image_path
        .clone()
        .ok_or_else(|| AppError::InvalidConfig("capture.image_path is required".to_string()))?;
    let camera = StillImageCamera::open(&image_path)?;

    let connect_timeout = configuration.network.request_timeout();
    let vision = OpenAiVisionClient::new(configuration.vision.clone(), connect_timeout)?;
    let compute = WolframComputeClient::new(configuration.compute.clone(), connect_timeout)?;

    let (presenter, mut result_rx) = BroadcastPresenter::new(4);
    tokio::spawn(async move {
        loop {
            match result_rx.recv().await {
                Ok(animation) => info!(
                    "Result ready: {} frame(s) of {}x{}, {:.2}s",
                    animation.frames().len(),
                    animation.width(),
                    animation.height(),
                    animation.total_duration().as_secs_f64()
                ),
                Err(RecvError::Lagged(skipped)) => warn!("Display lagged, skipped {} results", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let coordinator = CoordinatorBuilder::new(configuration)
        .camera(camera)
        .vision_client(Arc::new(vision))
        .compute_client(Arc::new(compute))
        .presenter(Arc::new(presenter))
        .build()?;
    info!("Formula lens running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    coordinator.shutdown().await;
    Ok(())
}
