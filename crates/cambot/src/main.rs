use std::sync::Arc;

use cambot_camera::{CameraConfig, StillCameraClient};

use cambot_core::{camera::StillCamera, config::Config, dispatch::Dispatcher, store::PhotoStore};

#[tokio::main]
async fn main() -> Result<(), cambot_core::Error> {
    cambot_core::logging::init("cambot")?;

    let cfg = Arc::new(Config::load()?);

    let store = Arc::new(PhotoStore::open(&cfg.db_path)?);
    let camera: Arc<dyn StillCamera> = Arc::new(StillCameraClient::new(CameraConfig {
        binary: cfg.camera_bin.clone(),
        timeout: cfg.capture_timeout,
    }));

    let (dispatcher, queue) = Dispatcher::new(cfg.clone());

    cambot_telegram::router::run_polling(cfg, Arc::new(dispatcher), queue, camera, store)
        .await
        .map_err(|e| cambot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
