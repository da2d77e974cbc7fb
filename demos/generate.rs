use std::env;
use std::sync::Arc;
use vibepaper::{
    ApiKeyStore, AspectRatio, Config, ConsoleKeyManager, ImageSize, KeyStatus, SubmitOutcome, WallpaperApp,
    WallpaperClient,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded"),
        Err(_) => log::warn!("⚠️  No .env file found"),
    }
    vibepaper::logger::init()?;

    let mut args = env::args().skip(1);
    let prompt = args
        .next()
        .unwrap_or_else(|| "rainy cyberpunk lo-fi".to_string());
    let ratio: AspectRatio = args.next().as_deref().unwrap_or("9:16").parse()?;
    let size: ImageSize = args.next().as_deref().unwrap_or("1K").parse()?;

    let config = Config::from_env();
    let store = ApiKeyStore::new(config.gemini.api_key.clone());
    let keys = ConsoleKeyManager::new(store.clone());
    let client = WallpaperClient::new(&config.gemini, store, Arc::new(keys.clone()));
    let app = WallpaperApp::new(client, keys);

    if app.probe_api_key().await != KeyStatus::Present {
        app.connect_api_key().await?;
    }

    app.set_aspect_ratio(ratio);
    app.set_image_size(size);
    match app.submit_prompt(prompt).await {
        SubmitOutcome::Completed(_) => {
            for image in app.snapshot().images {
                let path = app.download(&image, "wallpapers").await?;
                println!("{}", path.display());
            }
        }
        SubmitOutcome::Failed => {
            eprintln!("{}", app.snapshot().error.unwrap_or_default());
        }
        SubmitOutcome::Ignored => eprintln!("Prompt must not be blank"),
    }

    Ok(())
}
