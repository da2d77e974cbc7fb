use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use vibepaper::app::{read_console_line, GalleryView, SettingsView};
use vibepaper::logger::{self, LoggerConfig};
use vibepaper::{
    ApiKeyStore, AspectRatio, Config, ConsoleKeyManager, ImageSize, SubmitOutcome, ViewState,
    WallpaperApp, WallpaperClient,
};

const HELP: &str = "\
  <text>            set the prompt and generate 4 wallpapers
  <enter>           generate with the current prompt (e.g. after /remix)
  /ratio <r>        1:1 2:3 3:2 3:4 4:3 9:16 16:9 21:9
  /size <s>         1K 2K 4K
  /open <n>         preview wallpaper n (1-4)
  /close            close the preview
  /remix            reuse the previewed wallpaper as reference
  /clear-ref        drop the pending reference image
  /download [dir]   save the previewed wallpaper as PNG
  /key              choose a different API key
  /state            show the current phase
  /quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded"),
        Err(_) => log::warn!("⚠️  No .env file found"),
    }

    let config = Config::from_env();
    let logger_config = if config.log_json {
        LoggerConfig::production()
    } else {
        LoggerConfig::new()
    };
    logger::init_with_config(logger_config.with_level(config.log_level))?;
    logger::log_startup_info("VibePaper", env!("CARGO_PKG_VERSION"), &config);

    let store = ApiKeyStore::new(config.gemini.api_key.clone());
    let keys = ConsoleKeyManager::new(store.clone());
    let client = WallpaperClient::new(&config.gemini, store, Arc::new(keys.clone()));
    let app = WallpaperApp::new(client, keys);

    app.probe_api_key().await;
    let download_dir = PathBuf::from(config.download_dir.clone().unwrap_or_else(|| ".".to_string()));

    loop {
        let state = app.snapshot();
        if !state.shows_main_ui() {
            render_key_gate();
            match read_console_line().await? {
                None => break,
                Some(line) if line.trim() == "/quit" => break,
                Some(_) => {
                    if let Err(e) = app.connect_api_key().await {
                        log::error!("Key selection failed: {}", e);
                    }
                }
            }
            continue;
        }

        print!("{} ", ">".bright_blue().bold());
        std::io::Write::flush(&mut std::io::stdout())?;
        let Some(line) = read_console_line().await? else {
            break;
        };
        let line = line.trim();

        if !line.starts_with('/') {
            if !line.is_empty() {
                app.set_prompt(line);
            }
            if app.snapshot().can_submit() {
                println!("{}", "✨ Crafting Wallpapers...".bold());
            }
            match app.submit().await {
                SubmitOutcome::Ignored => println!("Type a prompt to describe your vibe (e.g. rainy cyberpunk lo-fi)"),
                SubmitOutcome::Completed(_) | SubmitOutcome::Failed => render_main(&app.snapshot()),
            }
            continue;
        }

        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };
        match command {
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/ratio" => match arg.parse::<AspectRatio>() {
                Ok(ratio) => {
                    app.set_aspect_ratio(ratio);
                    render_settings(&app.settings_view());
                }
                Err(e) => println!("{}", e.to_string().red()),
            },
            "/size" => match arg.parse::<ImageSize>() {
                Ok(size) => {
                    app.set_image_size(size);
                    render_settings(&app.settings_view());
                }
                Err(e) => println!("{}", e.to_string().red()),
            },
            "/open" => match arg.parse::<usize>() {
                Ok(n) if n >= 1 && app.select_image(n - 1) => render_main(&app.snapshot()),
                _ => println!("{}", "No wallpaper with that number".red()),
            },
            "/close" => {
                app.close_viewer();
                render_main(&app.snapshot());
            }
            "/remix" => match app.snapshot().selected_image {
                Some(image) => {
                    app.remix(&image);
                    render_main(&app.snapshot());
                }
                None => println!("Open a wallpaper first with /open <n>"),
            },
            "/clear-ref" => app.clear_reference(),
            "/download" => match app.snapshot().selected_image {
                Some(image) => {
                    let dir = if arg.is_empty() {
                        download_dir.clone()
                    } else {
                        PathBuf::from(arg)
                    };
                    match app.download(&image, &dir).await {
                        Ok(path) => println!("💾 {}", path.display()),
                        Err(e) => log::error!("Download failed: {}", e),
                    }
                }
                None => println!("Open a wallpaper first with /open <n>"),
            },
            "/key" => {
                if let Err(e) = app.reselect_api_key().await {
                    log::error!("Key selection failed: {}", e);
                }
            }
            "/state" => {
                let state = app.snapshot();
                println!(
                    "phase: {:?}, images: {}, remixing: {}, settings: {} @ {}",
                    state.phase(),
                    state.images.len(),
                    state.reference_image.is_some(),
                    state.config.aspect_ratio,
                    state.config.image_size
                );
            }
            other => println!("Unknown command {}, try /help", other),
        }
    }

    log::info!("👋 Bye");
    Ok(())
}

fn render_key_gate() {
    println!();
    println!("{}", "VibePaper AI".bold());
    println!("Create premium AI wallpapers using Gemini 3 Pro. High quality generation requires a paid API key.");
    println!("Learn about billing & API keys: https://ai.google.dev/gemini-api/docs/billing");
    println!("Press enter to connect an API key, or /quit.");
}

fn render_settings(view: &SettingsView) {
    let ratios: Vec<String> = view
        .aspect_ratios
        .iter()
        .map(|o| if o.active { format!("[{}]", o.label).blue().bold().to_string() } else { o.label.to_string() })
        .collect();
    let sizes: Vec<String> = view
        .image_sizes
        .iter()
        .map(|o| if o.active { format!("[{}]", o.label).purple().bold().to_string() } else { o.label.to_string() })
        .collect();
    println!("Aspect Ratio: {}", ratios.join(" "));
    println!("Quality (Resolution): {}", sizes.join(" "));
}

fn render_main(state: &ViewState) {
    println!();
    if let Some(reference) = &state.reference_image {
        println!("{} {}", "🔁 Remixing this vibe:".cyan(), reference.prompt);
    }
    render_settings(&SettingsView::from_config(&state.config));

    if let Some(error) = &state.error {
        println!("{}", error.red());
    }

    let gallery = GalleryView::from_state(state);
    println!("{}", gallery.heading.to_uppercase().bright_black().bold());
    for tile in &gallery.tiles {
        println!(
            "  {}. {} ({}, {} KB)",
            tile.index + 1,
            tile.image.prompt,
            tile.tile_ratio,
            tile.image.url.len() * 3 / 4 / 1024
        );
    }
    if let Some(hint) = gallery.empty_hint {
        println!("  {}", hint.bright_black());
    }

    if let Some(selected) = &state.selected_image {
        println!();
        println!("{} {}", "🖼  Preview:".bold(), selected.prompt);
        println!("   /download to save, /remix to reuse this vibe, /close to go back");
    }
}
