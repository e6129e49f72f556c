use digit_extractor::app::{ExtractorApp, APP_TITLE};
use digit_extractor::config::Config;
use dotenv::dotenv;
use log::{error, info};

fn main() -> Result<(), eframe::Error> {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    info!("starting {}", APP_TITLE);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(|cc| Ok(Box::new(ExtractorApp::new(cc, config)?))),
    )
}
