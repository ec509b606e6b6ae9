//! Main application entry point.

fn main() {
    env_logger::init();
    log::info!("Starting GeoDraft");

    let config = geodraft_app::AppConfig::from_env();
    if let Err(e) = geodraft_app::App::run(config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
