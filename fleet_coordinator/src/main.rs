use log::{error, LevelFilter};

fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = fleet_coordinator::modules::run() {
        error!("Fleet stopped: {}", e);
        std::process::exit(1);
    }
}
