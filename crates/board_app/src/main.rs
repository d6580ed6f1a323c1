use board_app::{app, logging};
use board_logging::board_error;
use board_remote::RemoteSettings;

fn main() {
    logging::initialize(logging::LogDestination::Both);

    let settings = match RemoteSettings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            board_error!("Backend configuration missing: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = app::run_app(settings) {
        board_error!("Session terminated: {}", err);
        std::process::exit(1);
    }
}
