use std::sync::Arc;

use flag_quiz_server::api::quiz_routes;
use flag_quiz_server::config::Config;
use flag_quiz_server::game::RoomRegistry;
use flag_quiz_server::questions::CountryQuestionBank;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_tracing();

    let bank = match CountryQuestionBank::from_csv_file(&config.game.data_path) {
        Ok(bank) => bank,
        Err(e) => {
            tracing::error!(
                path = %config.game.data_path,
                error = %e,
                "Failed to load question bank"
            );
            std::process::exit(1);
        }
    };

    let registry = RoomRegistry::new(Arc::new(bank), config.game_clock());
    registry.clone().start_cleanup(config.sweep_interval());

    let routes = quiz_routes::quiz_routes(registry, config.server.static_dir.clone());

    let (ip, port) = config.bind_address();
    tracing::info!(
        host = %config.server.host,
        port,
        static_dir = %config.server.static_dir,
        "Flag quiz server starting"
    );

    warp::serve(routes).run((ip, port)).await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("flag_quiz_server=info,warp=info"));

    // LOG_FORMAT=json switches to one JSON object per line
    if std::env::var("LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
