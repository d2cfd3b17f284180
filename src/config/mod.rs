use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::game::GameClock;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_PATH: &str = "./data/countries.csv";
pub const DEFAULT_STATIC_DIR: &str = "./frontend";
/// Empty rooms are swept every 15 minutes
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 15 * 60;
pub const DEFAULT_COUNTDOWN_STEP_MILLIS: u64 = 1000;

pub struct Config {
    pub server: ServerConfig,
    pub game: GameConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

pub struct GameConfig {
    pub data_path: String,
    pub sweep_interval_secs: u64,
    pub countdown_step_millis: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env("SERVER_PORT", DEFAULT_PORT),
                static_dir: env::var("QUIZ_STATIC_DIR")
                    .unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string()),
            },
            game: GameConfig {
                data_path: env::var("QUIZ_DATA_PATH")
                    .unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string()),
                sweep_interval_secs: parse_env(
                    "ROOM_SWEEP_INTERVAL_SECS",
                    DEFAULT_SWEEP_INTERVAL_SECS,
                ),
                countdown_step_millis: parse_env(
                    "COUNTDOWN_STEP_MILLIS",
                    DEFAULT_COUNTDOWN_STEP_MILLIS,
                ),
            },
        }
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        let ip_addr = self.parse_host_to_ipv4();
        (ip_addr.octets(), self.server.port)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.game.sweep_interval_secs.max(1))
    }

    pub fn game_clock(&self) -> GameClock {
        GameClock {
            countdown_step: Duration::from_millis(self.game.countdown_step_millis),
            ..GameClock::default()
        }
    }

    fn parse_host_to_ipv4(&self) -> Ipv4Addr {
        if let Ok(addr) = self.server.host.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(ipv4) => return ipv4,
                IpAddr::V6(_) => {
                    tracing::warn!(
                        host = %self.server.host,
                        "IPv6 address provided but only IPv4 supported, using 0.0.0.0"
                    );
                    return Ipv4Addr::new(0, 0, 0, 0);
                }
            }
        }

        match self.server.host.as_str() {
            "localhost" => Ipv4Addr::new(127, 0, 0, 1),
            "" | "0.0.0.0" => Ipv4Addr::new(0, 0, 0, 0),
            _ => {
                tracing::warn!(
                    host = %self.server.host,
                    "Unable to parse host as IPv4, using 0.0.0.0"
                );
                Ipv4Addr::new(0, 0, 0, 0)
            }
        }
    }
}

fn parse_env<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = %key, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_game_config() -> GameConfig {
        GameConfig {
            data_path: DEFAULT_DATA_PATH.to_string(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            countdown_step_millis: DEFAULT_COUNTDOWN_STEP_MILLIS,
        }
    }

    fn config_with_host(host: &str, port: u16) -> Config {
        Config {
            server: ServerConfig {
                host: host.to_string(),
                port,
                static_dir: DEFAULT_STATIC_DIR.to_string(),
            },
            game: default_game_config(),
        }
    }

    #[test]
    fn test_parse_localhost() {
        let config = config_with_host("localhost", 8080);
        assert_eq!(config.bind_address(), ([127, 0, 0, 1], 8080));
    }

    #[test]
    fn test_parse_ipv4_address() {
        let config = config_with_host("192.168.1.1", 3000);
        assert_eq!(config.bind_address(), ([192, 168, 1, 1], 3000));
    }

    #[test]
    fn test_parse_empty_host() {
        let config = config_with_host("", 8080);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 8080));
    }

    #[test]
    fn test_parse_invalid_hostname_defaults_to_all() {
        let config = config_with_host("invalid-hostname", 9000);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 9000));
    }

    #[test]
    fn test_game_clock_uses_countdown_step() {
        let mut config = config_with_host("localhost", 8080);
        config.game.countdown_step_millis = 250;

        let clock = config.game_clock();
        assert_eq!(clock.countdown_step, Duration::from_millis(250));
        assert_eq!(clock.minute, Duration::from_secs(60));
    }

    #[test]
    fn test_sweep_interval_never_zero() {
        let mut config = config_with_host("localhost", 8080);
        assert_eq!(config.sweep_interval(), Duration::from_secs(900));

        config.game.sweep_interval_secs = 0;
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        env::set_var("QUIZ_TEST_PARSE_ENV", "not-a-number");
        assert_eq!(parse_env("QUIZ_TEST_PARSE_ENV", 42u64), 42);

        env::set_var("QUIZ_TEST_PARSE_ENV", " 7 ");
        assert_eq!(parse_env("QUIZ_TEST_PARSE_ENV", 42u64), 7);
        env::remove_var("QUIZ_TEST_PARSE_ENV");
    }
}
