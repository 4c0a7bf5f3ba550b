use std::time::Duration;

pub const BACKEND_PORT_START: u16 = 8000;
pub const BACKEND_PORT_END: u16 = 8999;
pub const FRONTEND_PORT_START: u16 = 5000;
pub const FRONTEND_PORT_END: u16 = 5999;

// Injected into the child so it knows which port to bind
pub const BACKEND_PORT_ENV: &str = "SERVER_PORT";
pub const FRONTEND_PORT_ENV: &str = "CONDUCTOR_PORT";

pub const HOME_ENV: &str = "GRAPPLER_HOME";
pub const APP_DIRECTORY: &str = ".grappler";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const STATE_FILE_NAME: &str = "state.json";
pub const LOGS_DIRECTORY: &str = "logs";
pub const CONFIG_VERSION: &str = "1";

pub const HEALTH_TIMEOUT_DEFAULT: Duration = Duration::from_secs(30);
pub const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Port of the external conductor proxy that routes `<port>.port.localhost`.
pub const PROXY_PORT: u16 = 3000;

// Recorded vs. observed process creation time may drift by clock-tick rounding
pub const START_TIME_TOLERANCE_MS: u64 = 1000;

pub const DEFAULT_BACKEND_COMMAND: &str = "go run cmd/api-server/main.go";
pub const DEFAULT_FRONTEND_COMMAND: &str = "pnpm conductor:customer";
