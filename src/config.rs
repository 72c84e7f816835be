use std::{env, time::Duration};

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub max_pool_size: u32,
    pub connect_timeout: Duration,

    // fan-out limits for the dispatcher
    pub max_concurrency: usize,
    pub symbol_queue: usize,
    pub worker_idle: Duration,
    pub shutdown_grace: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017/stockforumx".to_string(),
            mongodb_db: "stockforumx".to_string(),
            max_pool_size: 50,
            connect_timeout: Duration::from_secs(10),
            max_concurrency: 32,
            symbol_queue: 64,
            worker_idle: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    from_lookup(|key| env::var(key).ok())
}

fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Settings {
    let defaults = Settings::default();

    let mongodb_uri = get("MONGODB_URI")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(defaults.mongodb_uri);

    let mongodb_db = get("MONGODB_DB")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(defaults.mongodb_db);

    let max_pool_size = parse_or(get("MONGODB_MAX_POOL_SIZE"), defaults.max_pool_size).max(1);

    let connect_timeout = secs_or(get("MONGODB_CONNECT_TIMEOUT_SECS"), defaults.connect_timeout);

    let max_concurrency = parse_or(get("ALERT_MAX_CONCURRENCY"), defaults.max_concurrency).max(1);
    let symbol_queue = parse_or(get("ALERT_SYMBOL_QUEUE"), defaults.symbol_queue).max(1);
    let worker_idle = secs_or(get("ALERT_WORKER_IDLE_SECS"), defaults.worker_idle);
    let shutdown_grace = secs_or(get("ALERT_SHUTDOWN_GRACE_SECS"), defaults.shutdown_grace);

    Settings {
        mongodb_uri,
        mongodb_db,
        max_pool_size,
        connect_timeout,
        max_concurrency,
        symbol_queue,
        worker_idle,
        shutdown_grace,
    }
}

fn secs_or(raw: Option<String>, default: Duration) -> Duration {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or(default)
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|s| s.trim().parse::<T>().ok()).unwrap_or(default)
}
