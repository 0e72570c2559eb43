use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use curriculum_algo::{
    GcnConfig, DEFAULT_DROPOUT, DEFAULT_EPOCHS, DEFAULT_HIDDEN_DIM, DEFAULT_LEARNING_RATE,
    DEFAULT_MAX_RECOMMENDATIONS, DEFAULT_SEED,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Directory holding the curriculum and student JSON files
    pub data_dir: PathBuf,
    pub recommender: RecommenderConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse("PORT").unwrap_or(3000);

        let host = env_parse::<IpAddr>("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let data_dir = std::env::var("DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            host,
            port,
            log_level,
            data_dir,
            recommender: RecommenderConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Model hyper-parameters and request defaults for the recommendation service
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    pub gcn: GcnConfig,
    pub default_max_recommendations: i64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            gcn: GcnConfig::default(),
            default_max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }
}

impl RecommenderConfig {
    pub fn from_env() -> Self {
        let gcn = GcnConfig {
            hidden_dim: env_parse("GCN_HIDDEN_DIM").unwrap_or(DEFAULT_HIDDEN_DIM),
            epochs: env_parse("GCN_EPOCHS").unwrap_or(DEFAULT_EPOCHS),
            learning_rate: env_parse("GCN_LEARNING_RATE").unwrap_or(DEFAULT_LEARNING_RATE),
            dropout: env_parse("GCN_DROPOUT").unwrap_or(DEFAULT_DROPOUT),
            seed: env_parse("GCN_SEED").unwrap_or(DEFAULT_SEED),
        };

        Self {
            gcn: gcn.bounded(),
            default_max_recommendations: env_parse("DEFAULT_MAX_RECOMMENDATIONS")
                .unwrap_or(DEFAULT_MAX_RECOMMENDATIONS),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}
