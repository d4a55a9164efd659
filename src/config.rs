#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub data_dir: String,
    pub city_db_path: String,
    pub asn_db_path: String,
    pub cors_enabled: bool,
    pub shutdown_timeout_secs: u64,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            city_db_path: "./data/GeoLite2-City.mmdb".to_string(),
            asn_db_path: "./data/GeoLite2-ASN.mmdb".to_string(),
            cors_enabled: true,
            shutdown_timeout_secs: 5,
            debug: false,
        }
    }
}

impl Config {
    /// Build a config from any key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("GEOIP_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let data_dir = lookup("DATA_DIR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "./data".to_string());
        let data_dir = data_dir.trim_end_matches('/').to_string();

        let city_db_path = lookup("GEOIP_CITY_DB")
            .unwrap_or_else(|| format!("{}/GeoLite2-City.mmdb", data_dir));

        let asn_db_path = lookup("GEOIP_ASN_DB")
            .unwrap_or_else(|| format!("{}/GeoLite2-ASN.mmdb", data_dir));

        let cors_enabled = lookup("GEOIP_CORS_ENABLED")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        let shutdown_timeout_secs = lookup("GEOIP_SHUTDOWN_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let debug = lookup("DEBUG")
            .map(|v| !v.is_empty() && parse_flag(&v))
            .unwrap_or(false);

        Self {
            listen_addr,
            data_dir,
            city_db_path,
            asn_db_path,
            cors_enabled,
            shutdown_timeout_secs,
            debug,
        }
    }
}

/// Anything except "0" or "false" (any case) counts as enabled.
fn parse_flag(value: &str) -> bool {
    !(value == "0" || value.eq_ignore_ascii_case("false"))
}

pub fn load_config() -> anyhow::Result<Config> {
    Ok(Config::from_lookup(|key| std::env::var(key).ok()))
}
