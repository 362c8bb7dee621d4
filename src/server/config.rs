// Relay server configuration

use crate::{
    log::Logger,
    rtmp::{RTMP_MAX_CHUNK_SIZE, RTMP_MIN_CHUNK_SIZE, RTMP_WRITE_CHUNK_SIZE_DEFAULT},
    utils::{get_env_bool, get_env_parsed, get_env_string, IpRangeConfig, DEFAULT_MAX_KEY_LENGTH},
};

const RTMP_PORT_DEFAULT: u32 = 1935;

const MAX_PORT: u32 = 65535;

/// Relay server configuration
#[derive(Clone)]
pub struct RelayConfiguration {
    /// Port
    pub port: u32,

    /// Bind address
    pub bind_address: String,

    /// RTMP chunk size for writes
    pub chunk_size: usize,

    /// Max length for stream keys and app names
    pub key_max_length: usize,

    /// Max number of concurrent connections per IP address
    pub max_concurrent_connections_per_ip: u32,

    /// List of IP ranges not affected by the concurrent connections limit
    pub max_concurrent_connections_whitelist: IpRangeConfig,

    /// User directory endpoint. Empty means every key is
    /// accepted, with no restreaming destinations.
    pub directory_url: String,

    /// Path of the destinations catalog file. Empty disables the catalog.
    pub services_catalog_path: String,

    /// True to log requests
    pub log_requests: bool,
}

impl RelayConfiguration {
    /// Loads configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `logger` - The logger
    pub fn load_from_env(logger: &Logger) -> Result<RelayConfiguration, ()> {
        let port = get_env_parsed::<u32>("RTMP_PORT", RTMP_PORT_DEFAULT);

        if port == 0 || port > MAX_PORT {
            logger.log_error(&format!("RTMP_PORT has an invalid value: {}", port));
            return Err(());
        }

        let bind_address = get_env_string("BIND_ADDRESS", "0.0.0.0");

        let chunk_size =
            get_env_parsed::<usize>("RTMP_CHUNK_SIZE", RTMP_WRITE_CHUNK_SIZE_DEFAULT);

        if !(RTMP_MIN_CHUNK_SIZE..=RTMP_MAX_CHUNK_SIZE).contains(&chunk_size) {
            logger.log_error(&format!(
                "RTMP_CHUNK_SIZE has an invalid value: {}. Min: {}. Max: {}",
                chunk_size, RTMP_MIN_CHUNK_SIZE, RTMP_MAX_CHUNK_SIZE
            ));
            return Err(());
        }

        let key_max_length = get_env_parsed::<usize>("ID_MAX_LENGTH", DEFAULT_MAX_KEY_LENGTH);

        let max_concurrent_connections_per_ip =
            get_env_parsed::<u32>("MAX_IP_CONCURRENT_CONNECTIONS", 4);

        let max_concurrent_connections_whitelist =
            match IpRangeConfig::new_from_string(&get_env_string("CONCURRENT_LIMIT_WHITELIST", ""))
            {
                Ok(cw) => cw,
                Err(s) => {
                    logger.log_error(&format!(
                        "CONCURRENT_LIMIT_WHITELIST has an invalid value: {}",
                        s
                    ));
                    return Err(());
                }
            };

        let directory_url = get_env_string("DIRECTORY_URL", "");

        let services_catalog_path =
            get_env_string("SERVICES_CATALOG", "services/servers.json");

        let log_requests = get_env_bool("LOG_REQUESTS", true);

        Ok(RelayConfiguration {
            port,
            bind_address,
            chunk_size,
            key_max_length,
            max_concurrent_connections_per_ip,
            max_concurrent_connections_whitelist,
            directory_url,
            services_catalog_path,
            log_requests,
        })
    }

    /// Gets the TCP address for listening
    pub fn get_tcp_listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
