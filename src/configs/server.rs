use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// TLS certificate chain, PEM.
    #[serde(default = "default_cert")]
    pub cert: String,
    /// TLS private key, PEM.
    #[serde(default = "default_key")]
    pub key: String,
    /// Deadline for non-upload requests, seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_sec: u64,
    /// Drain window after a termination signal, seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_sec: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cert: default_cert(),
            key: default_key(),
            request_timeout_sec: default_request_timeout(),
            shutdown_grace_sec: default_shutdown_grace(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_cert() -> String {
    "server.crt".into()
}

fn default_key() -> String {
    "server.key".into()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_shutdown_grace() -> u64 {
    10
}
