//! Thin HTTPS client for talking to a Wavy server.

use bytes::Bytes;

use crate::common::types::AnyResult;

pub struct HlsClient {
    http: reqwest::Client,
    base: String,
}

impl HlsClient {
    /// `server` is an origin like `https://192.168.1.10:8080`. Wavy
    /// deployments run on self-signed certificates, so verification is
    /// disabled the way the playback tooling expects.
    pub fn new(server: &str) -> AnyResult<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            http,
            base: server.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub async fn get_text(&self, path: &str) -> AnyResult<String> {
        let response = self.http.get(self.url(path)).send().await?;
        Ok(response.error_for_status()?.text().await?)
    }

    pub async fn get_bytes(&self, path: &str) -> AnyResult<Bytes> {
        let response = self.http.get(self.url(path)).send().await?;
        Ok(response.error_for_status()?.bytes().await?)
    }
}

/// Server path of one artifact.
pub fn artifact_endpoint(owner: &str, audio: &str, filename: &str) -> String {
    format!("/hls/{owner}/{audio}/{filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_shape() {
        assert_eq!(
            artifact_endpoint("alice", "a1", "index.m3u8"),
            "/hls/alice/a1/index.m3u8"
        );
    }

    #[test]
    fn base_url_is_normalized() {
        let client = HlsClient::new("https://host:8080/").unwrap();
        assert_eq!(client.url("/hls/ping"), "https://host:8080/hls/ping");
        assert_eq!(client.url("hls/ping"), "https://host:8080/hls/ping");
    }
}
