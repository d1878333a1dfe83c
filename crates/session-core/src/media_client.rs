//! The media-server REST client: open/close a receive port, list streams,
//! close a stream. Only the interface is in scope; this is a thin
//! `reqwest` wrapper over a ZLMediaKit-shaped API, matching the
//! registrar-core webhook client's typed-JSON style.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct OpenPortRequest {
    pub ssrc: u32,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenPortResponse {
    pub port: u16,
    pub ssrc_accepted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaStreamInfo {
    pub stream_id: String,
    pub ssrc: u32,
}

/// The surface the session coordinator needs from the external media
/// server. Kept narrow: media plane handling is out of scope, only the
/// control-plane calls that drive it are ours.
#[async_trait]
pub trait MediaServerClient: Send + Sync {
    async fn open_receive_port(&self, req: OpenPortRequest) -> Result<OpenPortResponse>;
    async fn close_receive_port(&self, port: u16) -> Result<()>;
    async fn list_streams(&self) -> Result<Vec<MediaStreamInfo>>;
    async fn close_stream(&self, stream_id: &str) -> Result<()>;
}

/// `reqwest`-backed client talking to a ZLMediaKit-compatible RESTful API.
pub struct HttpMediaServerClient {
    client: reqwest::Client,
    base_url: String,
    secret: String,
}

impl HttpMediaServerClient {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        HttpMediaServerClient {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl MediaServerClient for HttpMediaServerClient {
    async fn open_receive_port(&self, req: OpenPortRequest) -> Result<OpenPortResponse> {
        let url = format!("{}/index/api/openRtpServer", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("secret", self.secret.as_str())])
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::MediaServer(e.to_string()))?;
        resp.json::<OpenPortResponse>().await.map_err(|e| Error::MediaServer(e.to_string()))
    }

    async fn close_receive_port(&self, port: u16) -> Result<()> {
        let url = format!("{}/index/api/closeRtpServer", self.base_url);
        self.client
            .post(&url)
            .query(&[("secret", self.secret.as_str()), ("port", &port.to_string())])
            .send()
            .await
            .map_err(|e| Error::MediaServer(e.to_string()))?;
        Ok(())
    }

    async fn list_streams(&self) -> Result<Vec<MediaStreamInfo>> {
        let url = format!("{}/index/api/getMediaList", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("secret", self.secret.as_str())])
            .send()
            .await
            .map_err(|e| Error::MediaServer(e.to_string()))?;
        resp.json::<Vec<MediaStreamInfo>>().await.map_err(|e| Error::MediaServer(e.to_string()))
    }

    async fn close_stream(&self, stream_id: &str) -> Result<()> {
        let url = format!("{}/index/api/close_streams", self.base_url);
        self.client
            .post(&url)
            .query(&[("secret", self.secret.as_str()), ("stream", stream_id)])
            .send()
            .await
            .map_err(|e| Error::MediaServer(e.to_string()))?;
        Ok(())
    }
}
