// IP monitor HTTP client
//
// Wraps `reqwest::Client` with deployment-aware URL construction and reply
// decoding. The backend is mounted under `/ipmonitor` in production and at
// the root everywhere else; the choice is made once, from the host name.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::models::{ApiReply, DeviceRecord};
use crate::transport::TransportConfig;

/// Path prefix the backend is mounted under on the production host.
pub const PRODUCTION_PREFIX: &str = "/ipmonitor";

/// Upper bound on how much of an unexpected body ends up in error messages.
const BODY_PREVIEW: usize = 200;

/// Pick the base path prefix for a backend URL.
///
/// Returns [`PRODUCTION_PREFIX`] when the URL's host contains
/// `production_host`, and an empty prefix otherwise.
pub fn base_prefix_for(url: &Url, production_host: &str) -> &'static str {
    match url.host_str() {
        Some(host) if !production_host.is_empty() && host.contains(production_host) => {
            PRODUCTION_PREFIX
        }
        _ => "",
    }
}

/// Raw HTTP client for the IP monitor backend.
///
/// Every operation returns either the decoded success payload or an
/// [`Error`] carrying the backend's own message when it sent one.
#[derive(Debug, Clone)]
pub struct IpmonClient {
    http: reqwest::Client,
    base_url: Url,
    prefix: &'static str,
}

impl IpmonClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `http://10.0.0.5:5000` or
    /// `https://monitor.tce.go.gov.br`).
    pub fn new(
        base_url: Url,
        production_host: &str,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, production_host))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, production_host: &str) -> Self {
        let prefix = base_prefix_for(&base_url, production_host);
        debug!(%base_url, prefix, "ipmon client ready");
        Self {
            http,
            base_url,
            prefix,
        }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The deployment path prefix in use (`""` or `/ipmonitor`).
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}{prefix}/api/{segments...}`.
    ///
    /// Each segment is percent-encoded on its own, so a segment id
    /// containing `/` or spaces cannot escape its path position.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            path.pop_if_empty();
            for part in self.prefix.split('/').filter(|p| !p.is_empty()) {
                path.push(part);
            }
            path.push("api");
            path.extend(segments);
        }
        Ok(url)
    }

    // ── Configuration endpoints ──────────────────────────────────────

    /// `POST /api/config/save` with the full configuration tree.
    pub async fn save_config(&self, config: &(impl Serialize + Sync)) -> Result<ApiReply, Error> {
        let url = self.api_url(&["config", "save"])?;
        self.post_reply(url, Some(config)).await
    }

    /// `POST /api/config/reset`, restoring server-side defaults.
    pub async fn reset_config(&self) -> Result<ApiReply, Error> {
        let url = self.api_url(&["config", "reset"])?;
        self.post_reply(url, None::<&()>).await
    }

    /// `POST /api/config/test`: dry-run validation, nothing is persisted.
    pub async fn test_config(&self, config: &(impl Serialize + Sync)) -> Result<ApiReply, Error> {
        let url = self.api_url(&["config", "test"])?;
        self.post_reply(url, Some(config)).await
    }

    // ── Status endpoint ──────────────────────────────────────────────

    /// `GET api/start-check/{segment}`: latest sweep results for a segment.
    ///
    /// A `204` means the backend has not scanned the segment yet and maps
    /// to [`Error::NoContent`].
    pub async fn segment_status(&self, segment: &str) -> Result<Vec<DeviceRecord>, Error> {
        let url = self.api_url(&["start-check", segment])?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();

        if status == reqwest::StatusCode::NO_CONTENT {
            return Err(Error::NoContent {
                segment: segment.to_owned(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        decode(&body)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn post_reply(
        &self,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<ApiReply, Error> {
        debug!("POST {}", url);

        let mut builder = self.http.post(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let text = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(api_error(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(ApiReply::default());
        }

        let reply: ApiReply = decode(&text)?;
        if reply.is_rejected() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: reply.server_message().map(str::to_owned),
            });
        }
        Ok(reply)
    }
}

/// Turn a non-success response into [`Error::Api`], lifting the backend's
/// `message`/`error` text when the body is a JSON reply.
fn api_error(status: reqwest::StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ApiReply>(body)
        .ok()
        .and_then(|r| r.server_message().map(str::to_owned));
    if message.is_none() && !body.trim().is_empty() {
        warn!(status = status.as_u16(), body = %preview(body), "unstructured error body");
    }
    Error::Api {
        status: status.as_u16(),
        message,
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(body)),
        body: body.to_owned(),
    })
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
