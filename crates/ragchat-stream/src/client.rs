use crate::demux::RecordDemuxer;
use crate::slot::TransferSlot;
use futures_util::StreamExt;
use ragchat_core::{AbortCause, RagchatError, RagchatResult, StreamEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Tunables of a streaming transfer.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// A transfer with no new bytes for this long is abandoned as stalled.
    pub stall_timeout: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            stall_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for streamed assistant responses.
///
/// Clones share the same [`TransferSlot`], so a stop control wired to any clone
/// targets the most recently started transfer.
#[derive(Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    options: StreamOptions,
    slot: Arc<TransferSlot>,
}

impl StreamClient {
    /// Client for `base_url` with default options and its own slot.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
            options: StreamOptions::default(),
            slot: TransferSlot::new(),
        }
    }

    /// Replace the transfer options.
    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    /// Send `token` as a bearer credential.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Share an existing slot instead of the client's own.
    pub fn with_slot(mut self, slot: Arc<TransferSlot>) -> Self {
        self.slot = slot;
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current transfer options.
    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// The transfer slot shared by this client and its clones.
    pub fn slot(&self) -> &Arc<TransferSlot> {
        &self.slot
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// A POST request to `path` with the JSON and auth headers applied.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self
            .http
            .post(self.url(path))
            .header("Content-Type", "application/json");

        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Abort the current transfer. See [`TransferSlot::abort_current`].
    pub fn abort_current(&self) -> bool {
        self.slot.abort_current()
    }

    /// Consume the one-shot user-abort flag.
    pub fn take_user_abort(&self) -> bool {
        self.slot.take_user_abort()
    }

    /// POST `payload` to `path` and deliver every event of the streamed
    /// response to `on_event`, in arrival order, as soon as it is complete.
    ///
    /// The call becomes the slot's current transfer. It fails with
    /// [`RagchatError::Aborted`] when stopped through the slot or when no bytes
    /// arrive for [`StreamOptions::stall_timeout`], and with
    /// [`RagchatError::Http`] on transport errors or a non-success status.
    /// Malformed records are logged and skipped. No retry happens here.
    pub async fn start_stream<P, F>(
        &self,
        path: &str,
        payload: &P,
        mut on_event: F,
    ) -> RagchatResult<()>
    where
        P: Serialize + ?Sized,
        F: FnMut(StreamEvent),
    {
        let url = self.url(path);
        let stall = self.options.stall_timeout;
        let mut guard = self.slot.begin();
        let transfer_id = guard.id();
        info!(transfer_id, url = %url, "Starting stream");

        let request = self.post(path).json(payload).send();
        let resp = tokio::select! {
            biased;
            _ = guard.aborted() => {
                return Err(RagchatError::Aborted(AbortCause::User));
            }
            res = tokio::time::timeout(stall, request) => match res {
                Ok(resp) => resp.map_err(|e| RagchatError::Http(e.to_string()))?,
                Err(_) => {
                    warn!(transfer_id, idle_secs = stall.as_secs(), "No response headers, aborting");
                    return Err(RagchatError::Aborted(AbortCause::Stall { idle: stall }));
                }
            },
        };

        let status = resp.status();
        if !status.is_success() {
            let error_body = tokio::select! {
                biased;
                _ = guard.aborted() => {
                    return Err(RagchatError::Aborted(AbortCause::User));
                }
                body = tokio::time::timeout(stall, resp.text()) => match body {
                    Ok(text) => text.unwrap_or_else(|_| "unknown error".to_string()),
                    Err(_) => {
                        warn!(transfer_id, %status, idle_secs = stall.as_secs(), "Error body stalled, aborting");
                        return Err(RagchatError::Aborted(AbortCause::Stall { idle: stall }));
                    }
                },
            };
            return Err(RagchatError::Http(format!(
                "Stream request failed {status}: {error_body}"
            )));
        }

        // reqwest yields only the bytes that arrived since the previous read.
        let mut body = resp.bytes_stream();
        let mut demux = RecordDemuxer::new();
        let mut delivered = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = guard.aborted() => {
                    info!(transfer_id, delivered, "Stream stopped mid-transfer");
                    return Err(RagchatError::Aborted(AbortCause::User));
                }
                next = tokio::time::timeout(stall, body.next()) => next,
            };

            let chunk = match next {
                Ok(Some(Ok(bytes))) => bytes,
                Ok(Some(Err(e))) => {
                    warn!(transfer_id, error = %e, "Stream read error");
                    return Err(RagchatError::Http(format!("Stream read error: {e}")));
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(transfer_id, idle_secs = stall.as_secs(), delivered, "Stream stalled, aborting");
                    return Err(RagchatError::Aborted(AbortCause::Stall { idle: stall }));
                }
            };

            for evt in demux.push(&chunk) {
                delivered += 1;
                on_event(evt);
            }
        }

        if let Some(evt) = demux.finish() {
            delivered += 1;
            on_event(evt);
        }

        info!(
            transfer_id,
            delivered,
            malformed = demux.malformed_count(),
            "Stream finished"
        );
        Ok(())
    }
}
