//! [`RemoteApi`] over the daemon's HTTP API.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use futures::StreamExt;
use fogsync_protocol::{
    CreateRunRequest, CreateRunResponse, CreateSessionRequest, CreateSessionResponse,
    DiffResult, Repo, RunEvent, SessionDetail, SessionSummary, Settings,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::api::{Endpoint, RemoteApi, RunEventStream, StreamFrame};
use crate::error::ApiError;
use crate::sse::{into_stream_frame, SseDecoder};

pub struct HttpApi {
    client: Client,
    endpoint: ArcSwap<Endpoint>,
    request_timeout: Duration,
}

impl HttpApi {
    pub fn new(request_timeout: Duration) -> Result<Self, ApiError> {
        // No client-wide timeout: it would cut the live stream short.
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: ArcSwap::from_pointee(Endpoint::default()),
            request_timeout,
        })
    }

    pub fn endpoint(&self) -> Arc<Endpoint> {
        self.endpoint.load_full()
    }

    fn url(&self, path: &str) -> Result<String, ApiError> {
        let endpoint = self.endpoint.load();
        if endpoint.base_url.is_empty() {
            return Err(ApiError::NotConfigured);
        }
        Ok(format!(
            "{}/api/{}",
            endpoint.base_url.trim_end_matches('/'),
            path
        ))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let endpoint = self.endpoint.load();
        if endpoint.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&endpoint.token)
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let text = text.trim();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: if text.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                text.to_string()
            },
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!(component = "http", event = "http.get", url = %url);
        let response = self
            .send(self.client.get(&url).timeout(self.request_timeout))
            .await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!(component = "http", event = "http.post", url = %url);
        let response = self
            .send(self.client.post(&url).timeout(self.request_timeout).json(body))
            .await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[async_trait]
impl RemoteApi for HttpApi {
    fn configure(&self, endpoint: Endpoint) {
        self.endpoint.store(Arc::new(endpoint));
    }

    async fn fetch_settings(&self) -> Result<Settings, ApiError> {
        self.get_json("settings").await
    }

    async fn fetch_repos(&self) -> Result<Vec<Repo>, ApiError> {
        let repos: Option<Vec<Repo>> = self.get_json("repos").await?;
        Ok(repos.unwrap_or_default())
    }

    async fn fetch_sessions(&self) -> Result<Vec<SessionSummary>, ApiError> {
        let sessions: Option<Vec<SessionSummary>> = self.get_json("sessions").await?;
        Ok(sessions.unwrap_or_default())
    }

    async fn fetch_session_detail(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionDetail>, ApiError> {
        match self
            .get_json::<SessionDetail>(&format!("sessions/{}", segment(session_id)))
            .await
        {
            Ok(detail) if detail.found_session().is_some() => Ok(Some(detail)),
            Ok(_) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_run_events(
        &self,
        session_id: &str,
        run_id: &str,
        limit: usize,
    ) -> Result<Vec<RunEvent>, ApiError> {
        let events: Option<Vec<RunEvent>> = self
            .get_json(&format!(
                "sessions/{}/runs/{}/events?limit={}",
                segment(session_id),
                segment(run_id),
                limit
            ))
            .await?;
        Ok(events.unwrap_or_default())
    }

    async fn fetch_diff(&self, session_id: &str) -> Result<DiffResult, ApiError> {
        self.get_json(&format!("sessions/{}/diff", segment(session_id)))
            .await
    }

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, ApiError> {
        self.post_json("sessions", request).await
    }

    async fn create_run(
        &self,
        session_id: &str,
        request: &CreateRunRequest,
    ) -> Result<CreateRunResponse, ApiError> {
        self.post_json(&format!("sessions/{}/runs", segment(session_id)), request)
            .await
    }

    async fn open_run_stream(
        &self,
        session_id: &str,
        run_id: &str,
        cursor: u64,
    ) -> Result<RunEventStream, ApiError> {
        let url = self.url(&format!(
            "sessions/{}/runs/{}/stream?cursor={}",
            segment(session_id),
            segment(run_id),
            cursor
        ))?;
        debug!(component = "http", event = "http.stream", url = %url);
        let response = self
            .send(
                self.client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "text/event-stream"),
            )
            .await?;

        let body = Box::pin(response.bytes_stream());
        let frames = futures::stream::unfold(
            (body, SseDecoder::new(), std::collections::VecDeque::new(), false),
            |(mut body, mut decoder, mut queued, mut finished)| async move {
                loop {
                    if finished {
                        return None;
                    }
                    if let Some(item) = queued.pop_front() {
                        if !matches!(item, Ok(StreamFrame::Event(_))) {
                            finished = true;
                        }
                        return Some((item, (body, decoder, queued, finished)));
                    }
                    match body.next().await {
                        Some(Ok(chunk)) => {
                            let frames = decoder.push(&chunk);
                            queued.extend(frames.into_iter().filter_map(into_stream_frame));
                        }
                        Some(Err(e)) => {
                            finished = true;
                            let err = Err(ApiError::Http(e));
                            return Some((err, (body, decoder, queued, finished)));
                        }
                        None => {
                            finished = true;
                            let closed = Err(ApiError::Stream(
                                "stream closed before completion".to_string(),
                            ));
                            return Some((closed, (body, decoder, queued, finished)));
                        }
                    }
                }
            },
        );
        Ok(frames.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_client_refuses_requests() {
        let api = HttpApi::new(Duration::from_secs(1)).expect("client");
        assert!(matches!(api.url("sessions"), Err(ApiError::NotConfigured)));
    }

    #[test]
    fn urls_join_base_and_api_prefix() {
        let api = HttpApi::new(Duration::from_secs(1)).expect("client");
        api.configure(Endpoint {
            base_url: "http://127.0.0.1:8080/".to_string(),
            token: String::new(),
        });
        assert_eq!(
            api.url("sessions").expect("url"),
            "http://127.0.0.1:8080/api/sessions"
        );
        assert_eq!(segment("fog/session one"), "fog%2Fsession%20one");
    }
}
