use crate::fetchers::transport::{ApiRequest, ApiResponse, Transport, TransportError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;

type Scripted = std::result::Result<ApiResponse, TransportError>;

/// Replays queued responses in order and records every request. Once the
/// script runs out it answers with an empty `results` page.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_body(self, status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(ApiResponse::new(status, body.as_bytes().to_vec())));
        self
    }

    pub fn then_results(self, results: &str) -> Self {
        self.then_body(200, &format!(r#"{{"results":{}}}"#, results))
    }

    pub fn then_status(self, status: u16) -> Self {
        self.then_body(status, "")
    }

    pub fn then_error(self, error: TransportError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::new(StatusCode::OK, br#"{"results":[]}"#.to_vec())))
    }
}
