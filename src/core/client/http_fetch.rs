use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use tracing::{debug, warn};

use crate::errors::ResourceError;

/// Status line and body of a completed GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait HttpGet: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, ResourceError>;
}

/// Default fetcher for manifest URLs.
#[derive(Clone, Default)]
pub struct ReqwestGet {
    client: reqwest::Client,
}

impl ReqwestGet {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpGet for ReqwestGet {
    async fn get(&self, url: &str) -> Result<HttpResponse, ResourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// GETs `url`, retrying after `delay` on transport errors and 5xx answers.
/// Any other non-200 status fails at once.
pub async fn read_http_with_retries(
    get: &dyn HttpGet,
    delay: Duration,
    url: &str,
    attempts: i32,
) -> Result<Vec<u8>, ResourceError> {
    if attempts <= 0 {
        return Err(ResourceError::Usage(format!(
            "http attempts must be greater than 0, was {attempts}"
        )));
    }

    let mut last_err = None;
    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(delay).await;
        }

        let response = match get.get(url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("GET {} failed (attempt {}/{}): {}", url, attempt + 1, attempts, e);
                last_err = Some(e);
                continue;
            }
        };

        if response.status == StatusCode::OK {
            debug!("Fetched {} ({} bytes)", url, response.body.len());
            return Ok(response.body);
        }

        let err = ResourceError::Http {
            url: url.to_string(),
            status: response.status.to_string(),
            code: response.status.as_u16(),
        };
        if !response.status.is_server_error() {
            return Err(err);
        }
        warn!("GET {} answered {} (attempt {}/{})", url, response.status, attempt + 1, attempts);
        last_err = Some(err);
    }

    Err(last_err.unwrap_or_else(|| ResourceError::InvalidUrl {
        url: url.to_string(),
        message: "no attempt was made".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedGet {
        answers: Mutex<Vec<Result<HttpResponse, ResourceError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGet {
        fn new(mut answers: Vec<Result<HttpResponse, ResourceError>>) -> Self {
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpGet for ScriptedGet {
        async fn get(&self, _url: &str) -> Result<HttpResponse, ResourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers.lock().unwrap().pop().expect("unexpected extra GET")
        }
    }

    fn answer(status: StatusCode, body: &str) -> Result<HttpResponse, ResourceError> {
        Ok(HttpResponse { status, body: body.as_bytes().to_vec() })
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let get = ScriptedGet::new(vec![
            answer(StatusCode::BAD_GATEWAY, ""),
            Err(ResourceError::Usage("connection reset".into())),
            answer(StatusCode::OK, "kind: Pod"),
        ]);

        let body = read_http_with_retries(&get, Duration::from_millis(1), "http://x/pod.yaml", 3)
            .await
            .unwrap();
        assert_eq!(body, b"kind: Pod");
        assert_eq!(get.calls(), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let get = ScriptedGet::new(vec![answer(StatusCode::NOT_FOUND, "")]);

        let err = read_http_with_retries(&get, Duration::from_millis(1), "http://x/missing", 3)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("status code=404"));
        assert_eq!(get.calls(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_the_last_attempt() {
        let get = ScriptedGet::new(vec![
            answer(StatusCode::SERVICE_UNAVAILABLE, ""),
            answer(StatusCode::SERVICE_UNAVAILABLE, ""),
        ]);

        let err = read_http_with_retries(&get, Duration::from_millis(1), "http://x/a", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Http { code: 503, .. }));
        assert_eq!(get.calls(), 2);
    }

    #[tokio::test]
    async fn non_positive_attempts_are_rejected() {
        let get = ScriptedGet::new(Vec::new());
        let err = read_http_with_retries(&get, Duration::ZERO, "http://x/a", 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must be greater than 0"));
        assert_eq!(get.calls(), 0);
    }
}
