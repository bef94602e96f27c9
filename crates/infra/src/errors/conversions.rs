//! Conversions from external infrastructure errors into domain errors.

use fluxline_domain::{FluxlineError, RequestErrorKind};
use reqwest::{Error as HttpError, StatusCode};
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub FluxlineError);

impl From<InfraError> for FluxlineError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<FluxlineError> for InfraError {
    fn from(value: FluxlineError) -> Self {
        Self(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoFluxlineError {
    fn into_fluxline(self) -> FluxlineError;
}

/// Map a response status that is not 2xx to [`FluxlineError::Status`].
pub fn status_error(status: StatusCode) -> FluxlineError {
    FluxlineError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("unknown status").to_string(),
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FluxlineError */
/* -------------------------------------------------------------------------- */

impl IntoFluxlineError for HttpError {
    fn into_fluxline(self) -> FluxlineError {
        // Produced by `error_for_status`; keep the numeric status.
        if let Some(status) = self.status() {
            return status_error(status);
        }

        let kind = if self.is_timeout() {
            RequestErrorKind::Timeout
        } else if self.is_connect() {
            RequestErrorKind::Connect
        } else if self.is_builder() {
            RequestErrorKind::Builder
        } else if self.is_body() || self.is_decode() {
            RequestErrorKind::Body
        } else if self.is_redirect() {
            RequestErrorKind::Redirect
        } else {
            RequestErrorKind::Other
        };

        FluxlineError::Request { kind, message: self.to_string() }
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_fluxline())
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → FluxlineError */
/* -------------------------------------------------------------------------- */

impl IntoFluxlineError for JoinError {
    fn into_fluxline(self) -> FluxlineError {
        if self.is_cancelled() {
            FluxlineError::Worker("task was cancelled before completing".into())
        } else {
            FluxlineError::Worker(format!("task panicked: {self}"))
        }
    }
}

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        Self(value.into_fluxline())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn http_status_maps_to_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: FluxlineError = InfraError::from(error).into();
        assert_eq!(
            mapped,
            FluxlineError::Status { status: 401, reason: "Unauthorized".to_string() }
        );
    }

    #[test]
    fn status_outside_2xx_keeps_code_and_reason() {
        assert_eq!(
            status_error(StatusCode::NOT_MODIFIED),
            FluxlineError::Status { status: 304, reason: "Not Modified".to_string() }
        );
        let unknown = StatusCode::from_u16(599).unwrap();
        assert_eq!(
            status_error(unknown),
            FluxlineError::Status { status: 599, reason: "unknown status".to_string() }
        );
    }

    #[tokio::test]
    async fn refused_connection_maps_to_connect_kind() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: FluxlineError = InfraError::from(error).into();
        match mapped {
            FluxlineError::Request { kind, .. } => assert_eq!(kind, RequestErrorKind::Connect),
            other => panic!("expected request error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicked_task_maps_to_worker_error() {
        let handle = tokio::spawn(async { panic!("boom") });
        let join_error = handle.await.unwrap_err();

        let mapped: FluxlineError = InfraError::from(join_error).into();
        assert!(matches!(mapped, FluxlineError::Worker(ref msg) if msg.contains("panicked")));
    }

    #[tokio::test]
    async fn aborted_task_maps_to_worker_error() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        handle.abort();
        let join_error = handle.await.unwrap_err();

        let mapped: FluxlineError = InfraError::from(join_error).into();
        assert!(matches!(mapped, FluxlineError::Worker(ref msg) if msg.contains("cancelled")));
    }
}
