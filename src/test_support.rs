use std::time::Duration;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A wiremock server driven by its own runtime, so blocking clients can be
/// exercised from plain `#[test]` functions.
pub struct MockHttp {
    server: Option<MockServer>,
    runtime: Runtime,
}

impl MockHttp {
    pub fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self {
            server: Some(server),
            runtime,
        }
    }

    fn server(&self) -> &MockServer {
        self.server.as_ref().unwrap()
    }

    pub fn uri(&self) -> String {
        self.server().uri()
    }

    /// Answers `GET url_path` with `status` and a plain-text body.
    pub fn mock_get(&self, url_path: &str, status: u16, body: &str) {
        self.mount(url_path, ResponseTemplate::new(status).set_body_string(body));
    }

    /// Answers `GET url_path` with a 200 only after `delay`.
    pub fn mock_slow_get(&self, url_path: &str, delay: Duration) {
        self.mount(url_path, ResponseTemplate::new(200).set_delay(delay));
    }

    fn mount(&self, url_path: &str, response: ResponseTemplate) {
        self.runtime.block_on(
            Mock::given(method("GET"))
                .and(path(url_path))
                .respond_with(response)
                .mount(self.server()),
        );
    }

    pub fn request_count(&self) -> usize {
        self.runtime
            .block_on(self.server().received_requests())
            .map_or(0, |requests| requests.len())
    }
}

impl Drop for MockHttp {
    fn drop(&mut self) {
        let _guard = self.runtime.enter();
        drop(self.server.take());
    }
}
