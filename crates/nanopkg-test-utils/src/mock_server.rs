//! A fake Flat-style repository HTTP server (spec §4.3, §15).

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Start a `wiremock` server that serves `packages_text` as `/Packages`, for
/// repository-loader and end-to-end executor tests that need a real (if
/// fake) `Flat` source instead of a `file:` URL.
pub async fn mock_repo(packages_text: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Packages"))
        .respond_with(ResponseTemplate::new(200).set_body_string(packages_text))
        .mount(&server)
        .await;
    server
}
