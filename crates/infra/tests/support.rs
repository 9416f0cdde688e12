//! Shared helpers for `igsession-infra` integration tests.

use std::net::TcpListener;

use igsession_domain::ClientConfig;
use igsession_infra::Transport;
use wiremock::MockServer;

/// Configuration pointing both modes at the mock server.
pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        web_base_url: server.uri(),
        app_base_url: server.uri(),
        base_backoff_ms: 1,
        ..ClientConfig::default()
    }
}

pub fn transport_for(server: &MockServer) -> Transport {
    Transport::new(config_for(server)).expect("transport should build")
}

/// Base URL of a port nobody listens on.
pub fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}
