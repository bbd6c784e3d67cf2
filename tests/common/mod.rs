//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use frame_gateway::{FrameCache, FrameGateway, GatewayConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Config bound to an ephemeral loopback port.
pub fn local_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_host = "127.0.0.1".into();
    config.listener.port = 0;
    config
}

/// Build and start a gateway, returning it with its bound address.
pub async fn start_gateway(config: GatewayConfig, cache: FrameCache) -> (FrameGateway, SocketAddr) {
    let gateway = FrameGateway::new(config, cache).expect("valid config");
    let addr = gateway.start().await.expect("gateway starts");
    (gateway, addr)
}

/// HTTP client that never pools or proxies.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Send raw bytes and read until the server closes.
#[allow(dead_code)]
pub async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request).await.unwrap();
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), socket.read_to_end(&mut out))
        .await
        .expect("server closed the connection")
        .unwrap();
    out
}

/// Split a raw response into its head (status line + headers) and body.
#[allow(dead_code)]
pub fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("complete header block")
        + 4;
    (String::from_utf8(raw[..end].to_vec()).unwrap(), raw[end..].to_vec())
}

/// Poll `condition` until it holds or `timeout` elapses.
#[allow(dead_code)]
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    true
}
