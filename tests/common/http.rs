//! Minimal HTTP/1.1 client for the REST routes.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[allow(dead_code)]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body must be JSON")
    }
}

/// Send one request with `Connection: close` and read the whole response.
pub async fn request(
    address: &str,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> anyhow::Result<HttpResponse> {
    let mut stream = TcpStream::connect(address).await?;

    let mut head = format!(
        "{method} {path} HTTP/1.1\r\nHost: {address}\r\nConnection: close\r\nContent-Length: {}\r\n",
        body.len()
    );
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;

    let mut raw = String::new();
    timeout(Duration::from_secs(5), stream.read_to_string(&mut raw)).await??;

    let (head, body) = raw
        .split_once("\r\n\r\n")
        .ok_or_else(|| anyhow::anyhow!("malformed response: {raw}"))?;
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("no status line in {head}"))?;
    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}

#[allow(dead_code)]
pub async fn get(address: &str, path: &str) -> anyhow::Result<HttpResponse> {
    request(address, "GET", path, &[], "").await
}
