//! Mock API endpoints

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Token endpoint path
pub const TOKEN_PATH: &str = "/clarity/v1/oauth/token";

/// Full path of a public API endpoint
pub fn public_path(api_path: &str) -> String {
    format!("/clarity/v1/public{api_path}")
}

/// Status endpoint path for `id`
pub fn status_path(id: &str) -> String {
    public_path(&format!("/job/{id}/status"))
}

/// Fetch endpoint path for `id`
pub fn fetch_path(id: &str) -> String {
    public_path(&format!("/job/{id}/fetch"))
}

/// Token endpoint answering `token`, expected exactly `times` times
pub async fn mount_token(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token })),
        )
        .expect(times)
        .mount(server)
        .await;
}

/// Submission endpoint assigning `id`, expected exactly once
pub async fn mount_submit(server: &MockServer, api_path: &str, id: &str) {
    Mock::given(method("POST"))
        .and(path(public_path(api_path)))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(serde_json::json!({ "uuid": id })),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Status endpoint for `id` always answering `status`
pub async fn mount_status(server: &MockServer, id: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path(status_path(id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "statusMessage": status })),
        )
        .mount(server)
        .await;
}

/// Fetch endpoint for `id` answering `body` to requests bearing `token`
pub async fn mount_fetch(server: &MockServer, id: &str, token: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(fetch_path(id)))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(1)
        .mount(server)
        .await;
}

/// Raw HTTP API that runs job `J1` to `SUCCESS`, then sends the result
/// headers announcing `declared` bytes and stalls after `sent` of them
///
/// Returns the base URL.
pub async fn spawn_stalling_api(declared: usize, sent: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_stalling(stream, declared, sent));
        }
    });
    format!("http://{addr}")
}

async fn serve_stalling(mut stream: TcpStream, declared: usize, sent: usize) {
    while let Some(target) = read_request(&mut stream).await {
        let json = if target.ends_with("/oauth/token") {
            Some(("200 OK", r#"{"token":"T"}"#))
        } else if target.ends_with("/async") {
            Some(("202 Accepted", r#"{"uuid":"J1"}"#))
        } else if target.ends_with("/status") {
            Some(("200 OK", r#"{"statusMessage":"SUCCESS"}"#))
        } else {
            None
        };

        match json {
            Some((status, body)) => {
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
                    body.len()
                );
                if stream.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
            }
            None => {
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {declared}\r\n\r\n"
                );
                stream.write_all(head.as_bytes()).await.ok();
                stream.write_all(&vec![b'x'; sent]).await.ok();
                stream.flush().await.ok();
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Read one request and return its target, or `None` once the client hangs up
async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if stream.read(&mut byte).await.ok()? == 0 {
            return None;
        }
        head.push(byte[0]);
    }

    let head = String::from_utf8_lossy(&head).into_owned();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).await.ok()?;

    head.lines()
        .next()?
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
}
