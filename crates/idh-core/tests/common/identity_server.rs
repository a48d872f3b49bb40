//! Minimal HTTP/1.1 server that imitates the identity API for integration tests.
//!
//! Replies follow a script, one entry per request; once the script runs out
//! every request gets an OK identity. Every request line and `Authorization`
//! header is recorded.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with an OK identity envelope.
    Identity,
    /// 429 with an optional raw `Retry-After` value.
    RateLimited(Option<&'static str>),
    /// Bare status with an empty body.
    Status(u16),
    /// 200 with a raw body.
    Body(&'static str),
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub authorization: Option<String>,
}

pub struct IdentityServer {
    pub base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl IdentityServer {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. Runs until the process exits.
pub fn start(script: Vec<Reply>) -> IdentityServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let script = Arc::new(Mutex::new(VecDeque::from(script)));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_srv = Arc::clone(&seen);
    let served = Arc::new(Mutex::new(0usize));
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let script = Arc::clone(&script);
            let seen = Arc::clone(&seen_srv);
            let served = Arc::clone(&served);
            thread::spawn(move || handle(stream, &script, &seen, &served));
        }
    });
    IdentityServer {
        base_url: format!("http://127.0.0.1:{}", port),
        seen,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    script: &Mutex<VecDeque<Reply>>,
    seen: &Mutex<Vec<SeenRequest>>,
    served: &Mutex<usize>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    }
    let request = String::from_utf8_lossy(&raw).to_string();
    seen.lock().unwrap().push(parse_request(&request));

    let reply = script.lock().unwrap().pop_front().unwrap_or(Reply::Identity);
    let n = {
        let mut served = served.lock().unwrap();
        *served += 1;
        *served
    };
    let (status, extra, body) = match reply {
        Reply::Identity => ("200 OK".to_string(), String::new(), identity_body(n)),
        Reply::RateLimited(retry_after) => (
            "429 Too Many Requests".to_string(),
            retry_after
                .map(|v| format!("Retry-After: {}\r\n", v))
                .unwrap_or_default(),
            String::new(),
        ),
        Reply::Status(code) => (format!("{} Test", code), String::new(), String::new()),
        Reply::Body(body) => ("200 OK".to_string(), String::new(), body.to_string()),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        status,
        body.len(),
        extra,
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn identity_body(n: usize) -> String {
    format!(
        r#"{{"status":"OK","response":{{"country":"Germany","firstName":"Test{n}","lastName":"Person","city":"Berlin","address":"Hauptstr. {n}","zipCode":"10115","dateOfBirth":"1990-01-01","phone":"+49 30 {n}","bank":{{"iban":"DE89370400440532013000"}},"creditCard":{{"number":"4111111111111111","expirationDate":"12/29","cvv2":"123"}}}}}}"#
    )
}

fn parse_request(request: &str) -> SeenRequest {
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    let authorization = lines
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("authorization"))
        .map(|(_, value)| value.trim().to_string());
    SeenRequest {
        path,
        authorization,
    }
}
