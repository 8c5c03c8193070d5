//! Shared helpers for integration tests: a scripted HTTP server that can also
//! act as a forward proxy, a recording proxy manager and an inspectable sink.
#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tubeloader::{DownloadProgress, ProxyHandle, ProxyManager, TubeloaderError};

/// What the server does with the n-th request
#[derive(Debug, Clone)]
pub enum Reply {
    /// Status line with an empty body
    Status(u16),
    /// 200 with body and a Content-Length header
    Body(Vec<u8>),
    /// 200 with body, no Content-Length (close-delimited)
    BodyNoLength(Vec<u8>),
    /// 200 advertising `advertised` bytes but sending only `body` before closing
    Truncated { body: Vec<u8>, advertised: usize },
    /// 200 with a JSON body
    Json(serde_json::Value),
    /// Close the connection without answering
    Hangup,
    /// Wait before answering with the inner reply
    Stall(Duration, Box<Reply>),
}

/// Request as seen by the server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub body: Vec<u8>,
}

pub struct ScriptedServer {
    port: u16,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedServer {
    /// Serve `script` in order; once exhausted the last reply repeats.
    pub async fn start(script: Vec<Reply>) -> Self {
        assert!(!script.is_empty(), "script needs at least one reply");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(script);

        let hits_task = Arc::clone(&hits);
        let requests_task = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else { break };
                let hits = Arc::clone(&hits_task);
                let requests = Arc::clone(&requests_task);
                let script = Arc::clone(&script);
                tokio::spawn(async move {
                    let _ = serve(socket, &script, &hits, &requests).await;
                });
            }
        });

        Self { port, hits, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn proxy(&self) -> ProxyHandle {
        ProxyHandle::new(format!("http://127.0.0.1:{}", self.port))
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(
    mut socket: TcpStream,
    script: &[Reply],
    hits: &AtomicUsize,
    requests: &Mutex<Vec<RecordedRequest>>,
) -> io::Result<()> {
    let request = read_request(&mut socket).await?;
    let index = hits.fetch_add(1, Ordering::SeqCst);
    requests.lock().unwrap().push(request);

    let mut reply = script[index.min(script.len() - 1)].clone();
    while let Reply::Stall(delay, inner) = reply {
        tokio::time::sleep(delay).await;
        reply = *inner;
    }
    write_reply(&mut socket, reply).await
}

async fn read_request(socket: &mut TcpStream) -> io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(RecordedRequest { method, target, body })
}

async fn write_reply(socket: &mut TcpStream, reply: Reply) -> io::Result<()> {
    let (head, body): (String, Vec<u8>) = match reply {
        Reply::Stall(..) | Reply::Hangup => return Ok(()),
        Reply::Status(code) => (
            format!("HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", code, reason(code)),
            Vec::new(),
        ),
        Reply::Body(body) => (
            format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", body.len()),
            body,
        ),
        Reply::BodyNoLength(body) => ("HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string(), body),
        Reply::Truncated { body, advertised } => (
            format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", advertised),
            body,
        ),
        Reply::Json(value) => {
            let body = serde_json::to_vec(&value).expect("json");
            (
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                ),
                body,
            )
        }
    };

    socket.write_all(head.as_bytes()).await?;
    socket.write_all(&body).await?;
    socket.flush().await?;
    socket.shutdown().await
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Proxy manager that hands out a fixed sequence and records every report
pub struct RecordingProxies {
    handles: Vec<ProxyHandle>,
    next: AtomicUsize,
    pub successes: Mutex<Vec<ProxyHandle>>,
    pub failures: Mutex<Vec<(ProxyHandle, String)>>,
}

impl RecordingProxies {
    pub fn new(handles: Vec<ProxyHandle>) -> Self {
        Self {
            handles,
            next: AtomicUsize::new(0),
            successes: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn successes(&self) -> Vec<ProxyHandle> {
        self.successes.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<(ProxyHandle, String)> {
        self.failures.lock().unwrap().clone()
    }
}

impl ProxyManager for RecordingProxies {
    fn get_proxy(&self) -> ProxyHandle {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        self.handles[i.min(self.handles.len() - 1)].clone()
    }

    fn record_success(&self, proxy: &ProxyHandle) {
        self.successes.lock().unwrap().push(proxy.clone());
    }

    fn record_failure(&self, proxy: &ProxyHandle, error: &TubeloaderError) {
        assert!(error.is_rate_limited(), "only rate limiting is reported: {}", error);
        self.failures.lock().unwrap().push((proxy.clone(), error.to_string()));
    }
}

/// In-memory sink that remembers whether it was shut down
#[derive(Debug, Default)]
pub struct MemorySink {
    pub data: Vec<u8>,
    pub writes: usize,
    pub shut_down: bool,
}

impl AsyncWrite for MemorySink {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        assert!(!self.shut_down, "write after shutdown");
        self.data.extend_from_slice(buf);
        self.writes += 1;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shut_down = true;
        Poll::Ready(Ok(()))
    }
}

/// Drain a progress channel into a Vec in the background
pub fn collect_progress() -> (mpsc::Sender<DownloadProgress>, tokio::task::JoinHandle<Vec<DownloadProgress>>) {
    let (tx, mut rx) = mpsc::channel::<DownloadProgress>(16);
    let handle = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });
    (tx, handle)
}
