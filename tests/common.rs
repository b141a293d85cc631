//! Shared test utilities: scripted in-process cluster nodes.
//!
//! A `MockNode` is a TCP listener speaking the store's wire protocol,
//! answering each incoming command through a script closure. Tests use
//! them to simulate topology replies, redirections, and node failures.

use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use slotline::frame::{self, Frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

type Script = Arc<dyn Fn(&[String]) -> String + Send + Sync>;

/// Routes the client's tracing events through the test writer so
/// `cargo test -- --nocapture` shows them. First caller wins; later
/// calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A scripted cluster node. Dropping it tears down the listener and
/// every accepted connection, simulating a node crash.
pub struct MockNode {
    port: u16,
    accept: JoinHandle<()>,
    conns: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl MockNode {
    /// Binds a fresh port and serves `script` on it.
    #[allow(dead_code)] // used by other test modules
    pub async fn spawn<F>(script: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::spawn_on(listener, script)
    }

    /// Serves `script` on an already-bound listener, so a script can
    /// embed the node's own address in its replies.
    #[allow(dead_code)]
    pub fn spawn_on<F>(listener: TcpListener, script: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        init_tracing();
        let port = listener.local_addr().unwrap().port();
        let script: Script = Arc::new(script);
        let conns: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::default();
        let accepted = conns.clone();
        let accept = tokio::spawn(async move {
            loop {
                let Ok((sock, _)) = listener.accept().await else {
                    return;
                };
                let handle = tokio::spawn(serve(sock, script.clone()));
                accepted.lock().unwrap().push(handle);
            }
        });
        Self {
            port,
            accept,
            conns,
        }
    }

    #[allow(dead_code)]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The node's `ip:port` name as the client sees it.
    #[allow(dead_code)]
    pub fn name(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        self.accept.abort();
        for handle in self.conns.lock().unwrap().drain(..) {
            handle.abort();
        }
    }
}

async fn serve(mut sock: TcpStream, script: Script) {
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        while let Ok(Some((request, consumed))) = frame::parse(&buf) {
            let _ = buf.split_to(consumed);
            let reply = script(&tokens(request));
            if sock.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
        }
        match sock.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

/// Flattens a command frame into its string tokens.
fn tokens(frame: Frame) -> Vec<String> {
    match frame {
        Frame::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Frame::Bulk(b) => String::from_utf8_lossy(&b).into_owned(),
                Frame::Simple(s) => s,
                other => format!("{other:?}"),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// A port with nothing listening on it.
#[allow(dead_code)]
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[allow(dead_code)]
pub fn simple(s: &str) -> String {
    format!("+{s}\r\n")
}

#[allow(dead_code)]
pub fn error(s: &str) -> String {
    format!("-{s}\r\n")
}

#[allow(dead_code)]
pub fn bulk(s: &str) -> String {
    format!("${}\r\n{s}\r\n", s.len())
}

/// Encodes a cluster-slots reply for ranges all owned by loopback nodes.
#[allow(dead_code)]
pub fn slots_reply(ranges: &[(u16, u16, u16)]) -> String {
    let mut out = format!("*{}\r\n", ranges.len());
    for (start, end, port) in ranges {
        out.push_str(&format!(
            "*3\r\n:{start}\r\n:{end}\r\n*2\r\n$9\r\n127.0.0.1\r\n:{port}\r\n"
        ));
    }
    out
}
