//! In-process mock robot for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const WELCOME: &[u8] = b"[3000][Connected to Meca500 R3 v8.1.6.]\0";

/// What the mock does after receiving one command
pub enum Reply {
    /// Write each chunk separately, pausing between them
    Send(Vec<Vec<u8>>),
    Silent,
    /// Drop the connection
    Close,
}

impl Reply {
    pub fn frame(raw: &str) -> Self {
        Reply::Send(vec![raw.as_bytes().to_vec()])
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        Reply::Send(chunks.iter().map(|chunk| chunk.as_bytes().to_vec()).collect())
    }
}

/// Control port mock: welcomes each connection, then answers commands
pub struct MockRobot {
    pub address: String,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockRobot {
    pub async fn start<F>(welcome: &'static [u8], handler: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task_received = Arc::clone(&received);
        let task_connections = Arc::clone(&connections);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                task_connections.fetch_add(1, Ordering::SeqCst);
                if socket.write_all(welcome).await.is_err() {
                    continue;
                }

                let mut pending = Vec::new();
                let mut buffer = [0u8; 256];
                'session: loop {
                    let n = match socket.read(&mut buffer).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    pending.extend_from_slice(&buffer[..n]);

                    while let Some(end) = pending.iter().position(|byte| *byte == 0) {
                        let command = String::from_utf8_lossy(&pending[..end]).to_string();
                        pending.drain(..=end);
                        task_received.lock().unwrap().push(command.clone());

                        match handler(&command) {
                            Reply::Send(chunks) => {
                                for chunk in chunks {
                                    if socket.write_all(&chunk).await.is_err() {
                                        break 'session;
                                    }
                                    tokio::time::sleep(Duration::from_millis(20)).await;
                                }
                            }
                            Reply::Silent => {}
                            Reply::Close => break 'session,
                        }
                    }
                }
            }
        });

        Self {
            address,
            received,
            connections,
            handle,
        }
    }

    /// Commands received so far, across all connections
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockRobot {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Monitoring port mock: writes the given chunks to the first connection,
/// then closes it
pub async fn start_monitor(chunks: Vec<&'static str>, pause: Duration) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let handle = tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        for chunk in chunks {
            if socket.write_all(chunk.as_bytes()).await.is_err() {
                return;
            }
            tokio::time::sleep(pause).await;
        }
    });

    (address, handle)
}

/// An address nothing is listening on
pub async fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);
    address
}
