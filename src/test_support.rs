//! In-memory fakes for the data source, cache and webhook seams, plus a
//! loopback HTTP responder for the real clients.

use crate::dbsync_api::{Block, DataSource, Epoch, PoolHash, RowId, SlotLeader};
use crate::error::AppError;
use crate::notifier::Notifier;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Indexer tables held in memory, queried with the same filters the
/// REST gateway applies.
#[derive(Default)]
pub struct FixtureSource {
    pub epochs: Vec<Epoch>,
    pub pool_hashes: Vec<PoolHash>,
    pub slot_leaders: Vec<SlotLeader>,
    pub blocks: Vec<Block>,
    pub fail_epochs: bool,
    pub calls: AtomicUsize,
}

impl FixtureSource {
    pub fn with_epochs(numbers: &[i64]) -> Self {
        Self {
            epochs: numbers
                .iter()
                .enumerate()
                .map(|(i, no)| epoch(i as RowId + 1, *no))
                .collect(),
            ..Default::default()
        }
    }

    pub fn add_pool_hash(&mut self, id: RowId, view: &str) {
        self.pool_hashes.push(PoolHash {
            id,
            view: Some(view.to_string()),
            hash_raw: None,
        });
    }

    pub fn add_slot_leader(&mut self, id: RowId, pool_hash_id: RowId) {
        self.slot_leaders.push(SlotLeader {
            id,
            pool_hash_id: Some(pool_hash_id),
            description: None,
        });
    }

    pub fn add_blocks(&mut self, epoch_no: i64, slot_leader_id: RowId, count: usize) {
        for _ in 0..count {
            let id = self.blocks.len() as RowId + 1;
            self.blocks.push(Block {
                id: Some(id),
                epoch_no: Some(epoch_no),
                slot_leader_id: Some(slot_leader_id),
                block_no: Some(id),
                slot_no: None,
            });
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn epoch(id: RowId, no: i64) -> Epoch {
    Epoch {
        no,
        id: Some(id),
        blk_count: None,
        start_time: None,
        end_time: None,
    }
}

#[async_trait]
impl DataSource for FixtureSource {
    async fn epochs(&self) -> Result<Vec<Epoch>, AppError> {
        self.record_call();
        if self.fail_epochs {
            return Err(AppError::UpstreamUnavailable(
                "GET /epoch?order=id.asc returned 503 Service Unavailable: ".into(),
            ));
        }
        let mut epochs = self.epochs.clone();
        epochs.sort_by_key(|e| e.id);
        Ok(epochs)
    }

    async fn pool_hashes(&self, view: &str) -> Result<Vec<PoolHash>, AppError> {
        self.record_call();
        Ok(self
            .pool_hashes
            .iter()
            .filter(|p| p.view.as_deref() == Some(view))
            .cloned()
            .collect())
    }

    async fn slot_leaders(&self, pool_hash_id: RowId) -> Result<Vec<SlotLeader>, AppError> {
        self.record_call();
        Ok(self
            .slot_leaders
            .iter()
            .filter(|s| s.pool_hash_id == Some(pool_hash_id))
            .cloned()
            .collect())
    }

    async fn blocks(&self, epoch_no: i64, slot_leader_id: RowId) -> Result<Vec<Block>, AppError> {
        self.record_call();
        Ok(self
            .blocks
            .iter()
            .filter(|b| b.epoch_no == Some(epoch_no) && b.slot_leader_id == Some(slot_leader_id))
            .cloned()
            .collect())
    }
}

/// Webhook stand-in that records every delivered message
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::DeliveryError(
                "webhook returned 500 Internal Server Error".into(),
            ));
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Canned HTTP responder on a loopback port. Each route is matched by path
/// prefix and answers with a fixed status and JSON body; anything else is 404.
/// Returns the base URL.
pub async fn serve_http(routes: Vec<(&'static str, u16, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let head = read_request(&mut socket).await;
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(prefix, _, _)| path.starts_with(prefix))
                    .map(|(_, status, body)| (*status, body.clone()))
                    .unwrap_or((404, String::new()));

                let response = format!(
                    "HTTP/1.1 {status} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    reason(status),
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

/// Read the request head and drain any body so the client sees a clean reply
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).to_string(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut remaining = content_length.saturating_sub(buf.len() - head_end);
    while remaining > 0 {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => remaining = remaining.saturating_sub(n),
        }
    }
    head
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
