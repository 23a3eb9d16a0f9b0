//! Mock debrid client for testing.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::debrid::{
    parse_availability, AddMagnetResult, Availability, DebridClient, DebridError, RemoteFile,
    TorrentDetails, TorrentSummary, UserInfo,
};

/// Mock implementation of the DebridClient trait.
///
/// Every successful `add_magnet` adds an active torrent to the account, so
/// active-download ceilings fill up the way they would on the service.
/// Instant availability is answered from a raw response body run through
/// the real parser.
#[derive(Debug)]
pub struct MockDebridClient {
    user_error: Arc<RwLock<Option<DebridError>>>,
    user_calls: Arc<RwLock<usize>>,
    /// Errors returned by upcoming `add_magnet` calls, in order.
    add_errors: Arc<RwLock<VecDeque<DebridError>>>,
    added: Arc<RwLock<Vec<String>>>,
    next_id: Arc<RwLock<u64>>,
    /// File ids reported by `torrent_info`.
    files: Arc<RwLock<Vec<u64>>>,
    selections: Arc<RwLock<Vec<(String, Vec<u64>)>>>,
    availability: Arc<RwLock<Value>>,
    failing_batches: Arc<RwLock<HashSet<usize>>>,
    batches: Arc<RwLock<Vec<Vec<String>>>>,
    active: Arc<RwLock<usize>>,
    list_error: Arc<RwLock<Option<DebridError>>>,
    list_calls: Arc<RwLock<usize>>,
}

impl Default for MockDebridClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDebridClient {
    pub fn new() -> Self {
        Self {
            user_error: Arc::new(RwLock::new(None)),
            user_calls: Arc::new(RwLock::new(0)),
            add_errors: Arc::new(RwLock::new(VecDeque::new())),
            added: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(1)),
            files: Arc::new(RwLock::new(Vec::new())),
            selections: Arc::new(RwLock::new(Vec::new())),
            availability: Arc::new(RwLock::new(json!({}))),
            failing_batches: Arc::new(RwLock::new(HashSet::new())),
            batches: Arc::new(RwLock::new(Vec::new())),
            active: Arc::new(RwLock::new(0)),
            list_error: Arc::new(RwLock::new(None)),
            list_calls: Arc::new(RwLock::new(0)),
        }
    }

    /// Make the connection probe fail.
    pub async fn set_user_error(&self, error: DebridError) {
        *self.user_error.write().await = Some(error);
    }

    pub async fn user_calls(&self) -> usize {
        *self.user_calls.read().await
    }

    /// Queue an error for the next `add_magnet` call.
    pub async fn push_add_error(&self, error: DebridError) {
        self.add_errors.write().await.push_back(error);
    }

    /// Magnets submitted so far, failed attempts included.
    pub async fn added_magnets(&self) -> Vec<String> {
        self.added.read().await.clone()
    }

    pub async fn set_files(&self, file_ids: Vec<u64>) {
        *self.files.write().await = file_ids;
    }

    pub async fn selections(&self) -> Vec<(String, Vec<u64>)> {
        self.selections.read().await.clone()
    }

    /// Report `hashes` as cached with a single video file each.
    pub async fn set_cached(&self, hashes: &[&str]) {
        let mut body = Map::new();
        for hash in hashes {
            body.insert(
                hash.to_string(),
                json!({"rd": [{"1": {"filename": "movie.2160p.mkv", "filesize": 1_000_000}}]}),
            );
        }
        *self.availability.write().await = Value::Object(body);
    }

    /// Raw instant-availability body, keyed by hash.
    pub async fn set_availability_body(&self, body: Value) {
        *self.availability.write().await = body;
    }

    /// Fail the availability request for the batch at `index` (0-based).
    pub async fn fail_availability_batch(&self, index: usize) {
        self.failing_batches.write().await.insert(index);
    }

    pub async fn availability_batches(&self) -> Vec<Vec<String>> {
        self.batches.read().await.clone()
    }

    /// Active torrents already on the account.
    pub async fn set_active_downloads(&self, count: usize) {
        *self.active.write().await = count;
    }

    pub async fn set_list_error(&self, error: DebridError) {
        *self.list_error.write().await = Some(error);
    }

    pub async fn list_calls(&self) -> usize {
        *self.list_calls.read().await
    }
}

#[async_trait]
impl DebridClient for MockDebridClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn user(&self) -> Result<UserInfo, DebridError> {
        *self.user_calls.write().await += 1;
        if let Some(e) = self.user_error.write().await.take() {
            return Err(e);
        }
        Ok(UserInfo {
            username: "mock-user".to_string(),
            premium: 30 * 86_400,
            account_type: Some("premium".to_string()),
            expiration: None,
        })
    }

    async fn add_magnet(&self, magnet: &str) -> Result<AddMagnetResult, DebridError> {
        self.added.write().await.push(magnet.to_string());
        if let Some(e) = self.add_errors.write().await.pop_front() {
            return Err(e);
        }
        let mut next_id = self.next_id.write().await;
        let id = format!("MOCK{}", *next_id);
        *next_id += 1;
        *self.active.write().await += 1;
        Ok(AddMagnetResult {
            id: id.clone(),
            uri: Some(format!("https://mock.debrid/torrents/info/{}", id)),
        })
    }

    async fn torrent_info(&self, id: &str) -> Result<TorrentDetails, DebridError> {
        let files = self
            .files
            .read()
            .await
            .iter()
            .map(|&file_id| RemoteFile {
                id: file_id,
                path: format!("/movie/file{}.mkv", file_id),
                bytes: 1_000,
                selected: 0,
            })
            .collect();
        Ok(TorrentDetails {
            id: id.to_string(),
            filename: "movie".to_string(),
            status: "waiting_files_selection".to_string(),
            files,
        })
    }

    async fn select_files(&self, id: &str, file_ids: &[u64]) -> Result<(), DebridError> {
        self.selections
            .write()
            .await
            .push((id.to_string(), file_ids.to_vec()));
        Ok(())
    }

    async fn instant_availability(&self, hashes: &[String]) -> Result<Availability, DebridError> {
        let index = {
            let mut batches = self.batches.write().await;
            batches.push(hashes.to_vec());
            batches.len() - 1
        };
        if self.failing_batches.read().await.contains(&index) {
            return Err(DebridError::Api {
                status: 503,
                code: None,
                message: "service unavailable".to_string(),
            });
        }
        let requested: HashSet<String> = hashes.iter().map(|h| h.to_lowercase()).collect();
        let mut availability = parse_availability(&*self.availability.read().await);
        availability.retain(|hash, _| requested.contains(hash));
        Ok(availability)
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentSummary>, DebridError> {
        *self.list_calls.write().await += 1;
        if let Some(e) = self.list_error.write().await.take() {
            return Err(e);
        }
        let active = *self.active.read().await;
        Ok((0..active)
            .map(|i| TorrentSummary {
                id: format!("ACTIVE{}", i),
                filename: format!("active-{}", i),
                hash: String::new(),
                status: "downloading".to_string(),
            })
            .collect())
    }
}
