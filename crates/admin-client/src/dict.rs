//! Dictionary item cache with request coalescing.
//!
//! Items are looked up in memory first, then in the in-flight table, and only
//! then fetched. The three checks and the in-flight insert happen under one
//! synchronous lock, so concurrent callers for the same code share a single
//! network round-trip. Results are mirrored to the durable storage tier as a
//! `code -> items` JSON map and reloaded eagerly on construction.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};

use crate::api::dict::items_path;
use crate::error::ApiError;
use crate::http::envelope::string_or_number;
use crate::http::{ApiClient, ApiRequest};
use crate::session::SessionResource;
use crate::storage::{Storage, keys};

/// One selectable entry of a dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictItem {
    pub label: String,
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default)]
    pub sort: i32,
    /// `1` enabled, `0` disabled.
    #[serde(default = "default_status")]
    pub status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

fn default_status() -> i32 {
    1
}

impl DictItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            sort: 0,
            status: default_status(),
            tag_type: None,
            remark: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status == 1
    }
}

pub type DictItems = Arc<Vec<DictItem>>;

type PendingLoad = Shared<BoxFuture<'static, Result<DictItems, ApiError>>>;

struct InFlight {
    load_id: u64,
    pending: PendingLoad,
}

#[derive(Default)]
struct DictState {
    entries: HashMap<String, DictItems>,
    /// A fetch only settles the entry carrying its own `load_id`; evicting a
    /// code removes its entry so the late result is not stored.
    in_flight: HashMap<String, InFlight>,
    next_load_id: u64,
}

struct DictShared {
    client: ApiClient,
    storage: Storage,
    state: Mutex<DictState>,
}

#[derive(Clone)]
pub struct DictCache {
    shared: Arc<DictShared>,
}

impl DictCache {
    /// Creates the cache and loads any persisted entries.
    pub fn new(client: ApiClient, storage: Storage) -> Self {
        let entries = load_persisted(&storage);
        if !entries.is_empty() {
            tracing::debug!(codes = entries.len(), "Restored dictionary cache");
        }
        Self {
            shared: Arc::new(DictShared {
                client,
                storage,
                state: Mutex::new(DictState {
                    entries,
                    ..DictState::default()
                }),
            }),
        }
    }

    /// Items of dictionary `code`, fetched at most once until evicted.
    pub async fn load_items(&self, code: &str) -> Result<DictItems, ApiError> {
        let pending = {
            let mut state = self.shared.lock();
            if let Some(items) = state.entries.get(code) {
                tracing::debug!(code, "Dictionary cache hit");
                return Ok(items.clone());
            }
            match state.in_flight.get(code) {
                Some(load) => {
                    tracing::debug!(code, "Joining in-flight dictionary load");
                    load.pending.clone()
                }
                None => {
                    tracing::debug!(code, "Dictionary cache miss");
                    state.next_load_id += 1;
                    let load_id = state.next_load_id;
                    let pending = fetch(self.shared.clone(), code.to_string(), load_id)
                        .boxed()
                        .shared();
                    state.in_flight.insert(
                        code.to_string(),
                        InFlight {
                            load_id,
                            pending: pending.clone(),
                        },
                    );
                    pending
                }
            }
        };
        pending.await
    }

    /// Cached items of `code` without touching the network.
    pub fn cached(&self, code: &str) -> Option<DictItems> {
        self.shared.lock().entries.get(code).cloned()
    }

    /// Evicts `code` from memory and from the persisted blob.
    pub fn remove(&self, code: &str) {
        let mut state = self.shared.lock();
        state.in_flight.remove(code);
        if state.entries.remove(code).is_some() {
            self.shared.persist(&state.entries);
        }
        tracing::debug!(code, "Evicted dictionary");
    }

    pub fn clear(&self) {
        self.shared.clear();
    }

    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Teardown handle for this cache.
    pub fn resource(&self) -> Arc<dyn SessionResource> {
        self.shared.clone()
    }
}

impl DictShared {
    fn lock(&self) -> MutexGuard<'_, DictState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.in_flight.clear();
        state.entries.clear();
        self.storage.durable().remove(keys::DICT_CACHE);
    }

    fn persist(&self, entries: &HashMap<String, DictItems>) {
        if entries.is_empty() {
            self.storage.durable().remove(keys::DICT_CACHE);
            return;
        }
        let blob: BTreeMap<&str, &[DictItem]> = entries
            .iter()
            .map(|(code, items)| (code.as_str(), items.as_slice()))
            .collect();
        match serde_json::to_string(&blob) {
            Ok(json) => self.storage.durable().set(keys::DICT_CACHE, json),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize dictionary cache"),
        }
    }
}

impl SessionResource for DictShared {
    fn clear_for_logout(&self) {
        self.clear();
    }
}

async fn fetch(shared: Arc<DictShared>, code: String, load_id: u64) -> Result<DictItems, ApiError> {
    let result = shared
        .client
        .send::<Vec<DictItem>>(ApiRequest::get(items_path(&code)))
        .await
        .map(Arc::new);

    let mut state = shared.lock();
    let owns_entry = state
        .in_flight
        .get(&code)
        .is_some_and(|load| load.load_id == load_id);
    if !owns_entry {
        tracing::debug!(code = %code, "Dropping dictionary load superseded by eviction");
        return result;
    }
    state.in_flight.remove(&code);
    if let Ok(items) = &result {
        state.entries.insert(code, items.clone());
        shared.persist(&state.entries);
    }
    result
}

fn load_persisted(storage: &Storage) -> HashMap<String, DictItems> {
    let Some(blob) = storage.durable().get(keys::DICT_CACHE) else {
        return HashMap::new();
    };
    match serde_json::from_str::<HashMap<String, Vec<DictItem>>>(&blob) {
        Ok(entries) => entries
            .into_iter()
            .map(|(code, items)| (code, Arc::new(items)))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding corrupt dictionary cache");
            storage.durable().remove(keys::DICT_CACHE);
            HashMap::new()
        }
    }
}
