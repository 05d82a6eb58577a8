#![allow(dead_code)]

#[cfg(feature = "http-server")]
pub mod http;

use async_trait::async_trait;
use object_store::memory::InMemory;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use buildtrack::db::LocalRepository;
use buildtrack::rpc::Services;
use buildtrack::services::extraction::{ExtractionError, ExtractionResult};
use buildtrack::services::{FileStorage, InvoiceExtractor, LanguageModel};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to the process
/// environment, since tests run in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// In-memory repository and object store.
pub fn services() -> Services {
    Services::new(
        Arc::new(LocalRepository::new()),
        FileStorage::new(Arc::new(InMemory::new())),
    )
}

/// Replays canned completions in order.
pub struct CannedModel {
    replies: Mutex<Vec<String>>,
}

impl CannedModel {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
        }
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    async fn complete(&self, _prompt: &str) -> ExtractionResult<String> {
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or(ExtractionError::EmptyCompletion)
    }
}

pub fn with_model(services: Services, replies: &[&str]) -> Services {
    let extractor = InvoiceExtractor::new(Arc::new(CannedModel::new(replies))).unwrap();
    services.with_extractor(Arc::new(extractor))
}
