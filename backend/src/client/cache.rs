//! Query cache shared by every client hook.
//!
//! Entries are keyed by procedure path plus input. Each entry carries a
//! fetch generation: [`QueryCache::cancel`] bumps it, and a fetch that
//! started under an older generation does not write its result.
//!
//! Mutation counters are kept per scope (a router name such as `budget`).
//! While a scope has mutations in flight, invalidation marks its queries
//! stale but does not refetch them.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::error::{ClientError, ClientResult};
use super::notifier::Notifier;
use super::transport::RpcTransport;
use crate::routes::router_of;

/// Cache key: a procedure and its input with `null` fields removed.
#[derive(Debug, Clone)]
pub struct QueryKey {
    procedure: String,
    input: Value,
    canonical: String,
}

impl QueryKey {
    pub fn new(procedure: &str, input: Value) -> Self {
        let input = strip_nulls(input);
        let canonical = input.to_string();
        Self {
            procedure: procedure.to_string(),
            input,
            canonical,
        }
    }

    pub fn of<I: Serialize>(procedure: &str, input: &I) -> ClientResult<Self> {
        Ok(Self::new(procedure, serde_json::to_value(input)?))
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn scope(&self) -> &str {
        router_of(&self.procedure)
    }

    /// Whether this key falls under `filter`: every field of the filter
    /// input must be present with the same value.
    pub fn matches(&self, procedure: &str, filter: Option<&Value>) -> bool {
        if self.procedure != procedure {
            return false;
        }
        match filter.map(|f| strip_nulls(f.clone())) {
            None => true,
            Some(Value::Object(fields)) => match &self.input {
                Value::Object(own) => fields.iter().all(|(k, v)| own.get(k) == Some(v)),
                _ => fields.is_empty(),
            },
            Some(other) => other == self.input,
        }
    }
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        self.procedure == other.procedure && self.canonical == other.canonical
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.procedure.hash(state);
        self.canonical.hash(state);
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            // Sorted so the canonical form does not depend on field order.
            let mut fields: Vec<(String, Value)> = map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(fields.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    data: Option<Value>,
    updated_at: Option<DateTime<Utc>>,
    stale: bool,
    generation: u64,
    /// Fetched at least once, so invalidation refetches it.
    observed: bool,
}

/// Decrements its scope's mutation counter when dropped.
pub struct MutationGuard {
    counts: Arc<RwLock<HashMap<String, usize>>>,
    scope: String,
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        let mut counts = self.counts.write();
        if let Some(count) = counts.get_mut(&self.scope) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&self.scope);
            }
        }
    }
}

pub struct QueryCache {
    transport: Arc<dyn RpcTransport>,
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    mutation_counts: Arc<RwLock<HashMap<String, usize>>>,
    notifier: Notifier,
}

impl QueryCache {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self::with_notifier(transport, Notifier::new())
    }

    pub fn with_notifier(transport: Arc<dyn RpcTransport>, notifier: Notifier) -> Self {
        Self {
            transport,
            entries: RwLock::new(HashMap::new()),
            mutation_counts: Arc::new(RwLock::new(HashMap::new())),
            notifier,
        }
    }

    pub fn transport(&self) -> &Arc<dyn RpcTransport> {
        &self.transport
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn get_data(&self, key: &QueryKey) -> Option<Value> {
        self.entries.read().get(key).and_then(|e| e.data.clone())
    }

    /// Cached data decoded as `T`. `None` when absent or of another shape.
    pub fn get_typed<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.get_data(key)
            .and_then(|data| serde_json::from_value(data).ok())
    }

    /// Every cached entry of `procedure` that holds data.
    pub fn get_all(&self, procedure: &str) -> Vec<(QueryKey, Value)> {
        self.entries
            .read()
            .iter()
            .filter(|(k, _)| k.procedure == procedure)
            .filter_map(|(k, e)| e.data.clone().map(|d| (k.clone(), d)))
            .collect()
    }

    pub fn updated_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries.read().get(key).and_then(|e| e.updated_at)
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.read().get(key).map_or(true, |e| e.stale || e.data.is_none())
    }

    /// Replace the data of `key`. `None` clears it.
    pub fn set_data(&self, key: &QueryKey, data: Option<Value>) {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_default();
        entry.updated_at = data.as_ref().map(|_| Utc::now());
        entry.data = data;
        entry.stale = false;
    }

    pub fn update_data<F>(&self, key: &QueryKey, update: F)
    where
        F: FnOnce(Option<Value>) -> Option<Value>,
    {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_default();
        let next = update(entry.data.take());
        entry.updated_at = next.as_ref().map(|_| Utc::now());
        entry.data = next;
        entry.stale = false;
    }

    /// Drop the result of any in-flight fetch of `procedure`.
    pub fn cancel(&self, procedure: &str) {
        let mut entries = self.entries.write();
        for (_, entry) in entries.iter_mut().filter(|(k, _)| k.procedure == procedure) {
            entry.generation += 1;
        }
    }

    pub fn begin_mutation(&self, scope: &str) -> MutationGuard {
        *self
            .mutation_counts
            .write()
            .entry(scope.to_string())
            .or_insert(0) += 1;
        MutationGuard {
            counts: Arc::clone(&self.mutation_counts),
            scope: scope.to_string(),
        }
    }

    pub fn mutations_in_flight(&self, scope: &str) -> usize {
        self.mutation_counts.read().get(scope).copied().unwrap_or(0)
    }

    /// Mark matching entries stale and refetch the observed ones whose
    /// scope is idle. Refetch failures go to the notifier.
    pub async fn invalidate(&self, procedure: &str, filter: Option<&Value>) {
        let to_refetch: Vec<QueryKey> = {
            let mut entries = self.entries.write();
            entries
                .iter_mut()
                .filter(|(k, _)| k.matches(procedure, filter))
                .filter_map(|(k, e)| {
                    e.stale = true;
                    e.observed.then(|| k.clone())
                })
                .collect()
        };

        for key in to_refetch {
            if self.mutations_in_flight(key.scope()) > 0 {
                continue;
            }
            // Errors were already reported by refetch.
            let _ = self.refetch(&key).await;
        }
    }

    /// Cached data when fresh, otherwise a fetch through the transport.
    /// While the scope has mutations in flight, existing data is served
    /// even when stale.
    pub async fn fetch(&self, key: &QueryKey) -> ClientResult<Value> {
        let cached = {
            let mut entries = self.entries.write();
            let entry = entries.entry(key.clone()).or_default();
            entry.observed = true;
            match &entry.data {
                Some(data) if !entry.stale => Some(data.clone()),
                Some(data) if self.mutations_in_flight(key.scope()) > 0 => Some(data.clone()),
                _ => None,
            }
        };
        match cached {
            Some(data) => Ok(data),
            None => self.refetch(key).await,
        }
    }

    /// Always go to the server. The result is stored only if the procedure
    /// was not cancelled meanwhile.
    pub async fn refetch(&self, key: &QueryKey) -> ClientResult<Value> {
        let generation = {
            let mut entries = self.entries.write();
            let entry = entries.entry(key.clone()).or_default();
            entry.observed = true;
            entry.generation
        };

        let result = self
            .transport
            .call(&key.procedure, key.input.clone())
            .await;

        match result {
            Ok(data) => {
                let mut entries = self.entries.write();
                let entry = entries.entry(key.clone()).or_default();
                if entry.generation != generation {
                    tracing::debug!(procedure = %key.procedure, "discarding cancelled fetch");
                    return Err(ClientError::Cancelled);
                }
                entry.data = Some(data.clone());
                entry.updated_at = Some(Utc::now());
                entry.stale = false;
                Ok(data)
            }
            Err(err) => {
                self.notifier.error(&err.message());
                Err(err)
            }
        }
    }

    pub async fn query<I, O>(&self, procedure: &str, input: &I) -> ClientResult<O>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let key = QueryKey::of(procedure, input)?;
        let data = self.fetch(&key).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// A call with no cache effects. Failures go to the notifier.
    pub async fn mutate<I, O>(&self, procedure: &str, input: &I) -> ClientResult<O>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input)?;
        match self.transport.call(procedure, input).await {
            Ok(data) => Ok(serde_json::from_value(data)?),
            Err(err) => {
                self.notifier.error(&err.message());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rpc::{Envelope, ErrorCode, ProcedureError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    /// Replies from a script and records every call. When `gate` is set,
    /// each call waits for a notification before answering.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        pub replies: Mutex<VecDeque<Result<Value, ProcedureError>>>,
        pub calls: Mutex<Vec<(String, Value)>>,
        pub gate: Option<Arc<Notify>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(replies: Vec<Result<Value, ProcedureError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        pub(crate) fn paths(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(p, _)| p.clone()).collect()
        }
    }

    #[async_trait]
    impl RpcTransport for ScriptedTransport {
        async fn batch(&self, calls: Vec<(String, Value)>) -> ClientResult<Vec<Envelope>> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let mut out = Vec::new();
            for (path, input) in calls {
                self.calls.lock().push((path.clone(), input));
                let reply = self
                    .replies
                    .lock()
                    .pop_front()
                    .unwrap_or(Ok(Value::Null));
                out.push(Envelope::from_result(&path, reply));
            }
            Ok(out)
        }
    }

    fn cache(replies: Vec<Result<Value, ProcedureError>>) -> (Arc<ScriptedTransport>, QueryCache) {
        let transport = Arc::new(ScriptedTransport::new(replies));
        let cache = QueryCache::new(transport.clone());
        (transport, cache)
    }

    #[test]
    fn test_key_ignores_nulls() {
        let a = QueryKey::new("supplierInvoice.getSupplierInvoices", json!({ "projectId": "p1" }));
        let b = QueryKey::new(
            "supplierInvoice.getSupplierInvoices",
            json!({ "projectId": "p1", "approved": null }),
        );
        assert_eq!(a, b);
        assert_eq!(a.scope(), "supplierInvoice");
    }

    #[test]
    fn test_partial_match() {
        let key = QueryKey::new("s3.fetchS3BucketContents", json!({ "projectId": "p1", "prefix": "/" }));
        assert!(key.matches("s3.fetchS3BucketContents", None));
        assert!(key.matches("s3.fetchS3BucketContents", Some(&json!({ "projectId": "p1" }))));
        assert!(!key.matches("s3.fetchS3BucketContents", Some(&json!({ "projectId": "p2" }))));
        assert!(!key.matches("task.getTasks", None));
    }

    #[tokio::test]
    async fn test_fetch_uses_fresh_data() {
        let (transport, cache) = cache(vec![Ok(json!([1])), Ok(json!([1, 2]))]);
        let key = QueryKey::new("project.getProjects", Value::Null);

        assert_eq!(cache.fetch(&key).await.unwrap(), json!([1]));
        assert_eq!(cache.fetch(&key).await.unwrap(), json!([1]));
        assert_eq!(transport.paths().len(), 1);

        cache.invalidate("project.getProjects", None).await;
        assert_eq!(cache.get_data(&key), Some(json!([1, 2])));
        assert_eq!(transport.paths().len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_skips_busy_scope() {
        let (transport, cache) = cache(vec![Ok(json!([1])), Ok(json!([]))]);
        let key = QueryKey::new("project.getProjects", Value::Null);
        cache.fetch(&key).await.unwrap();

        let guard = cache.begin_mutation("project");
        cache.invalidate("project.getProjects", None).await;
        assert_eq!(transport.paths().len(), 1);
        assert!(cache.is_stale(&key));
        // Stale data is served while the scope is busy.
        assert_eq!(cache.fetch(&key).await.unwrap(), json!([1]));

        drop(guard);
        assert_eq!(cache.mutations_in_flight("project"), 0);
        assert_eq!(cache.fetch(&key).await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_unobserved_entries_are_not_refetched() {
        let (transport, cache) = cache(vec![]);
        let key = QueryKey::new("budget.getBudgets", json!({ "projectId": "p1" }));
        cache.set_data(&key, Some(json!({ "budgets": [], "count": 0 })));
        cache.invalidate("budget.getBudgets", None).await;
        assert!(transport.paths().is_empty());
        assert!(cache.is_stale(&key));
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_result() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport {
            replies: Mutex::new(vec![Ok(json!(["server"]))].into()),
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let cache = QueryCache::new(transport.clone());
        let key = QueryKey::new("project.getProjects", Value::Null);

        let fetch = cache.refetch(&key);
        let cancel_then_release = async {
            tokio::task::yield_now().await;
            cache.cancel("project.getProjects");
            cache.set_data(&key, Some(json!(["optimistic"])));
            gate.notify_one();
        };
        let (result, ()) = tokio::join!(fetch, cancel_then_release);

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(cache.get_data(&key), Some(json!(["optimistic"])));
    }

    #[tokio::test]
    async fn test_errors_reach_notifier() {
        let (_, cache) = cache(vec![Err(ProcedureError::new(
            ErrorCode::NotFound,
            "Failed to get task",
        ))]);
        let err = cache
            .query::<_, Value>("task.getTask", &json!({ "taskId": "t" }))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Failed to get task");
        let notes = cache.notifier().notifications();
        assert_eq!(notes[0].message, "Error: Failed to get task");
    }
}
