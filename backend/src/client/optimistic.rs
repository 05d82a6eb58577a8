//! Optimistic mutations against the query cache.
//!
//! The sequence is: cancel → snapshot → speculative edit → server call →
//! (failure: restore snapshot) or (success: reconcile) → invalidate.
//! Edits are typed closures over the cached value; a cached value that does
//! not decode as the edit's type is left untouched.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::cache::{QueryCache, QueryKey};
use super::error::ClientResult;

type Edit = Box<dyn FnOnce(Option<Value>) -> Option<Value> + Send>;
type Reconcile = Box<dyn FnOnce(Option<Value>, &Value) -> Option<Value> + Send>;

fn typed_edit<T, F>(edit: F) -> Edit
where
    T: DeserializeOwned + Serialize + 'static,
    F: FnOnce(Option<T>) -> Option<T> + Send + 'static,
{
    Box::new(move |current: Option<Value>| match current {
        None => edit(None).and_then(|next| serde_json::to_value(next).ok()),
        Some(raw) => match serde_json::from_value::<T>(raw.clone()) {
            Ok(typed) => match edit(Some(typed)) {
                Some(next) => serde_json::to_value(next).ok().or(Some(raw)),
                None => None,
            },
            Err(_) => Some(raw),
        },
    })
}

pub struct OptimisticMutation {
    procedure: String,
    input: Value,
    scope: Option<String>,
    cancels: Vec<String>,
    edits: Vec<(QueryKey, Edit)>,
    reconciles: Vec<(QueryKey, Reconcile)>,
    invalidations: Vec<(String, Option<Value>)>,
    success_message: Option<String>,
}

impl OptimisticMutation {
    pub fn new<I: Serialize>(procedure: &str, input: &I) -> ClientResult<Self> {
        Ok(Self {
            procedure: procedure.to_string(),
            input: serde_json::to_value(input)?,
            scope: None,
            cancels: Vec::new(),
            edits: Vec::new(),
            reconciles: Vec::new(),
            invalidations: Vec::new(),
            success_message: None,
        })
    }

    /// Count this mutation against `scope` until it settles.
    pub fn scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    pub fn cancel(mut self, procedure: &str) -> Self {
        self.cancels.push(procedure.to_string());
        self
    }

    /// Speculative change applied before the call and rolled back on error.
    pub fn edit<T, F>(mut self, key: QueryKey, edit: F) -> Self
    where
        T: DeserializeOwned + Serialize + 'static,
        F: FnOnce(Option<T>) -> Option<T> + Send + 'static,
    {
        self.edits.push((key, typed_edit(edit)));
        self
    }

    /// Change applied with the server's response once the call succeeds.
    pub fn reconcile<T, O, F>(mut self, key: QueryKey, reconcile: F) -> Self
    where
        T: DeserializeOwned + Serialize + 'static,
        O: DeserializeOwned + Send + 'static,
        F: FnOnce(Option<T>, O) -> Option<T> + Send + 'static,
    {
        let wrapped: Reconcile = Box::new(move |current: Option<Value>, response: &Value| {
            match serde_json::from_value::<O>(response.clone()) {
                Ok(response) => typed_edit(move |cached: Option<T>| reconcile(cached, response))(current),
                Err(_) => current,
            }
        });
        self.reconciles.push((key, wrapped));
        self
    }

    /// Refetch matching queries once the mutation settles.
    pub fn invalidate(mut self, procedure: &str, filter: Option<Value>) -> Self {
        self.invalidations.push((procedure.to_string(), filter));
        self
    }

    pub fn notify_success(mut self, message: &str) -> Self {
        self.success_message = Some(message.to_string());
        self
    }

    pub async fn run<O: DeserializeOwned>(self, cache: &QueryCache) -> ClientResult<O> {
        let guard = self.scope.as_deref().map(|scope| cache.begin_mutation(scope));

        for procedure in &self.cancels {
            cache.cancel(procedure);
        }

        let snapshot: Vec<(QueryKey, Option<Value>)> = self
            .edits
            .iter()
            .map(|(key, _)| (key.clone(), cache.get_data(key)))
            .collect();
        for (key, edit) in self.edits {
            cache.update_data(&key, edit);
        }

        // A response that does not decode counts as a failed call.
        let outcome = cache
            .transport()
            .call(&self.procedure, self.input)
            .await
            .and_then(|response| {
                let output = serde_json::from_value::<O>(response.clone())?;
                Ok((response, output))
            });
        let outcome = match outcome {
            Err(err) => {
                for (key, data) in snapshot.into_iter().rev() {
                    cache.set_data(&key, data);
                }
                cache.notifier().error(&err.message());
                Err(err)
            }
            Ok((response, output)) => {
                for (key, reconcile) in self.reconciles {
                    cache.update_data(&key, |current| reconcile(current, &response));
                }
                if let Some(message) = &self.success_message {
                    cache.notifier().success(message);
                }
                Ok(output)
            }
        };

        drop(guard);
        for (procedure, filter) in &self.invalidations {
            cache.invalidate(procedure, filter.as_ref()).await;
        }
        outcome
    }
}
