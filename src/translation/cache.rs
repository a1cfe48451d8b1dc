/*!
 * Model handle caching.
 *
 * Loading a model is expensive, so every backend keeps its loaded models in
 * `ModelHandle`s. A handle loads lazily on first use, at most once even
 * under concurrent first use, and stays until it is invalidated explicitly.
 * `ModelCache` owns one handle per backend and model name and lives in the
 * pipeline configuration.
 */

use log::debug;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::providers::BackendId;

/// A model a backend has loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedModel {
    /// Model name as reported by the backend
    pub model: String,
    /// Device the model runs on, when the backend reports it
    pub device: Option<String>,
}

impl LoadedModel {
    pub fn new(model: impl Into<String>, device: Option<String>) -> Self {
        Self {
            model: model.into(),
            device,
        }
    }
}

/// Lazily initialized, explicitly invalidated model slot
#[derive(Debug)]
pub struct ModelHandle {
    /// Backend owning this handle
    backend: BackendId,
    /// Model name the handle loads
    name: String,
    /// Loaded model, if any
    slot: RwLock<Option<Arc<LoadedModel>>>,
    /// Serializes initialization
    init_lock: Mutex<()>,
    /// Number of completed loads
    loads: AtomicUsize,
}

impl ModelHandle {
    /// Create an empty handle
    pub fn new(backend: BackendId, name: impl Into<String>) -> Self {
        Self {
            backend,
            name: name.into(),
            slot: RwLock::new(None),
            init_lock: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Get the loaded model, running `load` if nothing is loaded yet.
    ///
    /// Concurrent callers wait for the first load instead of starting their
    /// own. A failed load leaves the handle empty so a later call retries.
    pub async fn get_or_load<F, Fut, E>(&self, load: F) -> Result<Arc<LoadedModel>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<LoadedModel, E>>,
    {
        if let Some(model) = self.current() {
            return Ok(model);
        }

        let _guard = self.init_lock.lock().await;
        if let Some(model) = self.current() {
            debug!("Model '{}' for {} loaded by a concurrent caller", self.name, self.backend);
            return Ok(model);
        }

        let model = Arc::new(load().await?);
        self.loads.fetch_add(1, Ordering::SeqCst);
        *self.slot.write() = Some(Arc::clone(&model));
        debug!("Loaded model '{}' for {}", model.model, self.backend);

        Ok(model)
    }

    /// Model name this handle was created for
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Currently loaded model
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.slot.read().clone()
    }

    /// Whether a model is loaded
    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Drop the loaded model; the next use loads again
    pub fn invalidate(&self) {
        if self.slot.write().take().is_some() {
            debug!("Invalidated model '{}' for {}", self.name, self.backend);
        }
    }

    /// Number of loads performed over the handle's lifetime
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

/// Model handles by backend and model name
#[derive(Debug, Clone, Default)]
pub struct ModelCache {
    handles: Arc<RwLock<HashMap<(BackendId, String), Arc<ModelHandle>>>>,
}

impl ModelCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for one model of a backend, created on first request
    pub fn handle(&self, backend: BackendId, model: &str) -> Arc<ModelHandle> {
        let key = (backend, model.to_string());
        if let Some(handle) = self.handles.read().get(&key) {
            return Arc::clone(handle);
        }

        let mut handles = self.handles.write();
        Arc::clone(
            handles
                .entry(key)
                .or_insert_with(|| Arc::new(ModelHandle::new(backend, model))),
        )
    }

    /// Invalidate every model of one backend
    pub fn invalidate(&self, backend: BackendId) {
        for ((id, _), handle) in self.handles.read().iter() {
            if *id == backend {
                handle.invalidate();
            }
        }
    }

    /// Invalidate every model
    pub fn invalidate_all(&self) {
        for handle in self.handles.read().values() {
            handle.invalidate();
        }
    }

    /// Loaded models, sorted by backend then model name
    pub fn loaded(&self) -> Vec<(BackendId, Arc<LoadedModel>)> {
        let mut loaded: Vec<_> = self
            .handles
            .read()
            .iter()
            .filter_map(|((id, name), handle)| handle.current().map(|m| (*id, name.clone(), m)))
            .collect();
        loaded.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        loaded.into_iter().map(|(id, _, model)| (id, model)).collect()
    }
}
