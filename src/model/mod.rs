// Lifecycle management for the heavyweight translation model.
//
// The manager is an explicitly owned handle, not a process-wide global:
// construct it from any `ModelBackend` and share it behind an `Arc`. At most
// one load is ever in flight; late callers attach to the running load.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::error::{Result, SamvadError};

/// Footprint hint used to pick a concrete model from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelSizeHint {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub name: String,
    pub size_hint: ModelSizeHint,
    pub size_mb: f64,
}

/// Multilingual models the pipeline knows how to request, smallest first.
pub fn available_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec {
            name: "qwen2.5:1.5b".to_string(),
            size_hint: ModelSizeHint::Small,
            size_mb: 986.0,
        },
        ModelSpec {
            name: "llama3.2:3b".to_string(),
            size_hint: ModelSizeHint::Medium,
            size_mb: 2048.0,
        },
        ModelSpec {
            name: "aya-expanse:8b".to_string(),
            size_hint: ModelSizeHint::Large,
            size_mb: 5072.0,
        },
    ]
}

pub fn spec_for(hint: ModelSizeHint) -> ModelSpec {
    let models = available_models();
    models
        .iter()
        .find(|m| m.size_hint == hint)
        .cloned()
        // The catalog always carries a medium entry; fall back defensively
        .or_else(|| models.first().cloned())
        .unwrap_or(ModelSpec {
            name: "llama3.2:3b".to_string(),
            size_hint: ModelSizeHint::Medium,
            size_mb: 2048.0,
        })
}

/// Observer for load progress, 0..=100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Clamps and monotonizes progress before it reaches any observer: values
/// above 100 are capped, regressions and repeats are dropped.
pub struct ProgressSink {
    last: std::sync::Mutex<Option<u8>>,
    observer: Option<ProgressFn>,
}

impl ProgressSink {
    pub fn new(observer: Option<ProgressFn>) -> Self {
        Self {
            last: std::sync::Mutex::new(None),
            observer,
        }
    }

    pub fn report(&self, pct: u8) {
        let pct = pct.min(100);
        {
            let mut last = match self.last.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(prev) = *last {
                if pct <= prev {
                    return;
                }
            }
            *last = Some(pct);
        }
        if let Some(observer) = &self.observer {
            observer(pct);
        }
    }
}

/// Process-wide lifecycle of the translation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelState {
    Unloaded,
    Loading(u8),
    Ready,
    Error(String),
}

/// Backend actually holding the model: pulls it on `prepare`, serves
/// inference on `translate`. Implementations must be cheap to construct;
/// the heavy work happens in `prepare`.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn prepare(&self, spec: &ModelSpec, progress: &ProgressSink) -> Result<()>;
    async fn translate(&self, text: &str, source_name: &str, target_name: &str) -> Result<String>;
    async fn release(&self) -> Result<()>;
}

enum LifecyclePhase {
    Unloaded,
    Loading,
    Ready,
    Error(String),
}

type LoadResult = std::result::Result<(), String>;

struct ManagerInner {
    phase: LifecyclePhase,
    inflight: Option<watch::Receiver<Option<LoadResult>>>,
}

pub struct ModelManager {
    backend: Arc<dyn ModelBackend>,
    inner: Mutex<ManagerInner>,
    progress: Arc<AtomicU8>,
}

impl ModelManager {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(ManagerInner {
                phase: LifecyclePhase::Unloaded,
                inflight: None,
            }),
            progress: Arc::new(AtomicU8::new(0)),
        }
    }

    pub async fn state(&self) -> ModelState {
        let inner = self.inner.lock().await;
        match &inner.phase {
            LifecyclePhase::Unloaded => ModelState::Unloaded,
            LifecyclePhase::Loading => ModelState::Loading(self.progress.load(Ordering::SeqCst)),
            LifecyclePhase::Ready => ModelState::Ready,
            LifecyclePhase::Error(message) => ModelState::Error(message.clone()),
        }
    }

    pub async fn is_ready(&self) -> bool {
        matches!(self.state().await, ModelState::Ready)
    }

    /// Idempotent load. Returns `Ok(true)` once the model is ready, whether
    /// this call performed the load, attached to a running one, or found it
    /// already loaded. A failed load surfaces as `ModelUnavailable` and
    /// leaves the manager in `Error` until the next retry.
    pub async fn load(&self, hint: ModelSizeHint, on_progress: Option<ProgressFn>) -> Result<bool> {
        enum LoadAction {
            AlreadyReady,
            Attach(watch::Receiver<Option<LoadResult>>),
            Lead(watch::Sender<Option<LoadResult>>),
        }

        let action = {
            let mut inner = self.inner.lock().await;
            if matches!(inner.phase, LifecyclePhase::Ready) {
                LoadAction::AlreadyReady
            } else {
                let attach = match inner.phase {
                    LifecyclePhase::Loading => inner.inflight.clone(),
                    _ => None,
                };
                match attach {
                    Some(rx) => LoadAction::Attach(rx),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        inner.phase = LifecyclePhase::Loading;
                        inner.inflight = Some(rx);
                        self.progress.store(0, Ordering::SeqCst);
                        LoadAction::Lead(tx)
                    }
                }
            }
        };

        let tx = match action {
            LoadAction::AlreadyReady => return Ok(true),
            LoadAction::Attach(rx) => return self.await_attached(rx).await,
            LoadAction::Lead(tx) => tx,
        };

        let spec = spec_for(hint);
        info!("Loading translation model {} ({:.0} MB)", spec.name, spec.size_mb);

        let progress_state = self.progress.clone();
        let sink = ProgressSink::new(Some(Arc::new(move |pct: u8| {
            progress_state.store(pct, Ordering::SeqCst);
            if let Some(observer) = &on_progress {
                observer(pct);
            }
        })));

        let outcome = self.backend.prepare(&spec, &sink).await;

        {
            let mut inner = self.inner.lock().await;
            inner.inflight = None;
            inner.phase = match &outcome {
                Ok(()) => LifecyclePhase::Ready,
                Err(e) => LifecyclePhase::Error(e.to_string()),
            };
        }

        match outcome {
            Ok(()) => {
                let _ = tx.send(Some(Ok(())));
                info!("Translation model {} ready", spec.name);
                Ok(true)
            }
            Err(e) => {
                let message = e.to_string();
                let _ = tx.send(Some(Err(message.clone())));
                warn!("Translation model load failed: {}", message);
                Err(SamvadError::ModelUnavailable(message))
            }
        }
    }

    async fn await_attached(
        &self,
        mut rx: watch::Receiver<Option<LoadResult>>,
    ) -> Result<bool> {
        loop {
            let current = rx.borrow().clone();
            if let Some(result) = current {
                return result
                    .map(|_| true)
                    .map_err(SamvadError::ModelUnavailable);
            }
            if rx.changed().await.is_err() {
                return Err(SamvadError::ModelUnavailable(
                    "model load abandoned without a result".to_string(),
                ));
            }
        }
    }

    /// Tear down an idle model. Loading must finish (or fail) first.
    pub async fn unload(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.phase {
            LifecyclePhase::Loading => Err(SamvadError::Model(
                "cannot unload while a load is in flight".to_string(),
            )),
            _ => {
                inner.phase = LifecyclePhase::Unloaded;
                self.progress.store(0, Ordering::SeqCst);
                drop(inner);
                self.backend.release().await?;
                info!("Translation model unloaded");
                Ok(())
            }
        }
    }

    /// Translate through the backend, loading the model first if needed.
    /// A model that cannot be made ready surfaces as `ModelUnavailable`,
    /// never as a silent wrong answer.
    pub async fn translate(&self, text: &str, source_name: &str, target_name: &str) -> Result<String> {
        if !self.is_ready().await {
            self.load(ModelSizeHint::Medium, None).await?;
        }
        self.backend.translate(text, source_name, target_name).await
    }
}
