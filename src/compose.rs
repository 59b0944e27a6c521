use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::disk::DiskBackend;
use crate::cache::memory::MemoryBackend;
use crate::cache::{CacheKey, CacheOp, Tier, TierStats, TieredCache};
use crate::config::{CacheConfig, PipelineConfig};
use crate::error::{Result, SamvadError};
use crate::executor::TranslationExecutor;
use crate::language::{LanguageRegistry, ScriptClass};
use crate::model::http::HttpModelBackend;
use crate::model::{ModelBackend, ModelManager, ModelSizeHint, ModelState, ProgressFn};
use crate::route::{route, TranslationPath};
use crate::script::{ScriptDetection, ScriptDetector};
use crate::translit::Transliterator;

/// The three views of one chat message: what the sender sees, what the
/// receiver sees, and the English semantic pivot. Never persisted here;
/// storage belongs to the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageViews {
    pub sender_view: String,
    pub receiver_view: String,
    pub english_pivot: String,
    pub path: TranslationPath,
    pub is_translated: bool,
}

/// Top-level entry point combining detection, transliteration, routing,
/// model translation and the tiered cache.
pub struct MessagePipeline {
    config: PipelineConfig,
    registry: Arc<LanguageRegistry>,
    detector: ScriptDetector,
    translit: Transliterator,
    model: Arc<ModelManager>,
    cache: Arc<TieredCache>,
    executor: TranslationExecutor,
    preview_generation: AtomicU64,
}

impl MessagePipeline {
    /// Pipeline speaking to an HTTP model endpoint per the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let backend = Arc::new(HttpModelBackend::new(config.model.clone())?);
        Self::with_backend(config, backend)
    }

    /// Pipeline over any model backend; tests substitute fakes here instead
    /// of touching process-wide state.
    pub fn with_backend(config: PipelineConfig, backend: Arc<dyn ModelBackend>) -> Result<Self> {
        let registry = Arc::new(LanguageRegistry::new());
        let detector = ScriptDetector::new(config.detect.min_confidence);
        let translit = Transliterator::new(detector.clone());
        let model = Arc::new(ModelManager::new(backend));
        let cache = Arc::new(build_cache(&config.cache)?);
        let executor = TranslationExecutor::new(
            model.clone(),
            cache.clone(),
            registry.clone(),
            config.model.max_retries,
        );

        Ok(Self {
            config,
            registry,
            detector,
            translit,
            model,
            cache,
            executor,
            preview_generation: AtomicU64::new(0),
        })
    }

    /// Produce the sender/receiver/pivot views for one message.
    ///
    /// Never fails for degraded infrastructure; on any recoverable trouble
    /// the original text is delivered to both parties untranslated. The only
    /// error is a blank language identifier.
    pub async fn compose_views(
        &self,
        text: &str,
        sender_language: &str,
        receiver_language: &str,
    ) -> Result<ChatMessageViews> {
        require_language("sender", sender_language)?;
        require_language("receiver", receiver_language)?;

        let detection = self.detect_cached(text).await;

        // Latin keystrokes into a native-script language become native
        // script; that form is the canonical one everywhere downstream.
        let sender_view = self.canonical_sender_view(text, sender_language, &detection).await;

        let path = route(
            self.registry.resolve(sender_language),
            self.registry.resolve(receiver_language),
        );

        let views = match path {
            TranslationPath::Passthrough => ChatMessageViews {
                receiver_view: sender_view.clone(),
                english_pivot: sender_view.clone(),
                sender_view,
                path,
                is_translated: false,
            },
            TranslationPath::Fallback => {
                let result = self
                    .executor
                    .execute(
                        &sender_view,
                        sender_language,
                        receiver_language,
                        path,
                        detection.guessed_language.clone(),
                    )
                    .await;
                ChatMessageViews {
                    receiver_view: result.text,
                    english_pivot: sender_view.clone(),
                    sender_view,
                    path,
                    is_translated: false,
                }
            }
            TranslationPath::DirectModel => {
                let result = self
                    .executor
                    .execute(
                        &sender_view,
                        sender_language,
                        receiver_language,
                        path,
                        detection.guessed_language.clone(),
                    )
                    .await;
                let english_pivot = if self.registry.is_english(sender_language) {
                    sender_view.clone()
                } else if self.registry.is_english(receiver_language) {
                    result.text.clone()
                } else {
                    sender_view.clone()
                };
                ChatMessageViews {
                    receiver_view: result.text,
                    english_pivot,
                    sender_view,
                    path,
                    is_translated: result.is_translated,
                }
            }
            TranslationPath::PivotThroughEnglish => {
                let result = self
                    .executor
                    .execute(
                        &sender_view,
                        sender_language,
                        receiver_language,
                        path,
                        detection.guessed_language.clone(),
                    )
                    .await;
                let english_pivot = result
                    .english_pivot
                    .clone()
                    .unwrap_or_else(|| sender_view.clone());
                ChatMessageViews {
                    receiver_view: result.text,
                    english_pivot,
                    sender_view,
                    path,
                    is_translated: result.is_translated,
                }
            }
        };

        Ok(views)
    }

    /// Fast, cache-backed preview for live input: Latin keystrokes are shown
    /// in the language's native script as they will be stored. Safe to call
    /// on every keystroke after debounce.
    pub async fn typing_preview(&self, text: &str, language: &str) -> Result<String> {
        require_language("preview", language)?;
        let detection = self.detect_cached(text).await;
        Ok(self.canonical_sender_view(text, language, &detection).await)
    }

    /// Debounced preview: waits out the configured window and yields `None`
    /// when a newer keystroke superseded this one (last write wins at the
    /// UI boundary).
    pub async fn typing_preview_debounced(&self, text: &str, language: &str) -> Result<Option<String>> {
        require_language("preview", language)?;
        let generation = self.preview_generation.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(Duration::from_millis(self.config.preview.debounce_ms)).await;
        if self.preview_generation.load(Ordering::SeqCst) != generation {
            return Ok(None);
        }
        self.typing_preview(text, language).await.map(Some)
    }

    /// Explicit warm-up hook; idempotent, attaches to a load already in
    /// flight.
    pub async fn load_model(&self, hint: ModelSizeHint, on_progress: Option<ProgressFn>) -> Result<bool> {
        self.model.load(hint, on_progress).await
    }

    pub async fn model_state(&self) -> ModelState {
        self.model.state().await
    }

    pub async fn unload_model(&self) -> Result<()> {
        self.model.unload().await
    }

    /// Drop one cached result from every tier, e.g. after a language-pack
    /// update.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.cache.invalidate(key).await;
    }

    pub async fn clear_cache(&self) -> u64 {
        info!("Clearing translation pipeline caches");
        self.cache.clear_all().await
    }

    pub async fn purge_expired(&self) -> u64 {
        self.cache.purge_expired().await
    }

    pub async fn cache_stats(&self) -> Vec<TierStats> {
        self.cache.stats().await
    }

    /// Script detection memoized through the cache; recoverable cache
    /// trouble falls back to computing inline.
    async fn detect_cached(&self, text: &str) -> ScriptDetection {
        let key = CacheKey::new(CacheOp::Detect, text, "", "");
        let fetched = self
            .cache
            .get_or_fetch(&key, || async move {
                let detection = self.detector.detect(text);
                serde_json::to_value(detection).map_err(SamvadError::from)
            })
            .await;

        match fetched.map(serde_json::from_value::<ScriptDetection>) {
            Ok(Ok(detection)) => detection,
            Ok(Err(e)) => {
                warn!("Discarding malformed cached detection: {}", e);
                self.detector.detect(text)
            }
            Err(e) => {
                warn!("Detection cache unavailable: {}", e);
                self.detector.detect(text)
            }
        }
    }

    /// Canonical stored form of the sender's text (step 1 of composition).
    async fn canonical_sender_view(
        &self,
        text: &str,
        sender_language: &str,
        detection: &ScriptDetection,
    ) -> String {
        let Some(profile) = self.registry.resolve(sender_language) else {
            return text.to_string();
        };
        if detection.class != ScriptClass::Latin || profile.script.is_latin() {
            return text.to_string();
        }

        let key = CacheKey::new(CacheOp::Transliterate, text, &profile.id, &profile.id);
        let fetched = self
            .cache
            .get_or_fetch(&key, || async move {
                let outcome = self.translit.to_native_script(text, profile);
                Ok(Value::String(outcome.text))
            })
            .await;

        match fetched {
            Ok(Value::String(converted)) => converted,
            Ok(_) => text.to_string(),
            Err(e) => {
                warn!("Transliteration cache unavailable: {}", e);
                self.translit.to_native_script(text, profile).text
            }
        }
    }
}

fn require_language(side: &str, identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        return Err(SamvadError::InvalidArgument(format!(
            "{} language identifier must not be blank",
            side
        )));
    }
    Ok(())
}

/// Tiers ordered fastest first: memory, then the per-process session
/// directory, then the long-term store.
fn build_cache(config: &CacheConfig) -> Result<TieredCache> {
    let mut tiers = vec![Tier::new(
        Arc::new(MemoryBackend::new(config.memory_capacity)) as Arc<dyn crate::cache::CacheBackend>,
        config.memory_ttl_secs,
    )];

    let root = PathBuf::from(&config.root_dir);

    if config.session_tier {
        let session_dir = root.join("session").join(Uuid::new_v4().to_string());
        tiers.push(Tier::new(
            Arc::new(DiskBackend::new("session", session_dir)?),
            config.session_ttl_secs,
        ));
    }

    if config.store_tier {
        tiers.push(Tier::new(
            Arc::new(DiskBackend::new("store", root.join("store"))?),
            config.store_ttl_secs,
        ));
    }

    Ok(TieredCache::new(tiers))
}
