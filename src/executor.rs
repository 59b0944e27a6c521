use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheOp, TieredCache};
use crate::error::{Result, SamvadError};
use crate::language::{LanguageProfile, LanguageRegistry, ScriptClass};
use crate::model::ModelManager;
use crate::route::TranslationPath;
use crate::script::classify_char;

/// Why a translation was delivered degraded instead of translated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DegradeReason {
    ModelUnavailable(String),
    UnresolvedLanguage(String),
    /// Both sides resolved but no translation strategy covers the pair
    NoCapability,
    EmptyOutput,
    /// The model answered but the output failed the quality check
    QualityRejected,
    Backend(String),
}

/// Every degraded path is an explicit, loggable outcome rather than a
/// swallowed error; message flow is never interrupted by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TranslationOutcome {
    Full,
    Degraded(DegradeReason),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
    pub original_text: String,
    pub source_language: String,
    pub target_language: String,
    pub path: TranslationPath,
    pub is_translated: bool,
    pub detected_language: Option<String>,
    /// 0..=1; product of per-leg quality on pivot paths
    pub confidence: f64,
    /// Intermediate English text on pivot paths
    pub english_pivot: Option<String>,
    pub outcome: TranslationOutcome,
}

/// Coarse quality signal for one model invocation, assessed from the output
/// itself: emptiness, echoing, length blow-up and script alignment with the
/// target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationQuality {
    Perfect,
    Good,
    Bad,
    Invalid,
}

impl TranslationQuality {
    pub fn assess(original: &str, translated: &str, target: &LanguageProfile) -> Self {
        let trimmed = translated.trim();
        if trimmed.is_empty() {
            return Self::Invalid;
        }
        if trimmed == original.trim() {
            return Self::Bad;
        }

        let ratio = translated.chars().count() as f64 / original.chars().count().max(1) as f64;
        if !(0.2..=5.0).contains(&ratio) {
            return Self::Bad;
        }

        let mut letters = 0usize;
        let mut aligned = 0usize;
        for c in translated.chars() {
            if let Some(script) = classify_char(c) {
                letters += 1;
                let matches_target = match target.script.class() {
                    ScriptClass::Latin => script.is_latin(),
                    ScriptClass::Native => script == target.script,
                };
                if matches_target {
                    aligned += 1;
                }
            }
        }
        if letters == 0 {
            return Self::Good;
        }

        let share = aligned as f64 / letters as f64;
        if share < 0.5 {
            Self::Bad
        } else if share > 0.9 && (0.5..=2.5).contains(&ratio) {
            Self::Perfect
        } else {
            Self::Good
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Self::Perfect => 0.95,
            Self::Good => 0.8,
            Self::Bad => 0.4,
            Self::Invalid => 0.0,
        }
    }

    pub fn is_acceptable(&self) -> bool {
        matches!(self, Self::Perfect | Self::Good | Self::Bad)
    }
}

/// Performs the model invocations a routed path calls for, every one of
/// them through the cache's single-flight fetch.
pub struct TranslationExecutor {
    model: Arc<ModelManager>,
    cache: Arc<TieredCache>,
    registry: Arc<LanguageRegistry>,
    max_retries: u32,
}

impl TranslationExecutor {
    pub fn new(
        model: Arc<ModelManager>,
        cache: Arc<TieredCache>,
        registry: Arc<LanguageRegistry>,
        max_retries: u32,
    ) -> Self {
        Self {
            model,
            cache,
            registry,
            max_retries,
        }
    }

    pub async fn execute(
        &self,
        text: &str,
        source_id: &str,
        target_id: &str,
        path: TranslationPath,
        detected_language: Option<String>,
    ) -> TranslationResult {
        match path {
            TranslationPath::Passthrough => TranslationResult {
                text: text.to_string(),
                original_text: text.to_string(),
                source_language: source_id.to_string(),
                target_language: target_id.to_string(),
                path,
                is_translated: false,
                detected_language,
                confidence: 1.0,
                english_pivot: None,
                outcome: TranslationOutcome::Full,
            },
            TranslationPath::Fallback => {
                let reason = if self.registry.resolve(source_id).is_none() {
                    DegradeReason::UnresolvedLanguage(source_id.to_string())
                } else if self.registry.resolve(target_id).is_none() {
                    DegradeReason::UnresolvedLanguage(target_id.to_string())
                } else {
                    DegradeReason::NoCapability
                };
                self.degraded(text, source_id, target_id, path, detected_language, None, reason)
            }
            TranslationPath::DirectModel => {
                self.execute_direct(text, source_id, target_id, detected_language).await
            }
            TranslationPath::PivotThroughEnglish => {
                self.execute_pivot(text, source_id, target_id, detected_language).await
            }
        }
    }

    async fn execute_direct(
        &self,
        text: &str,
        source_id: &str,
        target_id: &str,
        detected_language: Option<String>,
    ) -> TranslationResult {
        let path = TranslationPath::DirectModel;
        let (source, target) = match (self.registry.resolve(source_id), self.registry.resolve(target_id)) {
            (Some(source), Some(target)) => (source, target),
            _ => {
                return self.degraded(
                    text,
                    source_id,
                    target_id,
                    path,
                    detected_language,
                    None,
                    DegradeReason::UnresolvedLanguage(format!("{}/{}", source_id, target_id)),
                );
            }
        };

        match self.model_leg(text, source, target).await {
            Ok(translated) => {
                let quality = TranslationQuality::assess(text, &translated, target);
                if !quality.is_acceptable() {
                    return self.degraded(
                        text,
                        source_id,
                        target_id,
                        path,
                        detected_language,
                        None,
                        DegradeReason::QualityRejected,
                    );
                }
                TranslationResult {
                    text: translated,
                    original_text: text.to_string(),
                    source_language: source.id.clone(),
                    target_language: target.id.clone(),
                    path,
                    is_translated: true,
                    detected_language,
                    confidence: quality.confidence(),
                    english_pivot: None,
                    outcome: TranslationOutcome::Full,
                }
            }
            Err(e) => {
                let reason = reason_for(&e);
                self.degraded(text, source_id, target_id, path, detected_language, None, reason)
            }
        }
    }

    async fn execute_pivot(
        &self,
        text: &str,
        source_id: &str,
        target_id: &str,
        detected_language: Option<String>,
    ) -> TranslationResult {
        let path = TranslationPath::PivotThroughEnglish;
        let (source, target, english) = match (
            self.registry.resolve(source_id),
            self.registry.resolve(target_id),
            self.registry.resolve("en"),
        ) {
            (Some(source), Some(target), Some(english)) => (source, target, english),
            _ => {
                return self.degraded(
                    text,
                    source_id,
                    target_id,
                    path,
                    detected_language,
                    None,
                    DegradeReason::UnresolvedLanguage(format!("{}/{}", source_id, target_id)),
                );
            }
        };

        let pivot = match self.model_leg(text, source, english).await {
            Ok(pivot) => pivot,
            Err(e) => {
                let reason = reason_for(&e);
                return self.degraded(text, source_id, target_id, path, detected_language, None, reason);
            }
        };

        let translated = match self.model_leg(&pivot, english, target).await {
            Ok(translated) => translated,
            Err(e) => {
                let reason = reason_for(&e);
                return self.degraded(
                    text,
                    source_id,
                    target_id,
                    path,
                    detected_language,
                    Some(pivot),
                    reason,
                );
            }
        };

        let leg_in = TranslationQuality::assess(text, &pivot, english);
        let leg_out = TranslationQuality::assess(&pivot, &translated, target);
        if !leg_out.is_acceptable() {
            return self.degraded(
                text,
                source_id,
                target_id,
                path,
                detected_language,
                Some(pivot),
                DegradeReason::QualityRejected,
            );
        }

        TranslationResult {
            text: translated,
            original_text: text.to_string(),
            source_language: source.id.clone(),
            target_language: target.id.clone(),
            path,
            is_translated: true,
            detected_language,
            confidence: leg_in.confidence() * leg_out.confidence(),
            english_pivot: Some(pivot),
            outcome: TranslationOutcome::Full,
        }
    }

    /// One cached, deduplicated, bounded-retry model invocation.
    async fn model_leg(
        &self,
        text: &str,
        source: &LanguageProfile,
        target: &LanguageProfile,
    ) -> Result<String> {
        let key = CacheKey::new(CacheOp::Translate, text, &source.id, &target.id);
        let value = self
            .cache
            .get_or_fetch(&key, || async move {
                let mut attempt = 0u32;
                loop {
                    match self
                        .model
                        .translate(text, &source.display_name, &target.display_name)
                        .await
                    {
                        Ok(translated) => return Ok(Value::String(translated)),
                        // Loading already failed; retrying cannot help
                        Err(e @ SamvadError::ModelUnavailable(_)) => return Err(e),
                        Err(e) => {
                            attempt += 1;
                            if attempt > self.max_retries {
                                return Err(e);
                            }
                            warn!("Translation attempt {} failed, retrying: {}", attempt, e);
                        }
                    }
                }
            })
            .await?;

        match value.as_str() {
            Some(translated) => Ok(translated.to_string()),
            None => Err(SamvadError::Cache(format!(
                "Unexpected cached payload for {}",
                key
            ))),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn degraded(
        &self,
        text: &str,
        source_id: &str,
        target_id: &str,
        path: TranslationPath,
        detected_language: Option<String>,
        english_pivot: Option<String>,
        reason: DegradeReason,
    ) -> TranslationResult {
        warn!(
            "Delivering original text for {} -> {}: {:?}",
            source_id, target_id, reason
        );
        debug!("Degraded translation input: {}", text);
        TranslationResult {
            text: text.to_string(),
            original_text: text.to_string(),
            source_language: source_id.to_string(),
            target_language: target_id.to_string(),
            path,
            is_translated: false,
            detected_language,
            confidence: 0.0,
            english_pivot,
            outcome: TranslationOutcome::Degraded(reason),
        }
    }
}

fn reason_for(e: &SamvadError) -> DegradeReason {
    match e {
        SamvadError::ModelUnavailable(message) => DegradeReason::ModelUnavailable(message.clone()),
        SamvadError::Translation(message) if message.contains("Empty translation") => {
            DegradeReason::EmptyOutput
        }
        other => DegradeReason::Backend(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryBackend;
    use crate::cache::Tier;
    use crate::model::{ModelBackend, ModelSpec, ProgressSink};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Backend answering from a canned script, echoing otherwise.
    struct ScriptedModel {
        replies: HashMap<(String, String), String>,
        calls: AtomicUsize,
        fail_prepare: AtomicBool,
    }

    impl ScriptedModel {
        fn new(replies: &[(&str, &str, &str)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(text, target, reply)| {
                        ((text.to_string(), target.to_string()), reply.to_string())
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
                fail_prepare: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ModelBackend for ScriptedModel {
        async fn prepare(&self, _spec: &ModelSpec, progress: &ProgressSink) -> Result<()> {
            if self.fail_prepare.load(Ordering::SeqCst) {
                return Err(SamvadError::Model("endpoint unreachable".to_string()));
            }
            progress.report(100);
            Ok(())
        }

        async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .replies
                .get(&(text.to_string(), target.to_string()))
                .cloned()
                .unwrap_or_else(|| format!("{} ({})", text, target)))
        }

        async fn release(&self) -> Result<()> {
            Ok(())
        }
    }

    fn executor_with(model: Arc<ScriptedModel>) -> (TranslationExecutor, Arc<ScriptedModel>) {
        let cache = Arc::new(TieredCache::new(vec![Tier::new(
            Arc::new(MemoryBackend::new(64)),
            300,
        )]));
        let executor = TranslationExecutor::new(
            Arc::new(ModelManager::new(model.clone())),
            cache,
            Arc::new(LanguageRegistry::new()),
            2,
        );
        (executor, model)
    }

    #[tokio::test]
    async fn test_direct_translation() {
        let model = Arc::new(ScriptedModel::new(&[("Hello", "Telugu", "హలో")]));
        let (executor, model) = executor_with(model);

        let result = executor
            .execute("Hello", "en", "te", TranslationPath::DirectModel, None)
            .await;

        assert!(result.is_translated);
        assert_eq!(result.text, "హలో");
        assert_eq!(result.outcome, TranslationOutcome::Full);
        assert!(result.confidence > 0.5);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_direct_translation_is_cached() {
        let model = Arc::new(ScriptedModel::new(&[("Hello", "Telugu", "హలో")]));
        let (executor, model) = executor_with(model);

        for _ in 0..3 {
            let result = executor
                .execute("Hello", "en", "te", TranslationPath::DirectModel, None)
                .await;
            assert_eq!(result.text, "హలో");
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pivot_produces_english_intermediate() {
        let model = Arc::new(ScriptedModel::new(&[
            ("నమస్కారం", "English", "hello"),
            ("hello", "Tamil", "வணக்கம்"),
        ]));
        let (executor, _) = executor_with(model);

        let result = executor
            .execute("నమస్కారం", "te", "ta", TranslationPath::PivotThroughEnglish, None)
            .await;

        assert!(result.is_translated);
        assert_eq!(result.text, "வணக்கம்");
        assert_eq!(result.english_pivot.as_deref(), Some("hello"));
        assert_eq!(result.path, TranslationPath::PivotThroughEnglish);
        assert!(result.confidence > 0.0);
    }

    #[tokio::test]
    async fn test_passthrough_keeps_text() {
        let model = Arc::new(ScriptedModel::new(&[]));
        let (executor, model) = executor_with(model);

        let result = executor
            .execute("नमस्ते", "hi", "hi", TranslationPath::Passthrough, None)
            .await;

        assert!(!result.is_translated);
        assert_eq!(result.text, "नमस्ते");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_reports_unresolved_language() {
        let model = Arc::new(ScriptedModel::new(&[]));
        let (executor, _) = executor_with(model);

        let result = executor
            .execute("hello", "klingon", "hi", TranslationPath::Fallback, None)
            .await;

        assert!(!result.is_translated);
        assert_eq!(result.text, "hello");
        assert_eq!(
            result.outcome,
            TranslationOutcome::Degraded(DegradeReason::UnresolvedLanguage("klingon".to_string()))
        );
    }

    #[tokio::test]
    async fn test_model_unavailable_degrades_to_original() {
        let model = Arc::new(ScriptedModel::new(&[]));
        model.fail_prepare.store(true, Ordering::SeqCst);
        let (executor, _) = executor_with(model);

        let result = executor
            .execute("Hello", "en", "te", TranslationPath::DirectModel, None)
            .await;

        assert!(!result.is_translated);
        assert_eq!(result.text, "Hello");
        assert!(matches!(
            result.outcome,
            TranslationOutcome::Degraded(DegradeReason::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_quality_assessment() {
        let registry = LanguageRegistry::new();
        let telugu = registry.resolve("te").unwrap();
        let english = registry.resolve("en").unwrap();

        assert_eq!(
            TranslationQuality::assess("Hello", "హలో", telugu),
            TranslationQuality::Perfect
        );
        assert_eq!(
            TranslationQuality::assess("Hello", "", telugu),
            TranslationQuality::Invalid
        );
        assert_eq!(
            TranslationQuality::assess("Hello", "Hello", telugu),
            TranslationQuality::Bad
        );
        // Latin answer for a native-script target
        assert_eq!(
            TranslationQuality::assess("Hello", "haloo", telugu),
            TranslationQuality::Bad
        );
        assert_eq!(
            TranslationQuality::assess("నమస్కారం", "hello", english),
            TranslationQuality::Perfect
        );
    }
}
