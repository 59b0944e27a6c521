use serde::{Deserialize, Serialize};

use crate::language::LanguageProfile;

/// Strategy chosen once per (source, target) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationPath {
    /// Same language on both sides, nothing to translate
    Passthrough,
    /// One model call source -> target
    DirectModel,
    /// Two model calls through English as the hub language
    PivotThroughEnglish,
    /// Unknown language somewhere; deliver the original text unchanged
    Fallback,
}

/// Pure routing decision over the two resolved profiles.
///
/// English is the hub language of the underlying model: any pair it can
/// serve directly either touches English or stays within Latin script.
/// Everything else goes through English, which keeps the routing table
/// linear in the number of languages instead of quadratic.
pub fn route(source: Option<&LanguageProfile>, target: Option<&LanguageProfile>) -> TranslationPath {
    let (source, target) = match (source, target) {
        (Some(source), Some(target)) => (source, target),
        _ => return TranslationPath::Fallback,
    };

    if source.id == target.id {
        return TranslationPath::Passthrough;
    }

    let source_is_english = source.id == "en";
    let target_is_english = target.id == "en";

    if source_is_english || target_is_english {
        let other = if source_is_english { target } else { source };
        if other.model_supported {
            return TranslationPath::DirectModel;
        }
        // English-to-unsupported has no pivot to fall back on
        return TranslationPath::Fallback;
    }

    if source.model_supported && target.model_supported && source.script.is_latin() && target.script.is_latin() {
        return TranslationPath::DirectModel;
    }

    TranslationPath::PivotThroughEnglish
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageRegistry;

    fn route_ids(registry: &LanguageRegistry, source: &str, target: &str) -> TranslationPath {
        route(registry.resolve(source), registry.resolve(target))
    }

    #[test]
    fn test_same_language_is_passthrough() {
        let registry = LanguageRegistry::new();
        assert_eq!(route_ids(&registry, "hindi", "hindi"), TranslationPath::Passthrough);
        // Alias and code still count as the same language
        assert_eq!(route_ids(&registry, "hi", "Hindi"), TranslationPath::Passthrough);
        assert_eq!(route_ids(&registry, "en", "english"), TranslationPath::Passthrough);
    }

    #[test]
    fn test_english_to_supported_is_direct() {
        let registry = LanguageRegistry::new();
        assert_eq!(route_ids(&registry, "english", "telugu"), TranslationPath::DirectModel);
        assert_eq!(route_ids(&registry, "ta", "en"), TranslationPath::DirectModel);
    }

    #[test]
    fn test_latin_pair_is_direct() {
        let registry = LanguageRegistry::new();
        assert_eq!(route_ids(&registry, "spanish", "french"), TranslationPath::DirectModel);
    }

    #[test]
    fn test_native_pair_pivots_through_english() {
        let registry = LanguageRegistry::new();
        assert_eq!(
            route_ids(&registry, "telugu", "tamil"),
            TranslationPath::PivotThroughEnglish
        );
        assert_eq!(
            route_ids(&registry, "hindi", "bengali"),
            TranslationPath::PivotThroughEnglish
        );
    }

    #[test]
    fn test_unsupported_side_pivots() {
        let registry = LanguageRegistry::new();
        // Swahili lacks direct model support
        assert_eq!(
            route_ids(&registry, "spanish", "swahili"),
            TranslationPath::PivotThroughEnglish
        );
    }

    #[test]
    fn test_english_to_unsupported_falls_back() {
        let registry = LanguageRegistry::new();
        assert_eq!(route_ids(&registry, "english", "sinhala"), TranslationPath::Fallback);
    }

    #[test]
    fn test_unresolved_language_falls_back() {
        let registry = LanguageRegistry::new();
        assert_eq!(route_ids(&registry, "klingon", "hindi"), TranslationPath::Fallback);
        assert_eq!(route_ids(&registry, "hindi", "klingon"), TranslationPath::Fallback);
        // Identical unknown identifiers still cannot prove same-language
        assert_eq!(route_ids(&registry, "klingon", "klingon"), TranslationPath::Fallback);
    }
}
