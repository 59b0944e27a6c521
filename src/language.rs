use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Writing system family of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Script {
    Latin,
    Devanagari,
    Telugu,
    Tamil,
    Bengali,
    Kannada,
    Malayalam,
    Gujarati,
    Gurmukhi,
    Odia,
    Sinhala,
    Arabic,
    Cyrillic,
    Han,
    Kana,
}

/// Binary classification of a script used by the detector and router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptClass {
    Latin,
    Native,
}

impl Script {
    pub fn class(&self) -> ScriptClass {
        match self {
            Script::Latin => ScriptClass::Latin,
            _ => ScriptClass::Native,
        }
    }

    pub fn is_latin(&self) -> bool {
        matches!(self, Script::Latin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// Canonical identifier (short code)
    pub id: String,
    pub display_name: String,
    pub native_name: String,
    pub script: Script,
    /// Whether the translation model covers this language directly
    pub model_supported: bool,
}

impl LanguageProfile {
    fn new(id: &str, display_name: &str, native_name: &str, script: Script, model_supported: bool) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            native_name: native_name.to_string(),
            script,
            model_supported,
        }
    }
}

/// Static catalog of languages the pipeline knows about.
///
/// Identifiers are accepted as short codes ("hi") or full names ("hindi"),
/// case-insensitively; both resolve to the same profile.
pub struct LanguageRegistry {
    profiles: HashMap<String, LanguageProfile>,
    aliases: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let catalog = vec![
            LanguageProfile::new("en", "English", "English", Script::Latin, true),
            LanguageProfile::new("hi", "Hindi", "हिन्दी", Script::Devanagari, true),
            LanguageProfile::new("mr", "Marathi", "मराठी", Script::Devanagari, true),
            LanguageProfile::new("ne", "Nepali", "नेपाली", Script::Devanagari, true),
            LanguageProfile::new("te", "Telugu", "తెలుగు", Script::Telugu, true),
            LanguageProfile::new("ta", "Tamil", "தமிழ்", Script::Tamil, true),
            LanguageProfile::new("bn", "Bengali", "বাংলা", Script::Bengali, true),
            LanguageProfile::new("kn", "Kannada", "ಕನ್ನಡ", Script::Kannada, true),
            LanguageProfile::new("ml", "Malayalam", "മലയാളം", Script::Malayalam, true),
            LanguageProfile::new("gu", "Gujarati", "ગુજરાતી", Script::Gujarati, true),
            LanguageProfile::new("pa", "Punjabi", "ਪੰਜਾਬੀ", Script::Gurmukhi, true),
            LanguageProfile::new("or", "Odia", "ଓଡ଼ିଆ", Script::Odia, true),
            LanguageProfile::new("si", "Sinhala", "සිංහල", Script::Sinhala, false),
            LanguageProfile::new("es", "Spanish", "Español", Script::Latin, true),
            LanguageProfile::new("fr", "French", "Français", Script::Latin, true),
            LanguageProfile::new("de", "German", "Deutsch", Script::Latin, true),
            LanguageProfile::new("pt", "Portuguese", "Português", Script::Latin, true),
            LanguageProfile::new("it", "Italian", "Italiano", Script::Latin, true),
            LanguageProfile::new("id", "Indonesian", "Bahasa Indonesia", Script::Latin, true),
            LanguageProfile::new("sw", "Swahili", "Kiswahili", Script::Latin, false),
            LanguageProfile::new("ar", "Arabic", "العربية", Script::Arabic, true),
            LanguageProfile::new("ru", "Russian", "Русский", Script::Cyrillic, true),
            LanguageProfile::new("zh", "Chinese", "中文", Script::Han, true),
            LanguageProfile::new("ja", "Japanese", "日本語", Script::Kana, true),
        ];

        let mut profiles = HashMap::new();
        let mut aliases = HashMap::new();

        for profile in catalog {
            // Full display name is always an alias for the canonical code
            aliases.insert(Self::normalize(&profile.display_name), profile.id.clone());
            aliases.insert(profile.id.clone(), profile.id.clone());
            profiles.insert(profile.id.clone(), profile);
        }

        // Spellings and regional names seen in the wild
        for (alias, id) in [
            ("bangla", "bn"),
            ("oriya", "or"),
            ("odiya", "or"),
            ("panjabi", "pa"),
            ("mandarin", "zh"),
            ("castilian", "es"),
            ("bahasa", "id"),
            ("kiswahili", "sw"),
        ] {
            aliases.insert(alias.to_string(), id.to_string());
        }

        Self { profiles, aliases }
    }

    /// Canonical form used for every identifier lookup: trimmed,
    /// Unicode-lowercased, separator characters removed.
    fn normalize(identifier: &str) -> String {
        identifier
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .collect()
    }

    pub fn resolve(&self, identifier: &str) -> Option<&LanguageProfile> {
        let normalized = Self::normalize(identifier);
        let id = self.aliases.get(&normalized)?;
        self.profiles.get(id)
    }

    pub fn is_english(&self, identifier: &str) -> bool {
        self.resolve(identifier).map(|p| p.id == "en").unwrap_or(false)
    }

    pub fn is_same_language(&self, a: &str, b: &str) -> bool {
        match (self.resolve(a), self.resolve(b)) {
            (Some(pa), Some(pb)) => pa.id == pb.id,
            _ => false,
        }
    }

    /// Full language name for model prompts, falling back to the raw
    /// identifier when unknown.
    pub fn prompt_name(&self, identifier: &str) -> String {
        self.resolve(identifier)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| identifier.to_string())
    }

    pub fn profiles(&self) -> impl Iterator<Item = &LanguageProfile> {
        self.profiles.values()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_and_name_resolve_to_same_profile() {
        let registry = LanguageRegistry::new();
        let by_code = registry.resolve("hi").unwrap();
        let by_name = registry.resolve("hindi").unwrap();
        assert_eq!(by_code.id, by_name.id);
        assert_eq!(by_code.script, Script::Devanagari);
    }

    #[test]
    fn test_normalization_is_case_and_separator_insensitive() {
        let registry = LanguageRegistry::new();
        assert!(registry.resolve(" Telugu ").is_some());
        assert!(registry.resolve("TELUGU").is_some());
        assert!(registry.resolve("te").is_some());
        assert!(registry.is_same_language("Telugu", "te"));
    }

    #[test]
    fn test_is_english() {
        let registry = LanguageRegistry::new();
        assert!(registry.is_english("en"));
        assert!(registry.is_english("English"));
        assert!(!registry.is_english("hi"));
        assert!(!registry.is_english("klingon"));
    }

    #[test]
    fn test_unknown_identifiers_do_not_match() {
        let registry = LanguageRegistry::new();
        assert!(registry.resolve("klingon").is_none());
        assert!(!registry.is_same_language("klingon", "klingon"));
    }

    #[test]
    fn test_regional_aliases() {
        let registry = LanguageRegistry::new();
        assert_eq!(registry.resolve("bangla").unwrap().id, "bn");
        assert_eq!(registry.resolve("oriya").unwrap().id, "or");
        assert_eq!(registry.resolve("Mandarin").unwrap().id, "zh");
    }

    #[test]
    fn test_prompt_name_falls_back_to_identifier() {
        let registry = LanguageRegistry::new();
        assert_eq!(registry.prompt_name("ta"), "Tamil");
        assert_eq!(registry.prompt_name("xx"), "xx");
    }
}
