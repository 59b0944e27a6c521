use serde::{Deserialize, Serialize};

use crate::language::{Script, ScriptClass};

/// Result of classifying a text fragment by writing system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptDetection {
    /// Binary class the router and transliteration engine branch on
    pub class: ScriptClass,
    /// Dominant native script family, when one was seen
    pub script: Option<Script>,
    /// Most probable language for the dominant script family
    pub guessed_language: Option<String>,
    /// Share of classified letters belonging to the winning class, 0..=1
    pub confidence: f64,
}

/// Pure, deterministic script classifier.
///
/// Counts letters per Unicode block; the majority class wins. Input with no
/// letters at all (empty, whitespace, digits, emoji) classifies as `Native`
/// with no language guess so that it is passed through untouched.
#[derive(Debug, Clone)]
pub struct ScriptDetector {
    /// Minimum winning-class share required before a language guess is
    /// reported. Tunable; gates reporting only, never routing.
    min_confidence: f64,
}

impl ScriptDetector {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    pub fn detect(&self, text: &str) -> ScriptDetection {
        let mut latin = 0usize;
        let mut native = 0usize;
        let mut families: Vec<(Script, usize)> = Vec::new();

        for c in text.chars() {
            let Some(script) = classify_char(c) else {
                continue;
            };
            if script.is_latin() {
                latin += 1;
            } else {
                native += 1;
                match families.iter_mut().find(|(s, _)| *s == script) {
                    Some((_, count)) => *count += 1,
                    None => families.push((script, 1)),
                }
            }
        }

        let total = latin + native;
        if total == 0 {
            return ScriptDetection {
                class: ScriptClass::Native,
                script: None,
                guessed_language: None,
                confidence: 0.0,
            };
        }

        if latin > native {
            return ScriptDetection {
                class: ScriptClass::Latin,
                script: Some(Script::Latin),
                guessed_language: None,
                confidence: latin as f64 / total as f64,
            };
        }

        // Ties favor native: a transliteration candidate should not be
        // re-transliterated because of stray Latin characters.
        let dominant = families
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(script, _)| *script);
        let confidence = native as f64 / total as f64;

        let guessed_language = if confidence >= self.min_confidence {
            dominant.and_then(probable_language).map(str::to_string)
        } else {
            None
        };

        ScriptDetection {
            class: ScriptClass::Native,
            script: dominant,
            guessed_language,
            confidence,
        }
    }
}

impl Default for ScriptDetector {
    fn default() -> Self {
        Self::new(0.3)
    }
}

/// Map a single character to its script family, or `None` for characters
/// that carry no script signal (whitespace, punctuation, digits).
pub fn classify_char(c: char) -> Option<Script> {
    let cp = c as u32;
    match cp {
        0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F => Some(Script::Latin),
        0x0900..=0x097F => Some(Script::Devanagari),
        0x0980..=0x09FF => Some(Script::Bengali),
        0x0A00..=0x0A7F => Some(Script::Gurmukhi),
        0x0A80..=0x0AFF => Some(Script::Gujarati),
        0x0B00..=0x0B7F => Some(Script::Odia),
        0x0B80..=0x0BFF => Some(Script::Tamil),
        0x0C00..=0x0C7F => Some(Script::Telugu),
        0x0C80..=0x0CFF => Some(Script::Kannada),
        0x0D00..=0x0D7F => Some(Script::Malayalam),
        0x0D80..=0x0DFF => Some(Script::Sinhala),
        0x0600..=0x06FF | 0x0750..=0x077F => Some(Script::Arabic),
        0x0400..=0x04FF => Some(Script::Cyrillic),
        0x3040..=0x30FF => Some(Script::Kana),
        0x3400..=0x4DBF | 0x4E00..=0x9FFF => Some(Script::Han),
        _ => None,
    }
}

/// Most probable language for a native script family. Scripts shared by
/// several languages report the highest-frequency one.
fn probable_language(script: Script) -> Option<&'static str> {
    match script {
        Script::Latin => None,
        Script::Devanagari => Some("hi"),
        Script::Telugu => Some("te"),
        Script::Tamil => Some("ta"),
        Script::Bengali => Some("bn"),
        Script::Kannada => Some("kn"),
        Script::Malayalam => Some("ml"),
        Script::Gujarati => Some("gu"),
        Script::Gurmukhi => Some("pa"),
        Script::Odia => Some("or"),
        Script::Sinhala => Some("si"),
        Script::Arabic => Some("ar"),
        Script::Cyrillic => Some("ru"),
        Script::Han => Some("zh"),
        Script::Kana => Some("ja"),
    }
}
