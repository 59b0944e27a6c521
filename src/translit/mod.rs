// Rule-based transliteration between Latin-keyboard romanization and the
// native scripts in the language catalog.
//
// Conversion is best-effort: text that is already native-script, targets a
// Latin-script language, or targets a script with no table is returned
// unchanged rather than failing the caller.

pub mod tables;

use tracing::debug;

use crate::language::{LanguageProfile, ScriptClass};
use crate::script::ScriptDetector;
use self::tables::ScriptTable;

/// Result of a transliteration attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TransliterationOutcome {
    pub text: String,
    /// True when the engine actually rewrote the input
    pub converted: bool,
}

impl TransliterationOutcome {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            converted: false,
        }
    }
}

pub struct Transliterator {
    detector: ScriptDetector,
}

impl Transliterator {
    pub fn new(detector: ScriptDetector) -> Self {
        Self { detector }
    }

    /// Convert Latin-keyboard input into the native script of `profile`.
    pub fn to_native_script(&self, text: &str, profile: &LanguageProfile) -> TransliterationOutcome {
        if profile.script.is_latin() {
            return TransliterationOutcome::unchanged(text);
        }

        let detection = self.detector.detect(text);
        if detection.class == ScriptClass::Native {
            // Already native (or carries no script signal at all)
            return TransliterationOutcome::unchanged(text);
        }

        let Some(table) = ScriptTable::for_script(profile.script) else {
            debug!("No transliteration table for {:?}, passing through", profile.script);
            return TransliterationOutcome::unchanged(text);
        };

        let converted = roman_to_native(table, text);
        if converted.is_empty() || converted == text {
            return TransliterationOutcome::unchanged(text);
        }

        TransliterationOutcome {
            text: converted,
            converted: true,
        }
    }

    /// Render native-script text back into its romanization.
    pub fn reverse(&self, text: &str, profile: &LanguageProfile) -> TransliterationOutcome {
        let Some(table) = ScriptTable::for_script(profile.script) else {
            return TransliterationOutcome::unchanged(text);
        };

        let roman = native_to_roman(table, text);
        if roman == text {
            return TransliterationOutcome::unchanged(text);
        }

        TransliterationOutcome {
            text: roman,
            converted: true,
        }
    }
}

/// Romanization to native script. Consonants carry an inherent "a": a bare
/// consonant emits letter + virama, a following vowel replaces the virama
/// with its dependent sign (or just removes it for "a" itself).
fn roman_to_native(table: &ScriptTable, text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let max_len = table.max_token_len();
    let mut result = String::new();
    let mut pending_consonant = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if !c.is_ascii_alphabetic() {
            if pending_consonant && result.ends_with(table.virama) {
                result.pop();
            }
            pending_consonant = false;
            result.push(c);
            i += 1;
            continue;
        }

        let mut matched = false;
        let available = max_len.min(chars.len() - i);
        for len in (1..=available).rev() {
            let token: String = chars[i..i + len].iter().collect::<String>().to_lowercase();

            if let Some(consonant) = table.consonant(&token) {
                result.push(consonant);
                result.push(table.virama);
                pending_consonant = true;
                i += len;
                matched = true;
                break;
            }

            if pending_consonant {
                if token == "a" {
                    if result.ends_with(table.virama) {
                        result.pop();
                    }
                    pending_consonant = false;
                    i += len;
                    matched = true;
                    break;
                }
                if let Some(matra) = table.matra(&token) {
                    if result.ends_with(table.virama) {
                        result.pop();
                    }
                    result.push(matra);
                    pending_consonant = false;
                    i += len;
                    matched = true;
                    break;
                }
            } else if let Some(vowel) = table.vowel(&token) {
                result.push(vowel);
                i += len;
                matched = true;
                break;
            }
        }

        if !matched {
            if pending_consonant && result.ends_with(table.virama) {
                result.pop();
            }
            pending_consonant = false;
            result.push(c);
            i += 1;
        }
    }

    // Word-final schwa: a trailing virama is dropped
    if result.ends_with(table.virama) {
        result.pop();
    }

    result
}

/// Inverse rendering. Round-trip with `roman_to_native` is not guaranteed
/// lossless; transliterating already-native text is the identity.
fn native_to_roman(table: &ScriptTable, text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == table.virama {
            // Stray virama with no preceding consonant
            i += 1;
            continue;
        }

        if let Some(roman) = table.roman_of_consonant(c) {
            result.push_str(roman);
            match chars.get(i + 1) {
                Some(&next) if next == table.virama => {
                    i += 2;
                }
                Some(&next) => {
                    if let Some(matra) = table.roman_of_matra(next) {
                        result.push_str(matra);
                        i += 2;
                    } else if table.is_consonant(next) || table.roman_of_vowel(next).is_some() {
                        result.push('a');
                        i += 1;
                    } else {
                        // Word-final consonant: schwa dropped
                        i += 1;
                    }
                }
                None => {
                    i += 1;
                }
            }
            continue;
        }

        if let Some(roman) = table.roman_of_vowel(c) {
            result.push_str(roman);
            i += 1;
            continue;
        }

        result.push(c);
        i += 1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageRegistry;

    fn engine() -> Transliterator {
        Transliterator::new(ScriptDetector::default())
    }

    fn profile(id: &str) -> LanguageProfile {
        LanguageRegistry::new().resolve(id).unwrap().clone()
    }

    #[test]
    fn test_namaste_to_devanagari() {
        let outcome = engine().to_native_script("namaste", &profile("hi"));
        assert!(outcome.converted);
        assert_eq!(outcome.text, "नमस्ते");
    }

    #[test]
    fn test_phrase_with_punctuation() {
        let outcome = engine().to_native_script("namaste, kaise ho?", &profile("hi"));
        assert!(outcome.converted);
        assert_eq!(outcome.text, "नमस्ते, कैसे हो?");
    }

    #[test]
    fn test_telugu_conversion() {
        let outcome = engine().to_native_script("namaskaram", &profile("te"));
        assert!(outcome.converted);
        assert!(outcome.text.starts_with("నమస్క"));
        assert!(outcome.text.chars().all(|c| !c.is_ascii_alphabetic()));
    }

    #[test]
    fn test_native_input_unchanged() {
        let outcome = engine().to_native_script("नमस्ते", &profile("hi"));
        assert!(!outcome.converted);
        assert_eq!(outcome.text, "नमस्ते");
    }

    #[test]
    fn test_latin_language_unchanged() {
        let outcome = engine().to_native_script("hola amigo", &profile("es"));
        assert!(!outcome.converted);
        assert_eq!(outcome.text, "hola amigo");
    }

    #[test]
    fn test_unsupported_script_passes_through() {
        let outcome = engine().to_native_script("marhaba", &profile("ar"));
        assert!(!outcome.converted);
        assert_eq!(outcome.text, "marhaba");
    }

    #[test]
    fn test_empty_input() {
        let outcome = engine().to_native_script("", &profile("hi"));
        assert!(!outcome.converted);
        assert_eq!(outcome.text, "");
    }

    #[test]
    fn test_idempotence() {
        let translit = engine();
        let hindi = profile("hi");
        let once = translit.to_native_script("namaste", &hindi);
        let twice = translit.to_native_script(&once.text, &hindi);
        assert!(!twice.converted);
        assert_eq!(once.text, twice.text);
    }

    #[test]
    fn test_reverse_devanagari() {
        let outcome = engine().reverse("नमस्ते", &profile("hi"));
        assert!(outcome.converted);
        assert_eq!(outcome.text, "namaste");
    }

    #[test]
    fn test_reverse_drops_word_final_schwa() {
        let outcome = engine().reverse("कल", &profile("hi"));
        assert_eq!(outcome.text, "kal");
    }

    #[test]
    fn test_standalone_vowels() {
        let outcome = engine().to_native_script("aap", &profile("hi"));
        assert_eq!(outcome.text, "आप");
    }
}
