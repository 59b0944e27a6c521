//! Romanization tables for the Indic scripts the engine can render.
//!
//! Each table maps a common chat-romanization scheme (kh/gh/ch/chh digraphs,
//! doubled vowels for length) onto one script. Scripts without a table are
//! handled upstream by passing the text through unchanged.

use crate::language::Script;

pub struct ScriptTable {
    pub script: Script,
    /// Vowel-killer sign joining consonant clusters
    pub virama: char,
    /// Consonant letters, keyed by romanization
    pub consonants: &'static [(&'static str, char)],
    /// Independent (word-initial) vowel letters
    pub vowels: &'static [(&'static str, char)],
    /// Dependent vowel signs; the inherent "a" has no sign
    pub matras: &'static [(&'static str, char)],
}

impl ScriptTable {
    pub fn for_script(script: Script) -> Option<&'static ScriptTable> {
        match script {
            Script::Devanagari => Some(&DEVANAGARI),
            Script::Telugu => Some(&TELUGU),
            Script::Tamil => Some(&TAMIL),
            Script::Bengali => Some(&BENGALI),
            Script::Kannada => Some(&KANNADA),
            _ => None,
        }
    }

    pub fn consonant(&self, roman: &str) -> Option<char> {
        lookup(self.consonants, roman)
    }

    pub fn vowel(&self, roman: &str) -> Option<char> {
        lookup(self.vowels, roman)
    }

    pub fn matra(&self, roman: &str) -> Option<char> {
        lookup(self.matras, roman)
    }

    pub fn roman_of_consonant(&self, c: char) -> Option<&'static str> {
        reverse(self.consonants, c)
    }

    pub fn roman_of_vowel(&self, c: char) -> Option<&'static str> {
        reverse(self.vowels, c)
    }

    pub fn roman_of_matra(&self, c: char) -> Option<&'static str> {
        reverse(self.matras, c)
    }

    pub fn is_consonant(&self, c: char) -> bool {
        self.roman_of_consonant(c).is_some()
    }

    /// Longest romanization token length in any column of this table
    pub fn max_token_len(&self) -> usize {
        self.consonants
            .iter()
            .chain(self.vowels)
            .chain(self.matras)
            .map(|(roman, _)| roman.len())
            .max()
            .unwrap_or(1)
    }
}

fn lookup(pairs: &[(&str, char)], roman: &str) -> Option<char> {
    pairs.iter().find(|(r, _)| *r == roman).map(|(_, c)| *c)
}

// Several romanizations may collapse onto one letter (Tamil); reversing
// prefers the shortest spelling.
fn reverse(pairs: &'static [(&'static str, char)], c: char) -> Option<&'static str> {
    pairs
        .iter()
        .filter(|(_, mapped)| *mapped == c)
        .map(|(r, _)| *r)
        .min_by_key(|r| r.len())
}

static DEVANAGARI: ScriptTable = ScriptTable {
    script: Script::Devanagari,
    virama: '\u{094D}',
    consonants: &[
        ("kh", 'ख'), ("gh", 'घ'), ("chh", 'छ'), ("ch", 'च'), ("jh", 'झ'),
        ("th", 'थ'), ("dh", 'ध'), ("ph", 'फ'), ("bh", 'भ'), ("sh", 'श'),
        ("k", 'क'), ("g", 'ग'), ("j", 'ज'), ("t", 'त'), ("d", 'द'),
        ("n", 'न'), ("p", 'प'), ("b", 'ब'), ("m", 'म'), ("y", 'य'),
        ("r", 'र'), ("l", 'ल'), ("v", 'व'), ("w", 'व'), ("s", 'स'),
        ("h", 'ह'),
    ],
    vowels: &[
        ("aa", 'आ'), ("ai", 'ऐ'), ("au", 'औ'), ("ii", 'ई'), ("ee", 'ई'),
        ("uu", 'ऊ'), ("oo", 'ऊ'), ("a", 'अ'), ("i", 'इ'), ("u", 'उ'),
        ("e", 'ए'), ("o", 'ओ'),
    ],
    matras: &[
        ("aa", 'ा'), ("ai", 'ै'), ("au", 'ौ'), ("ii", 'ी'), ("ee", 'ी'),
        ("uu", 'ू'), ("oo", 'ू'), ("i", 'ि'), ("u", 'ु'), ("e", 'े'),
        ("o", 'ो'),
    ],
};

static TELUGU: ScriptTable = ScriptTable {
    script: Script::Telugu,
    virama: '\u{0C4D}',
    consonants: &[
        ("kh", 'ఖ'), ("gh", 'ఘ'), ("chh", 'ఛ'), ("ch", 'చ'), ("jh", 'ఝ'),
        ("th", 'థ'), ("dh", 'ధ'), ("ph", 'ఫ'), ("bh", 'భ'), ("sh", 'శ'),
        ("k", 'క'), ("g", 'గ'), ("j", 'జ'), ("t", 'త'), ("d", 'ద'),
        ("n", 'న'), ("p", 'ప'), ("b", 'బ'), ("m", 'మ'), ("y", 'య'),
        ("r", 'ర'), ("l", 'ల'), ("v", 'వ'), ("w", 'వ'), ("s", 'స'),
        ("h", 'హ'),
    ],
    vowels: &[
        ("aa", 'ఆ'), ("ai", 'ఐ'), ("au", 'ఔ'), ("ii", 'ఈ'), ("ee", 'ఈ'),
        ("uu", 'ఊ'), ("oo", 'ఊ'), ("a", 'అ'), ("i", 'ఇ'), ("u", 'ఉ'),
        ("e", 'ఎ'), ("o", 'ఒ'),
    ],
    matras: &[
        ("aa", 'ా'), ("ai", 'ై'), ("au", 'ౌ'), ("ii", 'ీ'), ("ee", 'ీ'),
        ("uu", 'ూ'), ("oo", 'ూ'), ("i", 'ి'), ("u", 'ు'), ("e", 'ె'),
        ("o", 'ొ'),
    ],
};

static TAMIL: ScriptTable = ScriptTable {
    script: Script::Tamil,
    virama: '\u{0BCD}',
    // Tamil does not distinguish aspiration or voicing; several romanizations
    // collapse onto one letter
    consonants: &[
        ("kh", 'க'), ("gh", 'க'), ("chh", 'ச'), ("ch", 'ச'), ("jh", 'ஜ'),
        ("th", 'த'), ("dh", 'த'), ("ph", 'ப'), ("bh", 'ப'), ("sh", 'ஷ'),
        ("zh", 'ழ'), ("k", 'க'), ("g", 'க'), ("j", 'ஜ'), ("t", 'த'),
        ("d", 'த'), ("n", 'ந'), ("p", 'ப'), ("b", 'ப'), ("m", 'ம'),
        ("y", 'ய'), ("r", 'ர'), ("l", 'ல'), ("v", 'வ'), ("w", 'வ'),
        ("s", 'ஸ'), ("h", 'ஹ'),
    ],
    vowels: &[
        ("aa", 'ஆ'), ("ai", 'ஐ'), ("au", 'ஔ'), ("ii", 'ஈ'), ("ee", 'ஈ'),
        ("uu", 'ஊ'), ("oo", 'ஊ'), ("a", 'அ'), ("i", 'இ'), ("u", 'உ'),
        ("e", 'எ'), ("o", 'ஒ'),
    ],
    matras: &[
        ("aa", 'ா'), ("ai", 'ை'), ("au", 'ௌ'), ("ii", 'ீ'), ("ee", 'ீ'),
        ("uu", 'ூ'), ("oo", 'ூ'), ("i", 'ி'), ("u", 'ு'), ("e", 'ெ'),
        ("o", 'ொ'),
    ],
};

static BENGALI: ScriptTable = ScriptTable {
    script: Script::Bengali,
    virama: '\u{09CD}',
    consonants: &[
        ("kh", 'খ'), ("gh", 'ঘ'), ("chh", 'ছ'), ("ch", 'চ'), ("jh", 'ঝ'),
        ("th", 'থ'), ("dh", 'ধ'), ("ph", 'ফ'), ("bh", 'ভ'), ("sh", 'শ'),
        ("k", 'ক'), ("g", 'গ'), ("j", 'জ'), ("t", 'ত'), ("d", 'দ'),
        ("n", 'ন'), ("p", 'প'), ("b", 'ব'), ("m", 'ম'), ("y", 'য'),
        ("r", 'র'), ("l", 'ল'), ("v", 'ব'), ("w", 'ব'), ("s", 'স'),
        ("h", 'হ'),
    ],
    vowels: &[
        ("aa", 'আ'), ("ai", 'ঐ'), ("au", 'ঔ'), ("ii", 'ঈ'), ("ee", 'ঈ'),
        ("uu", 'ঊ'), ("oo", 'ঊ'), ("a", 'অ'), ("i", 'ই'), ("u", 'উ'),
        ("e", 'এ'), ("o", 'ও'),
    ],
    matras: &[
        ("aa", 'া'), ("ai", 'ৈ'), ("au", 'ৌ'), ("ii", 'ী'), ("ee", 'ী'),
        ("uu", 'ূ'), ("oo", 'ূ'), ("i", 'ি'), ("u", 'ু'), ("e", 'ে'),
        ("o", 'ো'),
    ],
};

static KANNADA: ScriptTable = ScriptTable {
    script: Script::Kannada,
    virama: '\u{0CCD}',
    consonants: &[
        ("kh", 'ಖ'), ("gh", 'ಘ'), ("chh", 'ಛ'), ("ch", 'ಚ'), ("jh", 'ಝ'),
        ("th", 'ಥ'), ("dh", 'ಧ'), ("ph", 'ಫ'), ("bh", 'ಭ'), ("sh", 'ಶ'),
        ("k", 'ಕ'), ("g", 'ಗ'), ("j", 'ಜ'), ("t", 'ತ'), ("d", 'ದ'),
        ("n", 'ನ'), ("p", 'ಪ'), ("b", 'ಬ'), ("m", 'ಮ'), ("y", 'ಯ'),
        ("r", 'ರ'), ("l", 'ಲ'), ("v", 'ವ'), ("w", 'ವ'), ("s", 'ಸ'),
        ("h", 'ಹ'),
    ],
    vowels: &[
        ("aa", 'ಆ'), ("ai", 'ಐ'), ("au", 'ಔ'), ("ii", 'ಈ'), ("ee", 'ಈ'),
        ("uu", 'ಊ'), ("oo", 'ಊ'), ("a", 'ಅ'), ("i", 'ಇ'), ("u", 'ಉ'),
        ("e", 'ಎ'), ("o", 'ಒ'),
    ],
    matras: &[
        ("aa", 'ಾ'), ("ai", 'ೈ'), ("au", 'ೌ'), ("ii", 'ೀ'), ("ee", 'ೀ'),
        ("uu", 'ೂ'), ("oo", 'ೂ'), ("i", 'ಿ'), ("u", 'ು'), ("e", 'ೆ'),
        ("o", 'ೊ'),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_availability() {
        assert!(ScriptTable::for_script(Script::Devanagari).is_some());
        assert!(ScriptTable::for_script(Script::Telugu).is_some());
        assert!(ScriptTable::for_script(Script::Tamil).is_some());
        assert!(ScriptTable::for_script(Script::Arabic).is_none());
        assert!(ScriptTable::for_script(Script::Latin).is_none());
    }

    #[test]
    fn test_digraph_precedence_in_lookup_order() {
        let table = ScriptTable::for_script(Script::Devanagari).unwrap();
        assert_eq!(table.consonant("kh"), Some('ख'));
        assert_eq!(table.consonant("k"), Some('क'));
        assert_eq!(table.consonant("q"), None);
    }

    #[test]
    fn test_reverse_lookup() {
        let table = ScriptTable::for_script(Script::Telugu).unwrap();
        assert_eq!(table.roman_of_consonant('క'), Some("k"));
        assert_eq!(table.roman_of_matra('ా'), Some("aa"));
        assert_eq!(table.roman_of_vowel('అ'), Some("a"));
    }

    #[test]
    fn test_max_token_len() {
        let table = ScriptTable::for_script(Script::Devanagari).unwrap();
        assert_eq!(table.max_token_len(), 3);
    }
}
