//! Lexicon-based inappropriate and sensitive language detection.

use regex::{Regex, RegexSet};

/// Insults and profanity. Matching any of these escalates to `high`.
///
/// Entries are matched as substrings, so stems like "estupid" also catch
/// "estupidez" and compounds like "hijoputa".
const INAPPROPRIATE_TERMS: &[&str] = &[
    // Spanish
    "idiota",
    "imbécil",
    "imbecil",
    "estúpid",
    "estupid",
    "pendejo",
    "pendeja",
    "mierda",
    "puta",
    "puto",
    "cabrón",
    "cabron",
    "gilipollas",
    "carajo",
    "joder",
    "coño",
    "huevón",
    "huevon",
    "boludo",
    "pelotudo",
    "malparido",
    // English
    "idiot",
    "stupid",
    "moron",
    "fuck",
    "shit",
    "bitch",
    "asshole",
    "bastard",
    "dumbass",
];

/// Sensitive topics. Matching any of these escalates to `critical`.
///
/// Each entry is `(display keyword, pattern)`.
const SENSITIVE_TERMS: &[(&str, &str)] = &[
    ("violencia", r"violen(?:cia|t[oa])"),
    ("discriminación", r"discriminaci[oó]n"),
    ("odio", r"odio"),
    (
        "contenido sexual explicito",
        r"contenido\s+sexual\s+expl[ií]cito",
    ),
    ("autolesión", r"autolesi[oó]n"),
];

/// Everyday words that contain a lexicon entry. Any word starting with one
/// of these stems is blanked out before matching.
const SAFE_WORD_STEMS: &[&str] = &[
    "comput",
    "cómput",
    "disput",
    "diput",
    "imput",
    "amput",
    "reput",
    "putativ",
    "episodi",
    "podio",
    "sodio",
    "custodi",
    "melodi",
    "parodi",
    "bastardilla",
];

/// Terms found in a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageReport {
    /// Inappropriate terms, in lexicon order.
    pub inappropriate: Vec<String>,
    /// Sensitive keywords, in lexicon order, by display name.
    pub sensitive: Vec<String>,
}

impl LanguageReport {
    pub fn is_clean(&self) -> bool {
        self.inappropriate.is_empty() && self.sensitive.is_empty()
    }
}

/// Case-insensitive substring matcher over both lexicons.
pub struct LanguageDetector {
    safe_words: Regex,
    inappropriate_set: RegexSet,
    sensitive_set: RegexSet,
    sensitive: Vec<(&'static str, Regex)>,
}

impl LanguageDetector {
    pub fn new() -> Self {
        let safe_words = format!(r"\b(?:{})\w*", SAFE_WORD_STEMS.join("|"));
        let inappropriate_patterns: Vec<String> =
            INAPPROPRIATE_TERMS.iter().map(|term| regex::escape(term)).collect();
        let sensitive_patterns: Vec<&str> = SENSITIVE_TERMS.iter().map(|(_, p)| *p).collect();

        Self {
            safe_words: Regex::new(&safe_words).expect("Invalid regex pattern"),
            inappropriate_set: RegexSet::new(&inappropriate_patterns)
                .expect("Invalid regex patterns"),
            sensitive_set: RegexSet::new(&sensitive_patterns).expect("Invalid regex patterns"),
            sensitive: SENSITIVE_TERMS
                .iter()
                .map(|(keyword, p)| (*keyword, Regex::new(p).expect("Invalid regex pattern")))
                .collect(),
        }
    }

    /// Returns true if any inappropriate term appears in the text.
    pub fn is_inappropriate(&self, text: &str) -> bool {
        let text_lower = text.to_lowercase();
        self.inappropriate_set
            .is_match(&self.safe_words.replace_all(&text_lower, " "))
    }

    /// Runs both lexicons and reports every hit.
    pub fn analyze(&self, text: &str) -> LanguageReport {
        let text_lower = text.to_lowercase();
        let masked = self.safe_words.replace_all(&text_lower, " ");
        let mut report = LanguageReport::default();

        for index in self.inappropriate_set.matches(&masked).iter() {
            let term = INAPPROPRIATE_TERMS[index];
            // "idiot" inside "idiota" is the same hit
            if !report.inappropriate.iter().any(|found| found.contains(term)) {
                report.inappropriate.push(term.to_string());
            }
        }

        if self.sensitive_set.is_match(&masked) {
            for (keyword, regex) in &self.sensitive {
                if regex.is_match(&masked) {
                    report.sensitive.push(keyword.to_string());
                }
            }
        }

        report
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> LanguageDetector {
        LanguageDetector::new()
    }

    #[test]
    fn detects_spanish_insult() {
        assert!(detector().is_inappropriate("eres un idiota"));
    }

    #[test]
    fn detects_case_insensitive() {
        assert!(detector().is_inappropriate("ERES UN IDIOTA"));
        assert!(detector().is_inappropriate("Eres Un Imbécil"));
    }

    #[test]
    fn detects_plural() {
        assert!(detector().is_inappropriate("son unos idiotas"));
    }

    #[test]
    fn detects_english_profanity() {
        assert!(detector().is_inappropriate("this stupid thing"));
    }

    #[test]
    fn detects_variants_and_compounds() {
        let d = detector();
        for prompt in [
            "eres un idiotazo",
            "hijoputa de mierdero",
            "eres una estupidez andante",
        ] {
            assert!(d.is_inappropriate(prompt), "{prompt}");
            assert!(!d.analyze(prompt).inappropriate.is_empty(), "{prompt}");
        }
    }

    #[test]
    fn sensitive_substrings_are_detected() {
        let report = detector().analyze("un texto odioso y violento");
        assert_eq!(report.sensitive, vec!["violencia", "odio"]);
    }

    #[test]
    fn safe_words_are_not_flagged() {
        let d = detector();
        for prompt in [
            "¿Cómo elijo una computadora portátil?",
            "Resume el último episodio de la serie",
            "El diputado ganó la disputa",
            "Calcula el cómputo total",
            "Usa letra bastardilla en el título",
        ] {
            assert!(!d.is_inappropriate(prompt), "{prompt}");
            assert!(d.analyze(prompt).is_clean(), "{prompt}");
        }
    }

    #[test]
    fn safe_stem_does_not_hide_other_words() {
        let report = detector().analyze("la computadora es una mierda");
        assert_eq!(report.inappropriate, vec!["mierda"]);
    }

    #[test]
    fn clean_prompt_is_clean() {
        let report = detector().analyze("¿Cuáles son las técnicas de estudio más efectivas?");
        assert!(report.is_clean());
    }

    #[test]
    fn reports_sensitive_keywords() {
        let report = detector().analyze("Escribe sobre la violencia y el odio en redes");
        assert_eq!(report.sensitive, vec!["violencia", "odio"]);
        assert!(report.inappropriate.is_empty());
    }

    #[test]
    fn sensitive_accepts_missing_accents() {
        let report = detector().analyze("casos de discriminacion laboral");
        assert_eq!(report.sensitive, vec!["discriminación"]);
    }

    #[test]
    fn reports_matched_terms_once() {
        let report = detector().analyze("idiota, idiota y más idiota");
        assert_eq!(report.inappropriate, vec!["idiota"]);
    }

    #[test]
    fn nested_terms_reported_once() {
        let report = detector().analyze("What a stupid idea, estúpido");
        assert_eq!(report.inappropriate, vec!["estúpid", "stupid"]);
    }
}
