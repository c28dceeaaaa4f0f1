//! Intention and context tagging.
//!
//! Both detectors share one pattern catalog. Intention collects every tag
//! with a matching pattern; context returns the first match in priority order.

use std::collections::BTreeSet;

use regex::RegexSet;

use crate::record::{ContextTag, IntentionTag};

/// Ordered pattern groups for one tag.
struct TagPatterns {
    tag: IntentionTag,
    regex_set: RegexSet,
}

/// Pattern catalog for intention and context detection.
pub struct IntentCatalog {
    /// Kept in context priority order.
    patterns: Vec<TagPatterns>,
}

impl IntentCatalog {
    pub fn new() -> Self {
        Self {
            patterns: vec![
                Self::build_learning_patterns(),
                Self::build_problem_solving_patterns(),
                Self::build_creative_patterns(),
                Self::build_technical_patterns(),
            ],
        }
    }

    /// Every tag whose patterns match, or `{general}` if none do.
    pub fn detect_intention(&self, text: &str) -> BTreeSet<IntentionTag> {
        let text_lower = text.to_lowercase();
        let tags: BTreeSet<IntentionTag> = self
            .patterns
            .iter()
            .filter(|p| p.regex_set.is_match(&text_lower))
            .map(|p| p.tag)
            .collect();

        if tags.is_empty() {
            BTreeSet::from([IntentionTag::General])
        } else {
            tags
        }
    }

    /// First matching tag in priority order, or `general`.
    pub fn detect_context(&self, text: &str) -> ContextTag {
        let text_lower = text.to_lowercase();
        self.patterns
            .iter()
            .find(|p| p.regex_set.is_match(&text_lower))
            .map(|p| p.tag)
            .unwrap_or(IntentionTag::General)
    }

    fn build_learning_patterns() -> TagPatterns {
        let patterns = [
            r"\b(cómo|como)\s+(funciona|funcionan|se\s+hace|se\s+usa)\b",
            r"\b(qué|que)\s+(es|son|significa)\b",
            r"\b(explica|explícame|explicame|enséñame|enseñame|aprender|entender|comprender)\b",
            r"\b(how\s+does|what\s+is|what\s+are|explain|learn|understand)\b",
        ];
        Self::build_tag_patterns(IntentionTag::Learning, &patterns)
    }

    fn build_problem_solving_patterns() -> TagPatterns {
        let patterns = [
            r"\b(error|errores|problema|problemas|falla|fallo|arreglar|solucionar|resolver|corregir)\b",
            r"\bno\s+funciona\b",
            r"\b(qué|que)\s+hago\b",
            r"\b(fix|bug|issue|solve|troubleshoot|not\s+working)\b",
        ];
        Self::build_tag_patterns(IntentionTag::ProblemSolving, &patterns)
    }

    fn build_creative_patterns() -> TagPatterns {
        let patterns = [
            r"\b(escribe|escribir|redacta|redactar|inventa|inventar|imagina|imaginar)\b",
            r"\b(historia|cuento|poema|canción|cancion|guion|relato|ensayo)\b",
            r"\b(write|story|poem|song|imagine)\b",
        ];
        Self::build_tag_patterns(IntentionTag::Creative, &patterns)
    }

    fn build_technical_patterns() -> TagPatterns {
        let patterns = [
            r"\b(machine\s+learning|deep\s+learning|inteligencia\s+artificial|big\s+data)\b",
            r"\b(algoritmo|algoritmos|programación|programacion|programar|código|codigo|software)\b",
            r"\b(api|sql|python|javascript|rust|java|base\s+de\s+datos|redes?\s+neuronal(es)?)\b",
            r"\b(code|programming|database|server|framework|deploy)\b",
        ];
        Self::build_tag_patterns(IntentionTag::Technical, &patterns)
    }

    fn build_tag_patterns(tag: IntentionTag, patterns: &[&str]) -> TagPatterns {
        TagPatterns {
            tag,
            regex_set: RegexSet::new(patterns).expect("Invalid regex patterns"),
        }
    }
}

impl Default for IntentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> IntentCatalog {
        IntentCatalog::new()
    }

    #[test]
    fn learning_and_technical() {
        let tags =
            catalog().detect_intention("¿Cómo funciona el machine learning aplicado a diagnósticos médicos?");
        assert!(tags.contains(&IntentionTag::Learning));
        assert!(tags.contains(&IntentionTag::Technical));
        assert!(!tags.contains(&IntentionTag::General));
    }

    #[test]
    fn context_prefers_learning() {
        let context =
            catalog().detect_context("¿Cómo funciona el machine learning aplicado a diagnósticos médicos?");
        assert_eq!(context, IntentionTag::Learning);
    }

    #[test]
    fn problem_solving() {
        let c = catalog();
        let prompt = "¿Qué hago si me duele la panza?";
        assert!(c.detect_intention(prompt).contains(&IntentionTag::ProblemSolving));
        assert_eq!(c.detect_context(prompt), IntentionTag::ProblemSolving);
    }

    #[test]
    fn creative_before_technical_in_context() {
        let prompt = "Escribe un poema sobre Python";
        let c = catalog();
        let tags = c.detect_intention(prompt);
        assert!(tags.contains(&IntentionTag::Creative));
        assert!(tags.contains(&IntentionTag::Technical));
        assert_eq!(c.detect_context(prompt), IntentionTag::Creative);
    }

    #[test]
    fn unmatched_is_general() {
        let c = catalog();
        let prompt = "Buenos días a todos";
        assert_eq!(
            c.detect_intention(prompt),
            BTreeSet::from([IntentionTag::General])
        );
        assert_eq!(c.detect_context(prompt), IntentionTag::General);
    }

    #[test]
    fn word_boundaries_respected() {
        // "rustico" must not count as Rust
        let tags = catalog().detect_intention("Decoración de estilo rustico para salones");
        assert!(!tags.contains(&IntentionTag::Technical));
    }

    #[test]
    fn deterministic() {
        let c = catalog();
        let prompt = "Explícame cómo programar una API en Rust";
        assert_eq!(c.detect_intention(prompt), c.detect_intention(prompt));
        assert_eq!(c.detect_context(prompt), c.detect_context(prompt));
    }
}
