//! Lexical complexity scoring.

use std::collections::HashSet;

use regex::Regex;

use crate::record::{ComplexityLevel, ComplexityReport};

/// Technical vocabulary counted towards complexity.
const TECHNICAL_TERMS: &[&str] = &[
    r"machine\s+learning",
    r"deep\s+learning",
    r"inteligencia\s+artificial",
    r"red(es)?\s+neuronal(es)?",
    r"big\s+data",
    r"base\s+de\s+datos",
    r"algoritmos?",
    r"api",
    r"sql",
    r"python",
    r"javascript",
    r"blockchain",
    r"criptograf[ií]a",
    r"servidor(es)?",
    r"framework",
    r"backend",
    r"frontend",
    r"kubernetes",
    r"docker",
    r"microservicios?",
    r"compilador(es)?",
];

/// Depth labels per level. The first entry is the one reported.
const DEPTH_LABELS: [(ComplexityLevel, [&str; 3]); 3] = [
    (
        ComplexityLevel::Basic,
        ["básico", "introductorio", "elemental"],
    ),
    (
        ComplexityLevel::Intermediate,
        ["intermedio", "moderado", "estándar"],
    ),
    (
        ComplexityLevel::Advanced,
        ["avanzado", "especializado", "experto"],
    ),
];

/// Returns the depth label for a level.
pub fn depth_label(level: ComplexityLevel) -> &'static str {
    DEPTH_LABELS
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, labels)| labels[0])
        .unwrap_or("básico")
}

/// Scores prompts by word counts and technical vocabulary.
pub struct ComplexityScorer {
    technical_terms: Vec<Regex>,
}

impl ComplexityScorer {
    pub fn new() -> Self {
        Self {
            technical_terms: TECHNICAL_TERMS
                .iter()
                .map(|t| Regex::new(&format!(r"\b{}\b", t)).expect("Invalid regex pattern"))
                .collect(),
        }
    }

    pub fn score(&self, text: &str) -> ComplexityReport {
        let text_lower = text.to_lowercase();
        let words: Vec<&str> = text_lower.split_whitespace().collect();
        let word_count = words.len();
        let unique_words = words.iter().collect::<HashSet<_>>().len();

        // each term counts once no matter how often it repeats
        let technical_term_count = self
            .technical_terms
            .iter()
            .filter(|r| r.is_match(&text_lower))
            .count();

        let mut level = ComplexityLevel::Basic;
        if word_count > 10 && unique_words > 8 {
            level = ComplexityLevel::Intermediate;
        }
        if technical_term_count > 0 || word_count > 15 {
            level = ComplexityLevel::Advanced;
        }

        ComplexityReport {
            word_count,
            unique_words,
            technical_term_count,
            level,
            depth_label: depth_label(level).to_string(),
        }
    }
}

impl Default for ComplexityScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> ComplexityScorer {
        ComplexityScorer::new()
    }

    #[test]
    fn short_prompt_is_basic() {
        let report = scorer().score("¿Cómo estudio mejor?");
        assert_eq!(report.word_count, 3);
        assert_eq!(report.unique_words, 3);
        assert_eq!(report.technical_term_count, 0);
        assert_eq!(report.level, ComplexityLevel::Basic);
        assert_eq!(report.depth_label, "básico");
    }

    #[test]
    fn technical_term_makes_advanced() {
        let report =
            scorer().score("¿Cómo funciona el machine learning aplicado a diagnósticos médicos?");
        assert_eq!(report.word_count, 9);
        assert_eq!(report.technical_term_count, 1);
        assert_eq!(report.level, ComplexityLevel::Advanced);
        assert_eq!(report.depth_label, "avanzado");
    }

    #[test]
    fn long_varied_prompt_is_intermediate() {
        let report = scorer()
            .score("Quiero saber cuáles son las mejores formas de comenzar a ahorrar dinero este año");
        assert_eq!(report.word_count, 14);
        assert_eq!(report.level, ComplexityLevel::Intermediate);
        assert_eq!(report.depth_label, "intermedio");
    }

    #[test]
    fn long_repetitive_prompt_stays_basic() {
        let report = scorer().score("uno uno uno uno uno dos dos dos dos dos tres");
        assert_eq!(report.word_count, 11);
        assert_eq!(report.unique_words, 3);
        assert_eq!(report.level, ComplexityLevel::Basic);
    }

    #[test]
    fn more_than_fifteen_words_is_advanced() {
        let prompt = "a b c d e f g h i j k l m n o p";
        let report = scorer().score(prompt);
        assert_eq!(report.word_count, 16);
        assert_eq!(report.level, ComplexityLevel::Advanced);
    }

    #[test]
    fn repeated_term_counts_once() {
        let report = scorer().score("python python python y más python");
        assert_eq!(report.technical_term_count, 1);
    }

    #[test]
    fn unique_words_are_case_insensitive() {
        let report = scorer().score("Hola hola HOLA");
        assert_eq!(report.unique_words, 1);
    }

    #[test]
    fn scoring_is_deterministic() {
        let s = scorer();
        let prompt = "Explica las redes neuronales y la inteligencia artificial";
        assert_eq!(s.score(prompt), s.score(prompt));
        assert_eq!(s.score(prompt).technical_term_count, 2);
    }

    #[test]
    fn depth_labels_are_first_entries() {
        assert_eq!(depth_label(ComplexityLevel::Basic), "básico");
        assert_eq!(depth_label(ComplexityLevel::Intermediate), "intermedio");
        assert_eq!(depth_label(ComplexityLevel::Advanced), "avanzado");
    }
}
