//! Suggestion templates.

use std::collections::BTreeSet;

use crate::record::{
    ComplexityLevel, ComplexityReport, ContextTag, IntentionTag, Suggestion, SuggestionKind,
};

pub const LANGUAGE_FILTER: &str = "Utilice un lenguaje más respetuoso y constructivo.";
pub const INCOMPLETE_PROMPT: &str = "El prompt es demasiado corto. Proporcione más contexto.";
pub const EXPAND_PROMPT: &str =
    "Amplíe el prompt con más contexto y detalles para obtener una respuesta más precisa.";
pub const TECHNICAL_AUDIENCE: &str = "El prompt usa terminología técnica: la respuesta asumirá \
     una audiencia especializada. Indique su nivel si necesita una explicación más accesible.";

/// Templates per intention, in priority order. The first one is used.
fn templates(tag: IntentionTag) -> &'static [&'static str] {
    match tag {
        IntentionTag::Learning => &[
            "Indique su nivel de conocimiento previo para ajustar la profundidad de la explicación.",
            "Pida ejemplos concretos para afianzar el concepto.",
        ],
        IntentionTag::ProblemSolving => &[
            "Describa el problema, lo que ya intentó y el resultado que espera.",
            "Incluya mensajes de error o síntomas exactos.",
        ],
        IntentionTag::Creative => &[
            "Especifique el tono, la extensión y el público del texto que desea obtener.",
            "Mencione referencias o estilos que le gustaría imitar.",
        ],
        IntentionTag::Technical => &[
            "Mencione las tecnologías, versiones y restricciones relevantes.",
            "Indique el entorno donde se aplicará la solución.",
        ],
        IntentionTag::General => &[],
    }
}

/// Content warning for a sensitive keyword.
pub fn content_warning(keyword: &str) -> Suggestion {
    Suggestion::new(
        SuggestionKind::ContentWarning,
        format!(
            "El prompt contiene palabras sensibles relacionadas con {}.",
            keyword
        ),
    )
}

/// Builds suggestions from the heuristic results.
///
/// The context tag's template comes first, then the remaining intentions in
/// tag order, then one complexity-tier suggestion for basic or advanced prompts.
pub fn generate_suggestions(
    intentions: &BTreeSet<IntentionTag>,
    context: ContextTag,
    complexity: &ComplexityReport,
) -> Vec<Suggestion> {
    let ordered = intentions
        .contains(&context)
        .then_some(context)
        .into_iter()
        .chain(intentions.iter().copied().filter(|t| *t != context));

    let mut suggestions: Vec<Suggestion> = ordered
        .filter_map(|tag| templates(tag).first())
        .map(|template| Suggestion::new(SuggestionKind::Intention, *template))
        .collect();

    match complexity.level {
        ComplexityLevel::Basic => {
            suggestions.push(Suggestion::new(SuggestionKind::ExpandPrompt, EXPAND_PROMPT))
        }
        ComplexityLevel::Advanced => suggestions.push(Suggestion::new(
            SuggestionKind::TechnicalAudience,
            TECHNICAL_AUDIENCE,
        )),
        ComplexityLevel::Intermediate => {}
    }

    suggestions
}
