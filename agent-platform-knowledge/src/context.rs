//! Rendering retrieved chunks into prompt context.

use serde::{Deserialize, Serialize};

use crate::document::SearchResult;

/// Separator placed between chunks in an assembled context string.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const CONTEXT_HEADER: &str = "=== Knowledge Base Context ===";
const CONTEXT_FOOTER: &str = "=== End of Knowledge Base Context ===";
const CONTEXT_INSTRUCTION: &str = "Please use the above knowledge base information to answer the \
user's question accurately. If the knowledge base contains relevant information, prioritize it \
in your response.";

/// Context retrieved from one knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeContext {
    /// The knowledge base the context came from.
    pub knowledge_base_id: String,
    /// Retrieved chunk contents joined with [`CONTEXT_SEPARATOR`].
    pub context: String,
}

/// Join the contents of ranked results, in order, with [`CONTEXT_SEPARATOR`].
///
/// Returns an empty string when there are no results.
pub fn join_results(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.content.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Append retrieved knowledge-base context to an agent's system prompt.
///
/// Each context is labelled with its own knowledge-base ID. Returns the base
/// prompt unchanged when `contexts` is empty, and `None` when there is
/// neither a base prompt nor any context.
///
/// # Example
///
/// ```rust,ignore
/// let contexts = manager.collect_context(&agent.knowledge_bases, &message, 3).await;
/// let system_prompt = augment_system_prompt(Some(&agent.prompt_template), &contexts);
/// ```
pub fn augment_system_prompt(
    base_prompt: Option<&str>,
    contexts: &[KnowledgeContext],
) -> Option<String> {
    let base = base_prompt.filter(|p| !p.is_empty());
    if contexts.is_empty() {
        return base.map(str::to_string);
    }

    let mut block = format!("\n\n{CONTEXT_HEADER}\n");
    for entry in contexts {
        block.push_str(&format!(
            "\n[Knowledge Base {}]:\n{}",
            entry.knowledge_base_id, entry.context
        ));
    }
    block.push_str(&format!("\n{CONTEXT_FOOTER}\n\n{CONTEXT_INSTRUCTION}"));

    Some(match base {
        Some(base) => format!("{base}{block}"),
        None => block,
    })
}
