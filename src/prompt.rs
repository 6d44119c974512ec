//! Prompt assembly for answer generation.

/// Separator placed between retrieved chunk texts in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

const TEMPLATE: &str = r#"
You are an intelligent assistant named 'Context AI'. You have access to the following context (excerpts from user documents).

CONTEXT FROM DOCUMENTS:
{context}

USER QUESTION:
{question}

INSTRUCTIONS:
1. **Structure your answer:** - Start with a direct answer in **bold**.
   - Use a "Key Details" section with bullet points for explanation.
   - Never write long paragraphs; break them up.
2. **Formatting:** Use Markdown (## Headers, * Bullets, **Bold**) strictly.
3. **Sources:** If the answer is in the document, mention it. If not, state you are using general knowledge.

EXAMPLE FORMAT:
**The project name is Vitalyze.ai.**

### Key Details
* It is an AI-powered health hub.
* The main goal is to simplify medical reports.
* It features a comparative mode and a simple explanation mode.
"#;

/// Join retrieved chunk texts, most relevant first, with a blank line between.
pub fn join_context<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Fill the fixed answer template. Pure: no I/O, same inputs give the same prompt.
///
/// Substitution is single-pass, so braces inside the context or question
/// are never re-expanded.
pub fn build_prompt(context: &str, question: &str) -> String {
    let (head, rest) = TEMPLATE.split_once("{context}").unwrap_or((TEMPLATE, ""));
    let (middle, tail) = rest.split_once("{question}").unwrap_or((rest, ""));

    let mut out = String::with_capacity(TEMPLATE.len() + context.len() + question.len());
    out.push_str(head);
    out.push_str(context);
    out.push_str(middle);
    out.push_str(question);
    out.push_str(tail);
    out
}
