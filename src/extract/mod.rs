//! # Extraction Module
//!
//! The document-understanding capability used by the structurer. It is a
//! two-call contract: document bytes to normalized markdown, then markdown to
//! a JSON object. Both calls are fallible and non-deterministic; callers must
//! not expect identical output for identical input.
//!
//! ## Key Components
//!
//! - `Extractor`: the capability trait
//! - `GeminiExtractor`: implementation backed by the Gemini `generateContent` API
//! - `MockExtractor`: deterministic stand-in for tests and offline runs
//! - `markdown_prompt` / `json_prompt`: the instructions sent with each call

pub mod error;
pub mod gemini;
pub mod mock;

pub use error::ExtractError;
pub use gemini::{GeminiConfig, GeminiExtractor};
pub use mock::MockExtractor;

use std::future::Future;

/// A fallible two-pass document extraction capability
pub trait Extractor: Send + Sync {
    /// First pass: raw document to normalized markdown
    fn document_to_markdown(
        &self,
        document: &[u8],
        mime_type: &str,
    ) -> impl Future<Output = Result<String, ExtractError>> + Send;

    /// Second pass: normalized markdown to a JSON object (as text)
    fn markdown_to_json(
        &self,
        markdown: &str,
        court_name: &str,
    ) -> impl Future<Output = Result<String, ExtractError>> + Send;
}

/// Instruction for the document-to-markdown pass
pub fn markdown_prompt() -> &'static str {
    r#"Transcribe this court cause list into markdown, keeping every piece of information exactly as printed.

Capture:
1. The court name and court number as printed
2. The judge names, spelled exactly as printed
3. The date of the list
4. The type of list (for example Daily, Advance or Supplementary)
5. Every listed matter, numbered as in the document, with its case number in bold,
   the parties on the following line (as "X Vs. Y"), and any other printed details

Rules:
- Do not summarise, interpret or add anything that is not in the document
- Keep the document's order and grouping, using headings, lists or tables
- Leave out anything that is not present rather than guessing
- Output only the markdown: no preamble, no closing remarks, no code fences"#
}

/// Instruction for the markdown-to-JSON pass
pub fn json_prompt(court_name: &str, markdown: &str) -> String {
    format!(
        r#"Extract the structured data from this court cause list markdown as one JSON object:

{{
  "court": "{court}",
  "courtNo": "COURT NO. X",
  "bench": "Judge names as printed",
  "cases": [
    {{
      "caseNumber": "Case number exactly as printed",
      "title": "Parties, e.g. X Vs. Y",
      "tags": ["short category labels"],
      "itemNumber": "Item number",
      "fileNumber": "File number if printed",
      "causeList": "List type, e.g. Daily List",
      "petitionerAdv": "Petitioner advocate",
      "respondentAdv": "Respondent advocate"
    }}
  ]
}}

Rules:
1. Include every listed matter, across all sections of the document
2. Numbered items, "ITEM NO." markers and case number patterns such as W.P.(C), CRL.A., FAO, RFA or ITA each indicate a matter
3. Copy case numbers exactly
4. Put all parties in "title"
5. Use null or an empty string for anything not printed
6. If no matters are found, return an empty "cases" array with the court details filled in
7. Return only the JSON object: no explanation and no code fences

Markdown:
{markdown}"#,
        court = court_name.to_uppercase(),
        markdown = markdown
    )
}
