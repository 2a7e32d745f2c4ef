//! Interviewer tools: schemas sent to the model and their local execution.

use std::sync::Arc;

use base64::Engine;
use intervue_verify::VerificationDispatcher;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AgentError;
use crate::memory::{MemoryCommand, MemoryStore};
use crate::messages::{ApiMessage, ContentBlock, MessagesApi, MessagesRequest};
use crate::workspace::Workspace;

pub const READ_FILE: &str = "read_file";
pub const LIST_DIR: &str = "list_dir";
pub const FILE_SEARCH: &str = "file_search";
pub const GREP_SEARCH: &str = "grep_search";
pub const READ_PDF: &str = "read_pdf";
pub const MEMORY: &str = "memory";
pub const VERIFY_IN_BACKGROUND: &str = "do_authenticity_verification_on_background";
pub const EVALUATE_INTERVIEW: &str = "evaluate_interview";

const PDF_SYSTEM_PROMPT: &str =
    "Read the contents of the PDF given to you. Organize and convert it to markdown format.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadFileInput {
    path: String,
    start_line: Option<usize>,
    end_line: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct PathInput {
    path: String,
}

#[derive(Debug, Deserialize)]
struct PatternInput {
    pattern: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrepInput {
    query: String,
    before_context: Option<usize>,
    after_context: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct QuestionInput {
    question: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationInput {
    interview_results: String,
}

/// Converts PDF files to markdown with a small hosted model.
pub struct PdfReader {
    api: Arc<dyn MessagesApi>,
    model: String,
    max_tokens: u32,
}

impl PdfReader {
    pub fn new(api: Arc<dyn MessagesApi>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            api,
            model: model.into(),
            max_tokens,
        }
    }

    pub async fn to_markdown(&self, pdf: &[u8]) -> Result<String, AgentError> {
        let data = base64::engine::general_purpose::STANDARD.encode(pdf);
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(PDF_SYSTEM_PROMPT.to_string()),
            messages: vec![ApiMessage::user(vec![ContentBlock::pdf(data)])],
            tools: vec![],
        };
        Ok(self.api.create(&request).await?.text())
    }
}

/// Everything the interviewer can call during a turn.
pub struct Toolbox {
    workspace: Workspace,
    memory: MemoryStore,
    dispatcher: Arc<VerificationDispatcher>,
    pdf: PdfReader,
}

impl Toolbox {
    pub fn new(
        workspace: Workspace,
        memory: MemoryStore,
        dispatcher: Arc<VerificationDispatcher>,
        pdf: PdfReader,
    ) -> Self {
        Self {
            workspace,
            memory,
            dispatcher,
            pdf,
        }
    }

    /// Tool definitions for the Messages request, hosted tools last.
    pub fn definitions(&self) -> Vec<Value> {
        vec![
            json!({
                "name": READ_FILE,
                "description": "Read the contents of a file. Specify the line range you are interested in; call again for more content.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "The path to the file to read."},
                        "startLine": {"type": "integer", "description": "First line to read (1-based). Defaults to the first line."},
                        "endLine": {"type": "integer", "description": "Last line to read, inclusive. Defaults to the last line."}
                    },
                    "required": ["path"]
                }
            }),
            json!({
                "name": LIST_DIR,
                "description": "List the contents of a directory. Names ending in / are folders, otherwise files.",
                "input_schema": {
                    "type": "object",
                    "properties": {"path": {"type": "string", "description": "The directory to list."}},
                    "required": ["path"]
                }
            }),
            json!({
                "name": FILE_SEARCH,
                "description": "Search for files in the workspace by glob pattern, matched from the workspace root. Returns paths only. Examples: **/*.{js,ts} for all js/ts files; src/** for everything under src; **/foo/**/*.js for js files under any foo folder.",
                "input_schema": {
                    "type": "object",
                    "properties": {"pattern": {"type": "string", "description": "The glob pattern to search for."}},
                    "required": ["pattern"]
                }
            }),
            json!({
                "name": GREP_SEARCH,
                "description": "Text search across the markdown files in the workspace. Use when you know the exact string.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "The text to search for. May be a regex."},
                        "beforeContext": {"type": "integer", "description": "Lines to include before each match."},
                        "afterContext": {"type": "integer", "description": "Lines to include after each match."}
                    },
                    "required": ["query"]
                }
            }),
            json!({
                "name": READ_PDF,
                "description": "Read the contents of a PDF file as markdown.",
                "input_schema": {
                    "type": "object",
                    "properties": {"path": {"type": "string", "description": "The path to the PDF file."}},
                    "required": ["path"]
                }
            }),
            json!({
                "name": VERIFY_IN_BACKGROUND,
                "description": "Check the accuracy of the interviewee's answers or retrieve additional information behind the scenes. Returns a unique id at once; the result arrives in a later turn.",
                "input_schema": {
                    "type": "object",
                    "properties": {"question": {"type": "string", "description": "The question to check."}},
                    "required": ["question"]
                }
            }),
            json!({
                "name": EVALUATE_INTERVIEW,
                "description": "Evaluate the interview and pass the interview results.",
                "input_schema": {
                    "type": "object",
                    "properties": {"interviewResults": {"type": "string", "description": "The interview results to evaluate."}},
                    "required": ["interviewResults"]
                }
            }),
            json!({"type": "memory_20250818", "name": MEMORY}),
            json!({"type": "web_search_20250305", "name": "web_search"}),
            json!({"type": "web_fetch_20250910", "name": "web_fetch"}),
        ]
    }

    /// Run one client-side tool call and return its text output.
    pub async fn call(&self, name: &str, input: Value) -> Result<String, AgentError> {
        match name {
            READ_FILE => {
                let input: ReadFileInput = serde_json::from_value(input)?;
                self.workspace
                    .read_file(&input.path, input.start_line, input.end_line)
            }
            LIST_DIR => {
                let input: PathInput = serde_json::from_value(input)?;
                Ok(serde_json::to_string(&self.workspace.list_dir(&input.path)?)?)
            }
            FILE_SEARCH => {
                let input: PatternInput = serde_json::from_value(input)?;
                Ok(serde_json::to_string(&self.workspace.file_search(&input.pattern)?)?)
            }
            GREP_SEARCH => {
                let input: GrepInput = serde_json::from_value(input)?;
                let files = self.workspace.grep_search(
                    &input.query,
                    input.before_context.unwrap_or(0),
                    input.after_context.unwrap_or(0),
                )?;
                Ok(json!({ "files": files }).to_string())
            }
            READ_PDF => {
                let input: PathInput = serde_json::from_value(input)?;
                let bytes = tokio::fs::read(self.workspace.resolve(&input.path)?).await?;
                self.pdf.to_markdown(&bytes).await
            }
            MEMORY => {
                let command: MemoryCommand = serde_json::from_value(input)?;
                self.memory.execute(command)
            }
            VERIFY_IN_BACKGROUND => {
                let input: QuestionInput = serde_json::from_value(input)?;
                Ok(self.dispatcher.dispatch(input.question).to_string())
            }
            EVALUATE_INTERVIEW => {
                let input: EvaluationInput = serde_json::from_value(input)?;
                tracing::info!(results = %input.interview_results, "Interview evaluated");
                Ok(input.interview_results)
            }
            other => Err(AgentError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{MessagesResponse, ScriptedMessages};
    use intervue_verify::{Mailbox, ScriptedLookup};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        toolbox: Toolbox,
        pdf_api: Arc<ScriptedMessages>,
        dispatcher: Arc<VerificationDispatcher>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let context = dir.path().join("context");
        fs::create_dir_all(context.join("docs")).unwrap();
        fs::write(context.join("README.md"), "# Jane\nBuilt a cache in Rust\n").unwrap();
        fs::write(context.join("docs/design.md"), "LRU eviction\n").unwrap();
        fs::write(context.join("resume.pdf"), b"%PDF-1.4 fake").unwrap();

        let pdf_api = Arc::new(ScriptedMessages::new().respond(MessagesResponse::end_turn("# Resume")));
        let dispatcher = Arc::new(VerificationDispatcher::new(
            Arc::new(ScriptedLookup::new().reply(
                "Is Rust memory safe?",
                Duration::ZERO,
                r#"{"confidence": 1, "reason": "borrow checker", "answer": "yes"}"#,
            )),
            Mailbox::new(),
            Duration::from_secs(5),
        ));
        let toolbox = Toolbox::new(
            Workspace::new(&context),
            MemoryStore::new(dir.path().join("generated")),
            Arc::clone(&dispatcher),
            PdfReader::new(pdf_api.clone(), "claude-haiku-4-5", 4096),
        );
        Fixture {
            _dir: dir,
            toolbox,
            pdf_api,
            dispatcher,
        }
    }

    #[test]
    fn test_definitions_cover_all_tools() {
        let f = fixture();
        let names: Vec<String> = f
            .toolbox
            .definitions()
            .iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        for expected in [
            READ_FILE,
            LIST_DIR,
            FILE_SEARCH,
            GREP_SEARCH,
            READ_PDF,
            MEMORY,
            VERIFY_IN_BACKGROUND,
            EVALUATE_INTERVIEW,
            "web_search",
            "web_fetch",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[tokio::test]
    async fn test_read_file_with_camel_case_range() {
        let f = fixture();
        let out = f
            .toolbox
            .call(READ_FILE, json!({"path": "README.md", "startLine": 2, "endLine": 2}))
            .await
            .unwrap();
        assert_eq!(out, "Built a cache in Rust");
    }

    #[tokio::test]
    async fn test_list_dir_and_file_search_return_json_arrays() {
        let f = fixture();
        let listed = f.toolbox.call(LIST_DIR, json!({"path": "."})).await.unwrap();
        assert_eq!(listed, r#"["README.md","docs/","resume.pdf"]"#);

        let found = f.toolbox.call(FILE_SEARCH, json!({"pattern": "**/*.md"})).await.unwrap();
        assert_eq!(found, r#"["README.md","docs/design.md"]"#);
    }

    #[tokio::test]
    async fn test_grep_search_wraps_files() {
        let f = fixture();
        let out = f.toolbox.call(GREP_SEARCH, json!({"query": "LRU"})).await.unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["files"][0]["file"], "docs/design.md");
        assert_eq!(value["files"][0]["content"], "1: LRU eviction");
    }

    #[tokio::test]
    async fn test_read_pdf_sends_document_block() {
        let f = fixture();
        let out = f.toolbox.call(READ_PDF, json!({"path": "resume.pdf"})).await.unwrap();
        assert_eq!(out, "# Resume");

        let requests = f.pdf_api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "claude-haiku-4-5");
        let body = serde_json::to_value(&requests[0]).unwrap();
        assert_eq!(body["messages"][0]["content"][0]["type"], "document");
    }

    #[tokio::test]
    async fn test_memory_tool_round_trip() {
        let f = fixture();
        f.toolbox
            .call(MEMORY, json!({"command": "create", "path": "/memories/jane.md", "file_text": "strong on caching"}))
            .await
            .unwrap();
        let out = f
            .toolbox
            .call(MEMORY, json!({"command": "view", "path": "/memories/jane.md"}))
            .await
            .unwrap();
        assert_eq!(out, "strong on caching");
    }

    #[tokio::test]
    async fn test_verify_in_background_returns_id_and_delivers_result() {
        let f = fixture();
        let id = f
            .toolbox
            .call(VERIFY_IN_BACKGROUND, json!({"question": "Is Rust memory safe?"}))
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        assert!(f.dispatcher.shutdown(Duration::from_secs(5)).await);
        let drained = f.dispatcher.mailbox().drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].id().to_string(), id);
    }

    #[tokio::test]
    async fn test_evaluate_interview_echoes() {
        let f = fixture();
        let out = f
            .toolbox
            .call(EVALUATE_INTERVIEW, json!({"interviewResults": "hire"}))
            .await
            .unwrap();
        assert_eq!(out, "hire");
    }

    #[tokio::test]
    async fn test_errors() {
        let f = fixture();
        assert!(matches!(
            f.toolbox.call("shell", json!({})).await,
            Err(AgentError::UnknownTool(_))
        ));
        assert!(matches!(
            f.toolbox.call(READ_FILE, json!({"file": "README.md"})).await,
            Err(AgentError::InvalidInput(_))
        ));
        assert!(matches!(
            f.toolbox.call(READ_FILE, json!({"path": "../../etc/passwd"})).await,
            Err(AgentError::PathEscape(_))
        ));
    }
}
