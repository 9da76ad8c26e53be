//! Script synthesis: few-shot generation prompts, replay prompts, and
//! response parsing.

use std::sync::OnceLock;

use regex::Regex;

use crate::corpus::ExampleCorpus;
use crate::embedding::EmbeddingService;
use crate::error::{EncoreError, Result};
use crate::llm::LlmService;
use crate::model::CapturedEvent;
use crate::retrieval::{select_few_shot, FewShot, DEFAULT_K_FAIL, DEFAULT_K_SUCCESS};

/// System message for general script generation.
pub const SYSTEM_PROMPT: &str = "\
You are a macOS automation agent. Always reply ONLY with a complete runnable \
script, wrapped in a triple-back-tick code block.

SAFETY & STABILITY RULES
1. Never embed API keys or credentials in scripts.
2. Check app availability before sending commands; launch the app if needed.
3. Use try/on error blocks generously to handle failures gracefully.
4. Avoid hard-coded delays; poll for the target condition instead.
5. Never assume window indexes are stable; reference by name or title.

INTELLIGENCE & ADAPTABILITY RULES
6. Query current state first, then act (e.g. check a checkbox before toggling).
7. Fall back on UI scripting (System Events) for apps without scripting APIs.
8. Standardize window-focus logic (set frontmost, activate, etc.).
9. Always test for permissions and enablement; detect missing Accessibility rights.";

/// System message for event-log replay synthesis.
pub const REPLAY_SYSTEM_PROMPT: &str = "You are an expert in macOS AppleScript automation.";

/// Working script shown to the model as a structural template for replay
/// output: banner comments, a cliclick path helper that aborts early, and a
/// foreground-activation step before any clicks.
const REPLAY_WORKING_EXAMPLE: &str = r#"(*
  ----------------------------------------------------------------------
  Replay of captured browser actions
  Requirements  :  - the target application
                   - "cliclick" utility   ->  brew install cliclick
  ----------------------------------------------------------------------
*)

------------------------------------------------------------
-- Helper: find the first "cliclick" available on $PATH
------------------------------------------------------------
on cliPath()
    try
        return (do shell script "command -v cliclick") & " "
    on error
        display dialog "The helper utility 'cliclick' isn't installed or isn't on your PATH.\n\nInstall it with Homebrew:\n    brew install cliclick" buttons {"OK"} default button 1
        error number -128
    end try
end cliPath

property c : cliPath() -- prepend to every "cliclick" shell command

------------------------------------------------------------
-- 1. Bring the application to the foreground
------------------------------------------------------------
tell application "Google Chrome" to activate
delay 0.3

------------------------------------------------------------
-- 2. Click the new-tab button  (coords 1216 x 52)
------------------------------------------------------------
do shell script c & "c:1216,52"
delay 0.3

------------------------------------------------------------
-- 3. Type into the focused field
------------------------------------------------------------
tell application "System Events" to keystroke "example query"
delay 0.5"#;

/// Drives prompt assembly and response parsing around the LLM service.
pub struct ScriptSynthesizer {
    llm: LlmService,
    embedding: EmbeddingService,
}

impl ScriptSynthesizer {
    pub fn new(llm: LlmService, embedding: EmbeddingService) -> Self {
        Self { llm, embedding }
    }

    /// Few-shot generation: embed the request, pull the nearest worked
    /// examples and near-miss failures from the corpus, and synthesize a new
    /// script. The corpus is backfilled first so every record can be ranked.
    pub async fn generate(&self, prompt: &str, corpus: &mut ExampleCorpus) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(EncoreError::InvalidInput("empty generation prompt".into()));
        }

        corpus.ensure_embeddings(&self.embedding).await?;
        let query_embedding = self.embedding.embed(prompt).await?;
        let shots = select_few_shot(
            &query_embedding,
            corpus.successes(),
            corpus.failures(),
            DEFAULT_K_SUCCESS,
            DEFAULT_K_FAIL,
        );

        let user_prompt = build_few_shot_prompt(&shots, prompt);
        tracing::debug!(
            successes = shots.successes.len(),
            failures = shots.failures.len(),
            "synthesizing script"
        );

        let reply = self.llm.generate(&user_prompt, Some(SYSTEM_PROMPT)).await?;
        extract_code_block(&reply)
    }

    /// Replay synthesis: turn a captured event log into a runnable
    /// AppleScript following the working-example template.
    pub async fn replay_script(&self, events: &[CapturedEvent]) -> Result<String> {
        let prompt = build_replay_prompt(events)?;
        let reply = self
            .llm
            .generate(&prompt, Some(REPLAY_SYSTEM_PROMPT))
            .await?;
        let code = strip_code_fences(&reply);
        if code.is_empty() {
            return Err(EncoreError::GenerationFormat { reply });
        }
        Ok(code)
    }
}

/// Assemble the few-shot user message: worked examples as fenced blocks,
/// failed prompts as cautionary bullets, then the new request.
pub fn build_few_shot_prompt(shots: &FewShot<'_>, prompt: &str) -> String {
    let mut out = String::new();
    for ex in &shots.successes {
        out.push_str(&format!(
            "### Good Example\nUser: {}\nAssistant:\n```applescript\n{}\n```\n\n",
            ex.prompt, ex.code
        ));
    }
    if !shots.failures.is_empty() {
        out.push_str("### Avoid These Patterns\n");
        for ex in &shots.failures {
            out.push_str(&format!("- {}\n", ex.prompt));
        }
        out.push('\n');
    }
    out.push_str(&format!("### New Request\n{prompt}"));
    out
}

/// Assemble the replay user message from a captured event log.
pub fn build_replay_prompt(events: &[CapturedEvent]) -> Result<String> {
    if events.is_empty() {
        return Err(EncoreError::InvalidInput(
            "no captured events to replay".into(),
        ));
    }

    let mut log_lines = Vec::with_capacity(events.len());
    for event in events {
        log_lines.push(serde_json::to_string(event)?);
    }

    Ok(format!(
        "You are an expert in macOS automation.\n\
         ALWAYS strictly follow these rules for generating AppleScript with \
         cliclick, and use the following working script as a template.\n\n\
         WORKING EXAMPLE:\n\n{example}\n\n---\n\n\
         Now, convert the following macOS mouse and keyboard event log into a \
         complete, runnable AppleScript that will reproduce the actions. \
         The output MUST:\n\
         - Use the same structure, banners, and helper handler as the example.\n\
         - Put all coordinates and delays in a user-tunable block as properties.\n\
         - Use cliclick for all mouse clicks, and System Events for keystrokes.\n\
         - Add comments for each step.\n\
         - Never use hard-coded paths or magic numbers outside the user-tunable block.\n\
         - Abort early if cliclick is not found.\n\
         - Only output the AppleScript code, nothing else.\n\n\
         EVENT LOG (JSONL):\n{log}",
        example = REPLAY_WORKING_EXAMPLE,
        log = log_lines.join("\n"),
    ))
}

fn code_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:\w+)?\s*(.+?)\s*```").expect("static pattern compiles")
    })
}

/// Extract the first fenced code block from a model reply. A reply with no
/// block is a format error carrying the raw text, never an empty script.
pub fn extract_code_block(reply: &str) -> Result<String> {
    match code_block_regex().captures(reply) {
        Some(caps) => Ok(caps[1].to_string()),
        None => Err(EncoreError::GenerationFormat {
            reply: reply.to_string(),
        }),
    }
}

/// Lenient fence removal for replay replies: the model is told to output
/// bare AppleScript, but fences still appear occasionally.
pub fn strip_code_fences(reply: &str) -> String {
    if let Some(caps) = code_block_regex().captures(reply) {
        return caps[1].to_string();
    }
    reply
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, ExampleRecord, MouseButton};
    use crate::retrieval::FewShot;

    fn record(prompt: &str, code: &str, success: bool) -> ExampleRecord {
        ExampleRecord::new(prompt, code, success)
    }

    #[test]
    fn test_few_shot_prompt_sections() {
        let successes = vec![record("open safari", "tell application \"Safari\" to activate", true)];
        let failures = vec![record("quit finder", "-- bad", false)];
        let shots = FewShot {
            successes: successes.iter().collect(),
            failures: failures.iter().collect(),
        };
        let prompt = build_few_shot_prompt(&shots, "open chrome");

        assert!(prompt.contains("### Good Example"));
        assert!(prompt.contains("User: open safari"));
        assert!(prompt.contains("tell application \"Safari\" to activate"));
        assert!(prompt.contains("### Avoid These Patterns"));
        assert!(prompt.contains("- quit finder"));
        assert!(prompt.ends_with("### New Request\nopen chrome"));
        // Failure code never appears, only the prompt that failed
        assert!(!prompt.contains("-- bad"));
    }

    #[test]
    fn test_few_shot_prompt_no_failures_omits_section() {
        let shots = FewShot::default();
        let prompt = build_few_shot_prompt(&shots, "open chrome");
        assert!(!prompt.contains("Avoid These Patterns"));
        assert_eq!(prompt, "### New Request\nopen chrome");
    }

    #[test]
    fn test_replay_prompt_embeds_event_log() {
        let events = vec![
            CapturedEvent::now(EventKind::MouseClick {
                x: 100.0,
                y: 200.0,
                button: MouseButton::Left,
                pressed: true,
            }),
            CapturedEvent::now(EventKind::KeyPress {
                key: "a".into(),
                context: None,
            }),
        ];
        let prompt = build_replay_prompt(&events).unwrap();
        assert!(prompt.contains("EVENT LOG (JSONL):"));
        assert!(prompt.contains(r#""kind":"mouse_click""#));
        assert!(prompt.contains(r#""kind":"key_press""#));
        assert!(prompt.contains("cliclick"));
        assert!(prompt.contains("WORKING EXAMPLE:"));
    }

    #[test]
    fn test_replay_prompt_empty_log_errors() {
        let result = build_replay_prompt(&[]);
        assert!(matches!(result, Err(EncoreError::InvalidInput(_))));
    }

    #[test]
    fn test_extract_code_block_with_language() {
        let reply = "Here you go:\n```applescript\ntell application \"Safari\" to activate\n```\nDone.";
        let code = extract_code_block(reply).unwrap();
        assert_eq!(code, "tell application \"Safari\" to activate");
    }

    #[test]
    fn test_extract_code_block_plain_fence() {
        let reply = "```\ndisplay dialog \"hi\"\n```";
        let code = extract_code_block(reply).unwrap();
        assert_eq!(code, "display dialog \"hi\"");
    }

    #[test]
    fn test_extract_code_block_takes_first() {
        let reply = "```\nfirst\n```\ntext\n```\nsecond\n```";
        assert_eq!(extract_code_block(reply).unwrap(), "first");
    }

    #[test]
    fn test_extract_code_block_missing_is_format_error() {
        let reply = "I cannot help with that.";
        match extract_code_block(reply) {
            Err(EncoreError::GenerationFormat { reply: raw }) => {
                assert_eq!(raw, "I cannot help with that.");
            }
            other => panic!("expected GenerationFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_strip_code_fences_fenced() {
        let reply = "```applescript\ntell application \"Safari\" to activate\n```";
        assert_eq!(
            strip_code_fences(reply),
            "tell application \"Safari\" to activate"
        );
    }

    #[test]
    fn test_strip_code_fences_bare_text() {
        let reply = "  tell application \"Safari\" to activate  ";
        assert_eq!(
            strip_code_fences(reply),
            "tell application \"Safari\" to activate"
        );
    }

    #[test]
    fn test_strip_code_fences_unclosed_fence() {
        let reply = "```applescript\ntell application \"Safari\" to activate";
        assert_eq!(
            strip_code_fences(reply),
            "tell application \"Safari\" to activate"
        );
    }
}
