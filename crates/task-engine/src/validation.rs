//! Boundary input validation. Nothing past this module ever has to check
//! these shapes again.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::{EngineError, Result};

const MAX_PROMPT_LEN: usize = 10_000;

static REPO_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://[A-Za-z0-9.-]+/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").unwrap());

static TARGET_BRANCH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._/-]{1,255}$").unwrap());

pub fn repo_url(value: &str) -> Result<()> {
    if REPO_URL.is_match(value) {
        Ok(())
    } else {
        Err(EngineError::Validation(format!("repo_url {value:?} is not a valid https provider URL")))
    }
}

pub fn target_branch(value: &str) -> Result<()> {
    if TARGET_BRANCH.is_match(value) {
        Ok(())
    } else {
        Err(EngineError::Validation(format!("target_branch {value:?} contains disallowed characters")))
    }
}

pub fn prompt(value: &str) -> Result<()> {
    if value.len() > MAX_PROMPT_LEN {
        return Err(EngineError::Validation(format!("prompt exceeds {MAX_PROMPT_LEN} bytes")));
    }
    if value.chars().any(|c| c.is_control() && c != '\t' && c != '\n') {
        return Err(EngineError::Validation("prompt contains disallowed control characters".to_string()));
    }
    Ok(())
}

pub fn agent_kind(value: &str) -> Result<agent_invoker::AgentKind> {
    value
        .parse()
        .map_err(|_| EngineError::Validation(format!("agent_kind {value:?} must be one of claude, codex")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_repo_url() {
        assert!(repo_url("https://github.com/acme/widgets").is_ok());
    }

    #[test]
    fn rejects_repo_url_without_scheme() {
        assert!(repo_url("github.com/acme/widgets").is_err());
    }

    #[test]
    fn rejects_repo_url_with_shell_metacharacters() {
        assert!(repo_url("https://github.com/acme/widgets; rm -rf /").is_err());
    }

    #[test]
    fn accepts_branch_with_slashes() {
        assert!(target_branch("feature/my-branch_1.0").is_ok());
    }

    #[test]
    fn rejects_branch_with_spaces() {
        assert!(target_branch("my branch").is_err());
    }

    #[test]
    fn rejects_oversized_prompt() {
        let huge = "a".repeat(MAX_PROMPT_LEN + 1);
        assert!(prompt(&huge).is_err());
    }

    #[test]
    fn rejects_prompt_with_control_characters() {
        assert!(prompt("do the thing\u{0000}").is_err());
    }

    #[test]
    fn allows_tabs_and_newlines_in_prompt() {
        assert!(prompt("line one\nline two\tindented").is_ok());
    }

    #[test]
    fn rejects_unknown_agent_kind() {
        assert!(agent_kind("gpt5").is_err());
    }

    #[test]
    fn accepts_known_agent_kinds() {
        assert!(agent_kind("claude").is_ok());
        assert!(agent_kind("codex").is_ok());
    }
}
