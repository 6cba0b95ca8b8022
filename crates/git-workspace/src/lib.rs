//! Git operations over a single sandboxed working tree: clone, branch,
//! diff, commit, and patch export.
//!
//! Every function here is free-standing and takes the working tree path
//! explicitly rather than owning any long-lived state — the task runner
//! owns the sandbox lifetime, this crate only knows how to drive `git2`
//! against whatever path it's given.

mod error;
mod types;

pub use error::{CloneReason, GitError, Result, classify_clone_error};
pub use types::{DiffStats, FileChange, MAX_FILE_DIFF_BYTES, WorkspaceDiff};

use std::path::Path;

use git2::{Cred, FetchOptions, RemoteCallbacks, build::RepoBuilder};

/// Clones `repo_url` at `branch` into `dest`.
///
/// The credential, if present, is supplied only through the libgit2
/// credentials callback at fetch time — it is never interpolated into
/// `repo_url`, so it can never end up in a clone error message or in
/// `git2`'s own logging of the remote URL.
pub fn clone(dest: &Path, repo_url: &str, branch: &str, credential: Option<&str>) -> Result<git2::Repository> {
    let _span = tracing::info_span!("git.clone", dest = %dest.display(), branch = %branch).entered();

    let credential = credential.map(|s| s.to_string());
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, _allowed| {
        if let Some(token) = &credential {
            Cred::userpass_plaintext(username_from_url.unwrap_or("x-access-token"), token)
        } else {
            Cred::default()
        }
    });

    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks);

    let repo = RepoBuilder::new()
        .fetch_options(fetch_opts)
        .branch(branch)
        .clone(repo_url, dest)
        .map_err(|e| GitError::Clone {
            reason: classify_clone_error(&e),
            message: "clone failed".to_string(),
        })?;

    tracing::info!(dest = %dest.display(), "repository cloned");
    Ok(repo)
}

/// Creates and checks out a deterministically named branch on top of
/// `base_branch`: `ai/<agent>-<task_id>-<short_ts>`.
pub fn create_branch(repo: &git2::Repository, agent: &str, task_id: i64, base_branch: &str) -> Result<String> {
    let short_ts = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let branch_name = format!("ai/{agent}-{task_id}-{short_ts}");

    let base_ref = repo
        .find_branch(base_branch, git2::BranchType::Local)
        .or_else(|_| repo.find_branch(&format!("origin/{base_branch}"), git2::BranchType::Remote))
        .map_err(|e| GitError::Branch(e.message().to_string()))?;
    let base_commit = base_ref
        .get()
        .peel_to_commit()
        .map_err(|e| GitError::Branch(e.message().to_string()))?;

    repo.branch(&branch_name, &base_commit, false)
        .map_err(|e| GitError::Branch(e.message().to_string()))?;

    let obj = repo
        .revparse_single(&format!("refs/heads/{branch_name}"))
        .map_err(|e| GitError::Branch(e.message().to_string()))?;
    repo.checkout_tree(&obj, None)
        .map_err(|e| GitError::Branch(e.message().to_string()))?;
    repo.set_head(&format!("refs/heads/{branch_name}"))
        .map_err(|e| GitError::Branch(e.message().to_string()))?;

    tracing::info!(branch = %branch_name, "branch created");
    Ok(branch_name)
}

fn normalize_posix(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Computes the working-tree diff against the index (which is refreshed
/// against HEAD first so untracked files are included), returning both
/// the unified text and the structured per-file records in one snapshot
/// so the two forms never disagree with each other.
pub fn diff(repo: &git2::Repository) -> Result<WorkspaceDiff> {
    let mut index = repo.index().map_err(|e| GitError::Diff(e.message().to_string()))?;
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .map_err(|e| GitError::Diff(e.message().to_string()))?;
    index.write().map_err(|e| GitError::Diff(e.message().to_string()))?;

    let head_tree = repo
        .head()
        .and_then(|h| h.peel_to_tree())
        .map_err(|e| GitError::Diff(e.message().to_string()))?;

    let git_diff = repo
        .diff_tree_to_index(Some(&head_tree), Some(&index), None)
        .map_err(|e| GitError::Diff(e.message().to_string()))?;

    let mut unified_text = String::new();
    git_diff
        .print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            let origin = line.origin();
            if origin == '+' || origin == '-' || origin == ' ' {
                unified_text.push(origin);
            }
            unified_text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .map_err(|e| GitError::Diff(e.message().to_string()))?;

    let stats = git_diff.stats().map_err(|e| GitError::Diff(e.message().to_string()))?;

    let mut files = Vec::new();
    for delta in git_diff.deltas() {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(normalize_posix)
            .unwrap_or_default();
        let binary = delta.flags().is_binary();

        let (before, after, truncated) = if binary {
            (None, None, false)
        } else {
            let before = read_blob(repo, delta.old_file().id());
            let after = read_blob(repo, delta.new_file().id());
            let truncated = before.as_ref().is_some_and(|b| b.len() > MAX_FILE_DIFF_BYTES)
                || after.as_ref().is_some_and(|a| a.len() > MAX_FILE_DIFF_BYTES);
            (
                before.map(|b| truncate_text(&b)),
                after.map(|a| truncate_text(&a)),
                truncated,
            )
        };

        files.push(FileChange {
            path,
            before,
            after,
            binary,
            truncated,
        });
    }

    Ok(WorkspaceDiff {
        unified_text,
        files,
        stats: DiffStats {
            files: stats.files_changed(),
            additions: stats.insertions(),
            deletions: stats.deletions(),
        },
    })
}

fn read_blob(repo: &git2::Repository, oid: git2::Oid) -> Option<String> {
    if oid.is_zero() {
        return None;
    }
    repo.find_blob(oid)
        .ok()
        .map(|b| String::from_utf8_lossy(b.content()).into_owned())
}

fn truncate_text(text: &str) -> String {
    if text.len() > MAX_FILE_DIFF_BYTES {
        let mut truncated = text.as_bytes()[..MAX_FILE_DIFF_BYTES].to_vec();
        truncated.extend_from_slice(b"\n...[truncated]...\n");
        String::from_utf8_lossy(&truncated).into_owned()
    } else {
        text.to_string()
    }
}

/// Builds the deterministic commit subject for a task's change. The Git
/// Workspace never calls back into the agent to generate this message —
/// the agent's diff is the deliverable, commit messages are mechanical.
pub fn build_commit_message(agent: &str, task_id: i64, prompt: &str) -> String {
    let summary: String = prompt.chars().take(60).collect();
    format!("{agent} task #{task_id}: {summary}")
}

/// Stages everything and commits. Refuses with [`GitError::EmptyDiff`] if
/// there is nothing to commit.
pub fn commit(repo: &git2::Repository, message: &str) -> Result<String> {
    let snapshot = diff(repo)?;
    if snapshot.is_empty() {
        return Err(GitError::EmptyDiff);
    }

    let mut index = repo.index().map_err(|e| GitError::Commit(e.message().to_string()))?;
    let tree_oid = index.write_tree().map_err(|e| GitError::Commit(e.message().to_string()))?;
    let tree = repo.find_tree(tree_oid).map_err(|e| GitError::Commit(e.message().to_string()))?;

    let signature =
        git2::Signature::now("task-engine", "task-engine@localhost").map_err(|e| GitError::Commit(e.message().to_string()))?;

    let parent = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(|e| GitError::Commit(e.message().to_string()))?;

    let commit_oid = repo
        .commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])
        .map_err(|e| GitError::Commit(e.message().to_string()))?;

    tracing::info!(commit = %commit_oid, "commit created");
    Ok(commit_oid.to_string())
}

/// Exports the last commit as format-patch-style bytes, suitable for
/// re-application with `git am`.
pub fn patch(repo: &git2::Repository) -> Result<Vec<u8>> {
    let head = repo.head().map_err(|e| GitError::Patch(e.message().to_string()))?;
    let commit = head.peel_to_commit().map_err(|e| GitError::Patch(e.message().to_string()))?;
    let parent = commit.parent(0).map_err(|e| GitError::Patch(e.message().to_string()))?;

    let commit_tree = commit.tree().map_err(|e| GitError::Patch(e.message().to_string()))?;
    let parent_tree = parent.tree().map_err(|e| GitError::Patch(e.message().to_string()))?;

    let git_diff = repo
        .diff_tree_to_tree(Some(&parent_tree), Some(&commit_tree), None)
        .map_err(|e| GitError::Patch(e.message().to_string()))?;

    let mut email_opts = git2::EmailCreateOptions::new();
    let email = git2::Email::from_diff(
        &git_diff,
        1,
        1,
        &commit.id(),
        commit.summary().unwrap_or_default(),
        commit.body().unwrap_or_default(),
        &commit.author(),
        &mut email_opts,
    )
    .map_err(|e| GitError::Patch(e.message().to_string()))?;

    Ok(email.as_slice().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn init_repo_with_commit(dir: &Path) -> git2::Repository {
        let repo = git2::Repository::init(dir).unwrap();
        fs::write(dir.join("README.md"), "hello\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        let tree_oid = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial commit", &tree, &[])
            .unwrap();
        drop(tree);
        repo
    }

    #[test]
    fn diff_is_empty_on_pristine_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo_with_commit(dir.path());
        let snapshot = diff(&repo).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn diff_detects_modified_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo_with_commit(dir.path());
        fs::write(dir.path().join("README.md"), "hello\nworld\n").unwrap();

        let snapshot = diff(&repo).unwrap();
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.files.len(), 1);
        assert!(snapshot.unified_text.contains("world"));
    }

    #[test]
    fn commit_refuses_empty_diff() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo_with_commit(dir.path());
        let err = commit(&repo, "nothing to see here").unwrap_err();
        assert!(matches!(err, GitError::EmptyDiff));
    }

    #[test]
    fn commit_succeeds_after_modification() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo_with_commit(dir.path());
        fs::write(dir.path().join("README.md"), "hello\nworld\n").unwrap();

        let hash = commit(&repo, "append world").unwrap();
        assert_eq!(hash.len(), 40);
        assert!(diff(&repo).unwrap().is_empty());
    }

    #[test]
    fn commit_message_is_deterministic_and_bounded() {
        let msg = build_commit_message("claude", 42, "do a very long thing that exceeds sixty characters for sure");
        assert!(msg.starts_with("claude task #42: "));
        assert!(msg.len() <= "claude task #42: ".len() + 60);
    }
}
