use sandbox::SandboxDriver;
use sandbox::SandboxHandle;

use crate::error::{AgentInvokeError, Result};

/// Resolves the first working executable among `candidates` by asking the
/// sandbox itself (`which <candidate>`), since the agent runs inside the
/// sandbox's filesystem, not the host's.
pub async fn resolve_executable(
    driver: &dyn SandboxDriver,
    handle: &SandboxHandle,
    candidates: &[&str],
    install_hint: &str,
) -> Result<String> {
    for candidate in candidates {
        let result = driver
            .run(
                handle,
                &["which".to_string(), candidate.to_string()],
                &[],
                None,
                std::time::Duration::from_secs(5),
            )
            .await;

        if let Ok(res) = result {
            if res.success() {
                let resolved = res.stdout_lossy().trim().to_string();
                if !resolved.is_empty() {
                    return Ok(resolved);
                }
            }
        }
    }

    Err(AgentInvokeError::AgentNotFound(install_hint.to_string()))
}
