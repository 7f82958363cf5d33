//! External-interpreter fallback runner.
//!
//! Spawns a script interpreter as a child process, captures its stdout,
//! and kills the child promptly when the run is cancelled. The
//! interpreter executable is resolved from an ordered candidate list via
//! `PATH`, so the same configuration works whether the host ships the
//! modern or the legacy interpreter.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::error::ProbeError;

use super::FallbackInterpreter;

/// Script handed to the interpreter when none is supplied.
///
/// Queries the instrumentation layer directly and prints one JSON object
/// shaped like [`crate::fallback::InterpreterPayload`].
const DEFAULT_SCRIPT: &str = r#"
$os = Get-CimInstance Win32_OperatingSystem
$lic = Get-CimInstance SoftwareLicensingProduct |
    Where-Object { $_.PartialProductKey } | Select-Object -First 1
[pscustomobject]@{
    product_name = $os.Caption
    build = $os.BuildNumber
    product_id = $os.SerialNumber
    partial_product_key = $lic.PartialProductKey
    license_status_code = $lic.LicenseStatus
} | ConvertTo-Json -Compress
"#;

/// [`FallbackInterpreter`] backed by a real child process.
pub struct ProcessInterpreter {
    candidates: Vec<String>,
    script: String,
}

impl ProcessInterpreter {
    /// Create a runner for the given interpreter candidates with the
    /// built-in licensing script.
    #[must_use]
    pub fn new(candidates: Vec<String>) -> Self {
        Self::with_script(candidates, DEFAULT_SCRIPT.to_string())
    }

    /// Create a runner with a custom script.
    #[must_use]
    pub fn with_script(candidates: Vec<String>, script: String) -> Self {
        Self { candidates, script }
    }

    /// Resolve the first candidate found on `PATH`.
    #[must_use]
    pub fn resolve(candidates: &[String]) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        for candidate in candidates {
            for dir in std::env::split_paths(&path) {
                let direct = dir.join(candidate);
                if direct.is_file() {
                    return Some(direct);
                }
                #[cfg(windows)]
                {
                    let exe = dir.join(format!("{candidate}.exe"));
                    if exe.is_file() {
                        return Some(exe);
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl FallbackInterpreter for ProcessInterpreter {
    async fn collect(&self, cancel: &CancellationToken) -> Result<String, ProbeError> {
        let executable = Self::resolve(&self.candidates).ok_or_else(|| {
            ProbeError::unavailable(format!(
                "no interpreter found on PATH (tried {})",
                self.candidates.join(", ")
            ))
        })?;
        debug!(interpreter = %executable.display(), "spawning fallback interpreter");

        let mut child = Command::new(&executable)
            .arg("-NoProfile")
            .arg("-Command")
            .arg(&self.script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeError::unavailable(format!("failed to spawn interpreter: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProbeError::parse("interpreter stdout was not captured"))?;

        let outcome = tokio::select! {
            () = cancel.cancelled() => None,
            result = read_and_wait(&mut child, &mut stdout) => Some(result),
        };
        match outcome {
            Some(result) => result,
            None => {
                // Reap the child before reporting so no orphan survives
                // the cancelled run.
                let _ = child.kill().await;
                Err(ProbeError::unavailable("interpreter run cancelled"))
            }
        }
    }
}

async fn read_and_wait(
    child: &mut tokio::process::Child,
    stdout: &mut tokio::process::ChildStdout,
) -> Result<String, ProbeError> {
    use tokio::io::AsyncReadExt;

    let mut output = String::new();
    stdout
        .read_to_string(&mut output)
        .await
        .map_err(|e| ProbeError::parse(format!("interpreter output was not text: {e}")))?;
    let status = child
        .wait()
        .await
        .map_err(|e| ProbeError::unavailable(format!("interpreter did not exit cleanly: {e}")))?;
    if !status.success() {
        return Err(ProbeError::native(
            status.code().unwrap_or(-1),
            "interpreter exited with failure".to_string(),
        ));
    }
    Ok(output)
}
