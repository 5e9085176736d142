//! `ScriptRunner` backed by the macOS `open` and `osascript` tools.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::{running_check_script, BridgeError, BridgeResult, ScriptRunner};
use crate::util::compact_text;

const OPEN_PATH: &str = "/usr/bin/open";

/// Runs scripts through `osascript -e`.
///
/// Every call brings the Notes app to the foreground; the scripting model
/// offers no way around it.
#[derive(Debug, Clone)]
pub struct OsascriptRunner {
    osascript_path: PathBuf,
}

impl OsascriptRunner {
    pub fn new(osascript_path: impl Into<PathBuf>) -> Self {
        Self {
            osascript_path: osascript_path.into(),
        }
    }

    fn execute(&self, source: &str) -> BridgeResult<String> {
        let output = Command::new(&self.osascript_path)
            .arg("-e")
            .arg(source)
            .output()?;
        decode_output(output)
    }
}

impl ScriptRunner for OsascriptRunner {
    fn launch(&self, app_path: &Path) -> BridgeResult<()> {
        tracing::debug!("Launching {}", app_path.display());
        let output = Command::new(OPEN_PATH).arg(app_path).output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(BridgeError::Launch(compact_text(&String::from_utf8_lossy(
                &output.stderr,
            ))))
        }
    }

    fn is_running(&self, bundle_id: &str) -> bool {
        match self.execute(&running_check_script(bundle_id)) {
            Ok(answer) => answer.trim().eq_ignore_ascii_case("true"),
            Err(error) => {
                tracing::debug!("Could not check whether {} is running: {}", bundle_id, error);
                false
            }
        }
    }

    fn run_script(&self, source: &str) -> BridgeResult<String> {
        self.execute(source)
    }
}

fn decode_output(output: Output) -> BridgeResult<String> {
    if !output.status.success() {
        return Err(BridgeError::ScriptFailed {
            status: output.status.code().unwrap_or(-1),
            stderr: compact_text(&String::from_utf8_lossy(&output.stderr)),
        });
    }
    String::from_utf8(output.stdout).map_err(|error| BridgeError::InvalidOutput(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_script_host_is_io_error() {
        let runner = OsascriptRunner::new("/nonexistent/wristnotes-osascript");
        let error = runner.run_script("return 1").unwrap_err();
        assert!(matches!(error, BridgeError::Io(_)));
        assert!(!runner.is_running("com.apple.Notes"));
    }

    #[cfg(unix)]
    #[test]
    fn decode_output_reports_failures() {
        use std::os::unix::process::ExitStatusExt;

        let failed = Output {
            status: std::process::ExitStatus::from_raw(1 << 8),
            stdout: Vec::new(),
            stderr: b"execution error: Not authorized".to_vec(),
        };
        match decode_output(failed).unwrap_err() {
            BridgeError::ScriptFailed { status, stderr } => {
                assert_eq!(status, 1);
                assert_eq!(stderr, "execution error: Not authorized");
            }
            other => panic!("unexpected error: {other}"),
        }

        let ok = Output {
            status: std::process::ExitStatus::from_raw(0),
            stdout: b"true\n".to_vec(),
            stderr: Vec::new(),
        };
        assert_eq!(decode_output(ok).unwrap(), "true\n");
    }
}
