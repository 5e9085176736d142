//! Scripting bridge to the Notes application.
//!
//! The pipeline only needs three things from the host: start the app, tell
//! whether it is running, and run an `AppleScript` program returning text.
//! [`ScriptRunner`] models exactly that so the sync pipeline can be driven by
//! canned payloads in tests.

mod osascript;

use std::path::Path;

use thiserror::Error;

pub use osascript::OsascriptRunner;

/// Errors raised by the scripting bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to launch application: {0}")]
    Launch(String),
    #[error("Failed to run script host: {0}")]
    Io(#[from] std::io::Error),
    #[error("Script failed with status {status}: {stderr}")]
    ScriptFailed { status: i32, stderr: String },
    #[error("Script returned invalid output: {0}")]
    InvalidOutput(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Capability to drive the external application.
///
/// Calls block until the host answers; there is no timeout of their own.
pub trait ScriptRunner: Send + Sync {
    /// Start (or activate) the application bundle at `app_path`
    fn launch(&self, app_path: &Path) -> BridgeResult<()>;

    /// Whether an application with `bundle_id` is currently running
    fn is_running(&self, bundle_id: &str) -> bool;

    /// Execute a script and return its textual result
    fn run_script(&self, source: &str) -> BridgeResult<String>;
}

/// Lightweight query used to check the app answers automation requests.
///
/// Returns `true` when the notes can be counted, `false` otherwise.
pub const PROBE_SCRIPT: &str = r#"tell application "Notes"
    try
        set noteCount to count of every note
        log "Access check - Found " & noteCount & " notes"
        return true
    on error errMsg
        log "Access check error: " & errMsg
        return false
    end try
end tell"#;

/// Full query emitting every note in the format decoded by
/// [`crate::protocol::parse_notes`].
pub const FETCH_SCRIPT: &str = r#"tell application "Notes"
    set output to ""
    repeat with n in every note
        try
            set output to output & "---START---" & linefeed
            set output to output & "ID: " & id of n & linefeed
            set output to output & "Name: " & name of n & linefeed
            set output to output & "Body: " & (get body of n) & linefeed
            set output to output & "Created: " & creation date of n & linefeed
            set output to output & "Modified: " & modification date of n & linefeed
            if container of n is not missing value then
                set output to output & "Container: " & (get name of container of n) & linefeed
            else
                set output to output & "Container: None" & linefeed
            end if
            try
                set accountName to name of account of n as text
                set output to output & "Account: " & accountName & linefeed
            on error
                set output to output & "Account: Unknown" & linefeed
            end try
            set output to output & "Password Protected: " & password protected of n & linefeed
            set output to output & "Shared: " & shared of n & linefeed
            set output to output & "Attachments: " & (count of attachments of n) & linefeed
            set output to output & "---END---" & linefeed
        on error errMsg
            set output to output & "---START---" & linefeed
            set output to output & "Error: Could not read note - " & errMsg & linefeed
            set output to output & "---END---" & linefeed
        end try
    end repeat
    return output
end tell"#;

/// Script answering `true` when the app with `bundle_id` is running
pub fn running_check_script(bundle_id: &str) -> String {
    format!(
        "application id \"{}\" is running",
        bundle_id.replace('\\', "\\\\").replace('"', "\\\"")
    )
}
