//! Opening the local UI in the user's default browser.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Platform launcher and the arguments preceding the URL.
fn launcher() -> (&'static str, &'static [&'static str]) {
    const NO_ARGS: &[&str] = &[];
    // The empty string is `start`'s window title, so the URL is not taken for one.
    const WINDOWS_ARGS: &[&str] = &["/C", "start", ""];

    if cfg!(target_os = "macos") {
        ("open", NO_ARGS)
    } else if cfg!(target_os = "windows") {
        ("cmd", WINDOWS_ARGS)
    } else {
        ("xdg-open", NO_ARGS)
    }
}

/// Ask the platform launcher to open `url`. Does not wait for the browser.
///
/// # Errors
///
/// Returns an error if the launcher cannot be spawned.
pub async fn open_in_browser(url: &str) -> Result<()> {
    let (program, args) = launcher();
    debug!(program, url, "Opening browser");

    let mut child = Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to execute {program}"))?;

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if !status.success() => {
                tracing::warn!(%status, "Browser launcher exited unsuccessfully");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to wait for browser launcher: {e}"),
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_for_platform() {
        let (program, args) = launcher();
        if cfg!(target_os = "linux") {
            assert_eq!(program, "xdg-open");
            assert!(args.is_empty());
        }
        assert!(!program.is_empty());
    }
}
