//! Foreground-application context: who has focus, and what kind of app it is.
//!
//! The OS query is strictly best-effort — missing Accessibility permission,
//! a headless session, or an app without a titled window all degrade to
//! `(None, None)` rather than an error.

/// Application names treated as web browsers.
pub const BROWSER_APPS: &[&str] = &["safari", "google chrome", "arc", "firefox", "microsoft edge"];

/// Application names treated as note-taking apps.
pub const NOTE_APPS: &[&str] = &["notes", "notion", "obsidian", "bear"];

/// Category assigned when no frontmost application could be determined.
pub const CATEGORY_UNKNOWN: &str = "unknown";

/// Map an application name to a coarse category. Pure and table-driven:
/// browsers become "internet research", note apps become "note app", any
/// other known name maps to its own lower-cased form, and absence of a name
/// maps to "unknown".
pub fn classify(app_name: Option<&str>) -> String {
    match app_name {
        None => CATEGORY_UNKNOWN.to_string(),
        Some(name) => {
            let lower = name.to_lowercase();
            if BROWSER_APPS.contains(&lower.as_str()) {
                "internet research".to_string()
            } else if NOTE_APPS.contains(&lower.as_str()) {
                "note app".to_string()
            } else {
                lower
            }
        }
    }
}

/// Query the frontmost application name and window title.
///
/// Returns `(None, None)` on any failure; never an error. On macOS this
/// shells out to `osascript` + System Events, which only answers when the
/// process has Accessibility permission.
pub fn current_context() -> (Option<String>, Option<String>) {
    frontmost_app_window()
}

#[cfg(target_os = "macos")]
fn frontmost_app_window() -> (Option<String>, Option<String>) {
    // Two lines on stdout: app name, then window title (may be blank).
    let script = r#"
        tell application "System Events"
            set frontApp to first application process whose frontmost is true
            set appName to name of frontApp
            set windowTitle to ""
            try
                set windowTitle to name of front window of frontApp
            end try
            return appName & "\n" & windowTitle
        end tell
    "#;

    let output = match std::process::Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
    {
        Ok(out) => out,
        Err(e) => {
            tracing::debug!("context query failed to launch osascript: {e}");
            return (None, None);
        }
    };

    if !output.status.success() {
        tracing::debug!(
            "context query failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return (None, None);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    let app = lines
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    let window = lines
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    (app, window)
}

#[cfg(not(target_os = "macos"))]
fn frontmost_app_window() -> (Option<String>, Option<String>) {
    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_browsers() {
        for app in BROWSER_APPS {
            assert_eq!(classify(Some(app)), "internet research");
        }
        // Case-insensitive
        assert_eq!(classify(Some("Google Chrome")), "internet research");
        assert_eq!(classify(Some("SAFARI")), "internet research");
    }

    #[test]
    fn test_classify_note_apps() {
        for app in NOTE_APPS {
            assert_eq!(classify(Some(app)), "note app");
        }
        assert_eq!(classify(Some("Obsidian")), "note app");
    }

    #[test]
    fn test_classify_other_lowercases() {
        assert_eq!(classify(Some("Finder")), "finder");
        assert_eq!(classify(Some("Xcode")), "xcode");
    }

    #[test]
    fn test_classify_none_is_unknown() {
        assert_eq!(classify(None), CATEGORY_UNKNOWN);
    }

    #[test]
    fn test_classify_is_pure() {
        assert_eq!(classify(Some("Terminal")), classify(Some("Terminal")));
    }
}
