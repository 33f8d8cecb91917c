use std::path::Path;
use std::process::Command;

/// Retrieves the content of a tracked file as of a given commit.
pub(crate) fn show_file(commit: &str, path: &Path) -> Result<String, String> {
    let spec = format!("{commit}:{}", path.display());
    let output = Command::new("git")
        .arg("show")
        .arg(&spec)
        .output()
        .map_err(|e| format!("failed to run git show {spec}: {e}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "could not retrieve {spec} from git: {}",
            stderr.trim()
        ));
    }
    String::from_utf8(output.stdout)
        .map_err(|e| format!("git show {spec} returned invalid UTF-8: {e}"))
}
