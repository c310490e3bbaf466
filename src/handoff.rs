#![forbid(unsafe_code)]

//! Hand-off to the external audio download script. The contract is the ordered
//! list of plain video ids, joined with commas into a single argument.

use crate::model::VideoSummary;
use anyhow::{Context, Result, bail};
use log::info;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_SCRIPT_NAME: &str = "download_audio.sh";

pub fn video_ids(videos: &[VideoSummary]) -> Vec<String> {
    videos.iter().map(|video| video.id.clone()).collect()
}

pub fn join_ids(ids: &[String]) -> String {
    ids.join(",")
}

/// Picks the script to run: the configured path when given, otherwise
/// `download_audio.sh` next to the running executable.
pub fn find_download_script(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        bail!("download script {} does not exist", path.display());
    }

    let mut sibling = std::env::current_exe().context("locating tubesort executable")?;
    sibling.set_file_name(DEFAULT_SCRIPT_NAME);
    if sibling.exists() {
        return Ok(sibling);
    }

    bail!("{DEFAULT_SCRIPT_NAME} not found; pass --download-script or set TUBESORT_DOWNLOAD_SCRIPT");
}

/// Runs `script <id,id,...>` and waits for it. An empty list is a no-op.
pub fn run_download_script(script: &Path, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        info!("no videos to hand off; skipping {}", script.display());
        return Ok(());
    }

    info!("handing {} video ids to {}", ids.len(), script.display());
    let status = Command::new(script)
        .arg(join_ids(ids))
        .status()
        .with_context(|| format!("launching {}", script.display()))?;
    if status.success() {
        Ok(())
    } else {
        bail!("{} exited with {}", script.display(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn join_ids_keeps_order() {
        let ids = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        assert_eq!(join_ids(&ids), "b,a,c");
        assert_eq!(join_ids(&[]), "");
    }

    #[test]
    fn configured_script_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.sh");
        let err = find_download_script(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn empty_list_does_not_launch_anything() {
        let dir = tempdir().unwrap();
        // Would fail to launch if it were ever executed.
        assert!(run_download_script(&dir.path().join("missing.sh"), &[]).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn script_receives_comma_joined_ids() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("received.txt");
        let script = dir.path().join("download_audio.sh");
        fs::write(
            &script,
            format!("#!/bin/sh\nprintf '%s' \"$1\" > '{}'\n", output.display()),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let ids = vec!["x1".to_string(), "y2".to_string()];
        run_download_script(&script, &ids).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "x1,y2");
        assert_eq!(find_download_script(Some(&script)).unwrap(), script);
    }

    #[cfg(unix)]
    #[test]
    fn failing_script_is_an_error() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        fs::write(&script, "#!/bin/sh\nexit 3\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let err = run_download_script(&script, &["a".to_string()]).unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
