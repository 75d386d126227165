// ── Executable resolution ──
//
// Explicit path from config/flags first. After that Windows prefers the
// bundle directory shipped next to the launcher; everywhere else the
// system PATH wins and the bundle is the fallback.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Resolve the executable for `name` (without extension).
///
/// Never fails: when nothing is found the bare file name is returned so the
/// spawn attempt surfaces [`Error::ToolNotFound`](crate::Error::ToolNotFound)
/// with a meaningful path.
pub fn locate(name: &str, explicit: Option<&Path>, bundle_dir: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let file_name = executable_name(name);
    let bundled = bundle_dir.map(|dir| dir.join(&file_name));

    let found = if cfg!(windows) {
        bundled
            .clone()
            .filter(|p| p.is_file())
            .or_else(|| search_path(&file_name))
    } else {
        search_path(&file_name).or_else(|| bundled.clone().filter(|p| p.is_file()))
    };

    let resolved = found
        .or(bundled)
        .unwrap_or_else(|| PathBuf::from(&file_name));
    debug!(tool = name, path = %resolved.display(), "resolved executable");
    resolved
}

/// `name` with the platform executable suffix (`.exe` on Windows).
pub fn executable_name(name: &str) -> String {
    format!("{name}{}", env::consts::EXE_SUFFIX)
}

fn search_path(file_name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    search_dirs(env::split_paths(&path_var), file_name)
}

fn search_dirs(dirs: impl IntoIterator<Item = PathBuf>, file_name: &str) -> Option<PathBuf> {
    dirs.into_iter()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = Path::new("/opt/platform-tools/adb");
        assert_eq!(
            locate("adb", Some(explicit), Some(dir.path())),
            PathBuf::from("/opt/platform-tools/adb")
        );
    }

    #[test]
    fn search_dirs_finds_first_match() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let name = executable_name("scrcpy");
        std::fs::write(second.path().join(&name), b"").unwrap();

        let found = search_dirs(
            vec![first.path().to_path_buf(), second.path().to_path_buf()],
            &name,
        );
        assert_eq!(found, Some(second.path().join(&name)));
    }

    #[test]
    fn missing_tool_falls_back_to_bundle_path() {
        let dir = tempfile::tempdir().unwrap();
        let name = "questcast-definitely-not-installed";
        assert_eq!(
            locate(name, None, Some(dir.path())),
            dir.path().join(executable_name(name))
        );
    }

    #[test]
    fn missing_tool_without_bundle_is_bare_name() {
        let name = "questcast-definitely-not-installed";
        assert_eq!(locate(name, None, None), PathBuf::from(executable_name(name)));
    }

    #[test]
    fn existing_bundled_tool_is_used_when_not_on_path() {
        let dir = tempfile::tempdir().unwrap();
        let name = "questcast-bundled-only";
        let bundled = dir.path().join(executable_name(name));
        std::fs::write(&bundled, b"").unwrap();
        assert_eq!(locate(name, None, Some(dir.path())), bundled);
    }
}
