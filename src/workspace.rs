use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::PathMatcher;
use crate::error::IndexError;

/// ワークスペースからglobに一致するファイルを集める
///
/// `accept` で拡張子などを絞り込む。ルートが読めない場合のみエラー、
/// 配下のディレクトリが読めない場合は警告して飛ばす。結果はパス順
pub fn collect_files(
    root: &Path,
    matcher: &PathMatcher,
    accept: fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, IndexError> {
    let entries = fs::read_dir(root).map_err(|source| IndexError::Scan {
        path: root.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    collect_entries(entries, root, matcher, accept, &mut files);
    files.sort();
    Ok(files)
}

fn collect_dir(
    dir: &Path,
    root: &Path,
    matcher: &PathMatcher,
    accept: fn(&Path) -> bool,
    files: &mut Vec<PathBuf>,
) {
    match fs::read_dir(dir) {
        Ok(entries) => collect_entries(entries, root, matcher, accept, files),
        Err(e) => warn!(path = %dir.display(), "Failed to read directory: {}", e),
    }
}

fn collect_entries(
    entries: fs::ReadDir,
    root: &Path,
    matcher: &PathMatcher,
    accept: fn(&Path) -> bool,
    files: &mut Vec<PathBuf>,
) {
    for entry in entries.flatten() {
        let path = entry.path();
        let relative_path = path.strip_prefix(root).unwrap_or(&path);

        if path.is_dir() {
            if matcher.should_traverse_dir(relative_path) {
                collect_dir(&path, root, matcher, accept, files);
            }
        } else if accept(&path) && matcher.should_include(relative_path) {
            files.push(path);
        }
    }
}
