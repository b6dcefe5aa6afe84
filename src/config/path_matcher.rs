use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::IndexError;

/// パスマッチング用の構造体
///
/// パターンはプロジェクトルートからの相対パスに対して評価する
#[derive(Debug, Clone)]
pub struct PathMatcher {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathMatcher {
    /// include/excludeパターンからPathMatcherを作成
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, IndexError> {
        let include_set = if include.is_empty() {
            None
        } else {
            Some(build_set(include, "include")?)
        };
        let exclude_set = build_set(exclude, "exclude")?;

        Ok(Self {
            include: include_set,
            exclude: exclude_set,
        })
    }

    /// ファイルが解析対象かどうかを判定
    pub fn should_include(&self, relative_path: &Path) -> bool {
        if self.exclude.is_match(relative_path) {
            return false;
        }
        match &self.include {
            Some(include_set) => include_set.is_match(relative_path),
            None => true,
        }
    }

    /// ディレクトリを走査すべきかどうかを判定（excludeのみチェック）
    pub fn should_traverse_dir(&self, relative_path: &Path) -> bool {
        !self.exclude.is_match(relative_path)
    }

    /// 絶対パスをルートからの相対にして判定する（ルート外は対象外）
    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        match path.strip_prefix(root) {
            Ok(relative) => self.should_include(relative),
            Err(_) => false,
        }
    }
}

fn build_set(patterns: &[String], label: &str) -> Result<GlobSet, IndexError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            IndexError::Pattern(format!("invalid {} pattern '{}': {}", label, pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| IndexError::Pattern(format!("failed to build {} set: {}", label, e)))
}
