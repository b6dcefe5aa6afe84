use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::path_matcher::PathMatcher;
use crate::error::IndexError;

/// 設定ファイル名（プロジェクトルート直下）
pub const CONFIG_FILE_NAME: &str = "ajsconfig.json";

/// ajsconfig.json の設定
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AjsConfig {
    /// コンポーネントを探すglobパターン
    #[serde(default = "default_script_globs")]
    pub component_globs: Vec<String>,
    /// コントローラーを探すglobパターン
    #[serde(default = "default_script_globs")]
    pub controller_globs: Vec<String>,
    /// ディレクティブを探すglobパターン
    #[serde(default = "default_script_globs")]
    pub directive_globs: Vec<String>,
    /// ルート（ui-routerのステート）を探すglobパターン
    #[serde(default = "default_script_globs")]
    pub route_globs: Vec<String>,
    /// HTML参照を集めるglobパターン
    #[serde(default = "default_html_globs")]
    pub html_globs: Vec<String>,
    /// 除外対象のglobパターン
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// 補完などに公開メンバーのみを出す（デフォルト: false）
    #[serde(default)]
    pub public_members_only: bool,
    /// 非表示にするメンバー名の正規表現
    #[serde(default)]
    pub excluded_members: Option<String>,
    /// 定義ジャンプに含める対象
    #[serde(default)]
    pub definitions: DefinitionParts,
}

/// 定義ジャンプの対象（コンポーネント本体・テンプレート・コントローラー）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DefinitionParts {
    #[serde(default = "default_true")]
    pub component: bool,
    #[serde(default = "default_true")]
    pub template: bool,
    #[serde(default = "default_true")]
    pub controller: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DefinitionParts {
    fn default() -> Self {
        Self {
            component: true,
            template: true,
            controller: true,
        }
    }
}

fn default_script_globs() -> Vec<String> {
    vec!["**/*.ts".to_string(), "**/*.js".to_string()]
}

fn default_html_globs() -> Vec<String> {
    vec!["**/*.html".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules".to_string(),
        "**/node_modules/**".to_string(),
        "**/dist".to_string(),
        "**/dist/**".to_string(),
        "**/build".to_string(),
        "**/build/**".to_string(),
        "**/.*".to_string(),
        "**/.*/**".to_string(),
    ]
}

impl Default for AjsConfig {
    fn default() -> Self {
        Self {
            component_globs: default_script_globs(),
            controller_globs: default_script_globs(),
            directive_globs: default_script_globs(),
            route_globs: default_script_globs(),
            html_globs: default_html_globs(),
            exclude: default_exclude(),
            public_members_only: false,
            excluded_members: None,
            definitions: DefinitionParts::default(),
        }
    }
}

impl AjsConfig {
    /// 指定ディレクトリからajsconfig.jsonを読み込む
    pub fn load_from_dir(dir: &Path) -> Self {
        Self::load_from_path(&dir.join(CONFIG_FILE_NAME))
    }

    /// 指定パスからajsconfig.jsonを読み込む
    ///
    /// ファイルがなければデフォルト、読めない・壊れている場合は警告してデフォルト
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to parse ajsconfig.json: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read ajsconfig.json: {}", e);
                Self::default()
            }
        }
    }

    pub fn component_matcher(&self) -> Result<PathMatcher, IndexError> {
        PathMatcher::new(&self.component_globs, &self.exclude)
    }

    pub fn controller_matcher(&self) -> Result<PathMatcher, IndexError> {
        PathMatcher::new(&self.controller_globs, &self.exclude)
    }

    pub fn directive_matcher(&self) -> Result<PathMatcher, IndexError> {
        PathMatcher::new(&self.directive_globs, &self.exclude)
    }

    pub fn route_matcher(&self) -> Result<PathMatcher, IndexError> {
        PathMatcher::new(&self.route_globs, &self.exclude)
    }

    pub fn html_matcher(&self) -> Result<PathMatcher, IndexError> {
        PathMatcher::new(&self.html_globs, &self.exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AjsConfig::default();
        assert_eq!(config.component_globs, vec!["**/*.ts", "**/*.js"]);
        assert_eq!(config.html_globs, vec!["**/*.html"]);
        assert!(!config.public_members_only);
        assert!(config.excluded_members.is_none());
        assert_eq!(config.definitions, DefinitionParts::default());
    }

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "componentGlobs": ["src/components/**/*.ts"],
            "publicMembersOnly": true,
            "excludedMembers": "^\\$",
            "definitions": { "template": false }
        }"#;
        let config: AjsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.component_globs, vec!["src/components/**/*.ts"]);
        assert_eq!(config.controller_globs, vec!["**/*.ts", "**/*.js"]);
        assert!(config.public_members_only);
        assert_eq!(config.excluded_members.as_deref(), Some("^\\$"));
        assert!(config.definitions.component);
        assert!(!config.definitions.template);
        assert!(config.definitions.controller);
    }

    #[test]
    fn test_empty_config() {
        let config: AjsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.route_globs, vec!["**/*.ts", "**/*.js"]);
        assert!(config.exclude.iter().any(|p| p == "**/node_modules/**"));
    }

    #[test]
    fn test_broken_config_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        let config = AjsConfig::load_from_dir(dir.path());
        assert_eq!(config.directive_globs, vec!["**/*.ts", "**/*.js"]);
    }

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AjsConfig::load_from_dir(dir.path());
        assert!(!config.public_members_only);
    }
}
