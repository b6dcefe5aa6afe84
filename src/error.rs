use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// ファイル単位の解析エラー
///
/// どのバリアントもファイル境界で捕捉され、そのファイルの寄与は空として扱われる
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("syntax recovery failed in {path}: {message}")]
    SyntaxRecovery { path: PathBuf, message: String },

    #[error("unsupported {kind} configuration in {path} at line {line}")]
    UnsupportedConfiguration {
        kind: &'static str,
        path: PathBuf,
        line: u32,
    },
}

impl AnalyzerError {
    pub fn syntax(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        AnalyzerError::SyntaxRecovery {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// インデックス全体の更新エラー（glob解決レベル）
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid glob pattern: {0}")]
    Pattern(String),

    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
