use serde::{Deserialize, Serialize};
use tree_sitter::Node;

/// 位置情報の統一型（0始まりの行・列）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// tree-sitterノードの範囲から生成
    pub fn of(node: Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self::new(
            start.row as u32,
            start.column as u32,
            end.row as u32,
            end.column as u32,
        )
    }

    /// 指定位置がスパン内に含まれるかチェック
    pub fn contains(&self, line: u32, col: u32) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && col < self.start_col {
            return false;
        }
        if line == self.end_line && col > self.end_col {
            return false;
        }
        true
    }

    /// 指定行がスパンの行範囲内に含まれるかチェック
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}
