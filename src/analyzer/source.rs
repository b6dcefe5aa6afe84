use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use tree_sitter::{InputEdit, Language, Node, Parser, Point, Tree};

use crate::error::AnalyzerError;
use crate::util::{join_relative, path_key};

/// ソースの文法
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    TypeScript,
    Tsx,
    JavaScript,
}

impl Dialect {
    /// 拡張子から文法を判定（不明な場合はJavaScript）
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("ts") | Some("mts") | Some("cts") => Dialect::TypeScript,
            Some("tsx") => Dialect::Tsx,
            _ => Dialect::JavaScript,
        }
    }

    pub fn language(&self) -> Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    pub fn is_typescript(&self) -> bool {
        !matches!(self, Dialect::JavaScript)
    }
}

/// 構文木とファイルパスの組
///
/// 生成後は不変。解析が終われば破棄され、派生したエンティティだけが残る
pub struct SourceUnit {
    path: PathBuf,
    text: String,
    tree: Tree,
    dialect: Dialect,
}

impl SourceUnit {
    /// ディスクから同期的に読み込んで解析する
    pub fn parse(path: &Path) -> Result<Self, AnalyzerError> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalyzerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_from_text(text, path)
    }

    /// ディスクから非同期に読み込んで解析する
    pub async fn load(path: &Path) -> Result<Self, AnalyzerError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AnalyzerError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse_from_text(text, path)
    }

    /// バッファ済みの内容から解析する（ディスクには触れない）
    pub fn parse_from_text(text: impl Into<String>, path: &Path) -> Result<Self, AnalyzerError> {
        let text = text.into();
        let dialect = Dialect::from_path(path);
        let tree = build_tree(dialect, &text, None, path)?;
        Ok(Self::from_parts(path.to_path_buf(), text, tree, dialect))
    }

    /// 新しい内容で再解析する
    ///
    /// 変更のない先頭・末尾を差分として旧ツリーに適用し、インクリメンタルに構築する
    pub fn reparse(&self, text: impl Into<String>) -> Result<Self, AnalyzerError> {
        let text = text.into();
        let mut old_tree = self.tree.clone();
        old_tree.edit(&compute_edit(&self.text, &text));
        let tree = build_tree(self.dialect, &text, Some(&old_tree), &self.path)?;
        Ok(Self::from_parts(self.path.clone(), text, tree, self.dialect))
    }

    fn from_parts(path: PathBuf, text: String, tree: Tree, dialect: Dialect) -> Self {
        if tree.root_node().has_error() {
            debug!(path = %path.display(), "syntax tree contains error nodes");
        }
        Self {
            path,
            text,
            tree,
            dialect,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// ノードに対応するソーステキスト
    pub fn node_text<'a>(&'a self, node: Node<'_>) -> &'a str {
        self.text.get(node.byte_range()).unwrap_or("")
    }

    /// ファイルのあるディレクトリ
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

fn build_tree(
    dialect: Dialect,
    text: &str,
    old_tree: Option<&Tree>,
    path: &Path,
) -> Result<Tree, AnalyzerError> {
    let mut parser = Parser::new();
    parser
        .set_language(&dialect.language())
        .map_err(|e| AnalyzerError::syntax(path, e.to_string()))?;
    parser
        .parse(text, old_tree)
        .ok_or_else(|| AnalyzerError::syntax(path, "parser produced no tree"))
}

fn compute_edit(old: &str, new: &str) -> InputEdit {
    let prefix = old
        .bytes()
        .zip(new.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    let mut start = prefix;
    while !old.is_char_boundary(start) || !new.is_char_boundary(start) {
        start -= 1;
    }

    let max_suffix = (old.len() - start).min(new.len() - start);
    let suffix = old
        .bytes()
        .rev()
        .zip(new.bytes().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    let mut old_end = old.len() - suffix;
    let mut new_end = new.len() - suffix;
    while !old.is_char_boundary(old_end) || !new.is_char_boundary(new_end) {
        old_end += 1;
        new_end += 1;
    }

    InputEdit {
        start_byte: start,
        old_end_byte: old_end,
        new_end_byte: new_end,
        start_position: point_at(old, start),
        old_end_position: point_at(old, old_end),
        new_end_position: point_at(new, new_end),
    }
}

fn point_at(text: &str, byte: usize) -> Point {
    let before = &text.as_bytes()[..byte];
    let row = before.iter().filter(|&&b| b == b'\n').count();
    let column = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(byte, |nl| byte - nl - 1);
    Point { row, column }
}

/// エディタで開かれている未保存バッファ
///
/// ファイル読み込み時（import解決を含む）はディスクより優先される
#[derive(Clone, Debug, Default)]
pub struct Documents {
    buffers: Arc<DashMap<String, String>>,
}

impl Documents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, path: &Path, text: impl Into<String>) {
        self.buffers.insert(path_key(path), text.into());
    }

    pub fn close(&self, path: &Path) -> bool {
        self.buffers.remove(&path_key(path)).is_some()
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.buffers.get(&path_key(path)).map(|text| text.value().clone())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.buffers.contains_key(&path_key(path))
    }

    /// バッファがあればその内容を、なければディスクを非同期に読む
    pub async fn read(&self, path: &Path) -> Result<String, AnalyzerError> {
        if let Some(text) = self.get(path) {
            return Ok(text);
        }
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AnalyzerError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// バッファがあればそれを、なければディスクを同期的に読む
    pub fn load_blocking(&self, path: &Path) -> Result<SourceUnit, AnalyzerError> {
        match self.get(path) {
            Some(text) => SourceUnit::parse_from_text(text, path),
            None => SourceUnit::parse(path),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.contains(path) || path.is_file()
    }
}

/// import指定子に対して試す候補（記述順に優先）
const MODULE_SUFFIXES: [&str; 4] = ["", ".ts", ".tsx", ".js"];
const INDEX_FILES: [&str; 2] = ["index.ts", "index.js"];

/// 1ファイルの解析中に共有される状態
///
/// 解析チェーン上のファイル（循環検出用）と、解析中に読み込んだ依存ファイルを保持する
pub struct ParseContext {
    root: PathBuf,
    documents: Documents,
    chain: RefCell<Vec<String>>,
    dependencies: RefCell<BTreeMap<String, PathBuf>>,
    /// 解決できなかったimportの候補パス（後から追加されたら再解析が必要）
    misses: RefCell<BTreeSet<String>>,
}

impl ParseContext {
    pub fn new(root: impl Into<PathBuf>, documents: Documents, origin: &Path) -> Self {
        Self {
            root: root.into(),
            documents,
            chain: RefCell::new(vec![path_key(origin)]),
            dependencies: RefCell::new(BTreeMap::new()),
            misses: RefCell::new(BTreeSet::new()),
        }
    }

    /// テンプレートURLの基準となるプロジェクトルート
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 相対指定子を実在するファイルパスに解決する
    ///
    /// 相対パス（`./`, `../`）以外は対象外
    pub fn resolve_module(&self, from_dir: &Path, specifier: &str) -> Option<PathBuf> {
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            return None;
        }
        let base = join_relative(from_dir, specifier);
        let candidates: Vec<PathBuf> = MODULE_SUFFIXES
            .iter()
            .map(|suffix| {
                let mut candidate = base.clone().into_os_string();
                candidate.push(suffix);
                PathBuf::from(candidate)
            })
            .chain(INDEX_FILES.iter().map(|index| base.join(index)))
            .collect();

        if let Some(found) = candidates.iter().find(|c| self.documents.exists(c)) {
            return Some(found.clone());
        }

        debug!(specifier, from = %from_dir.display(), "module not found");
        self.misses
            .borrow_mut()
            .extend(candidates.iter().map(|c| path_key(c)));
        None
    }

    /// 解析チェーンにファイルを積む
    ///
    /// すでにチェーン上にある場合（循環import）は None
    pub fn enter(&self, path: &Path) -> Option<ChainGuard<'_>> {
        let key = path_key(path);
        let mut chain = self.chain.borrow_mut();
        if chain.contains(&key) {
            debug!(path = %path.display(), "import cycle detected");
            return None;
        }
        chain.push(key);
        Some(ChainGuard { ctx: self })
    }

    /// 依存ファイルとして記録した上で読み込む
    pub fn load(&self, path: &Path) -> Option<SourceUnit> {
        self.dependencies
            .borrow_mut()
            .insert(path_key(path), path.to_path_buf());
        match self.documents.load_blocking(path) {
            Ok(unit) => Some(unit),
            Err(e) => {
                debug!(error = %e, "failed to load imported module");
                None
            }
        }
    }

    /// 解析中に読み込んだ依存ファイル
    pub fn dependencies(&self) -> Vec<PathBuf> {
        self.dependencies.borrow().values().cloned().collect()
    }

    /// 変更されたら再解析が必要なパスキー（依存ファイルと未解決importの候補）
    pub fn watched_keys(&self) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = self.dependencies.borrow().keys().cloned().collect();
        keys.extend(self.misses.borrow().iter().cloned());
        keys
    }
}

/// 解析チェーンから抜ける時にファイルを降ろす
pub struct ChainGuard<'a> {
    ctx: &'a ParseContext,
}

impl Drop for ChainGuard<'_> {
    fn drop(&mut self) {
        self.ctx.chain.borrow_mut().pop();
    }
}
