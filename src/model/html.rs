use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::span::Span;

/// HTML内での使用形態
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HtmlReferenceKind {
    /// `<my-component>` のようなカスタム要素
    Element,
    /// `<div my-directive>` のようなカスタム属性
    Attribute,
}

/// HTML内のカスタム要素・属性への参照
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HtmlReference {
    /// kebab-case のhtml名（`data-`/`x-` 接頭辞は除去済み）
    pub name: String,
    pub kind: HtmlReferenceKind,
    pub path: PathBuf,
    pub span: Span,
}
