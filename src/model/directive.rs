use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::span::Span;
use crate::util::camel_to_kebab;

/// ディレクティブの使用形態
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Restrict {
    E,
    A,
    #[default]
    EA,
}

impl Restrict {
    /// `restrict` 文字列を正規化する
    ///
    /// E と A の両方を含めば EA、片方のみならそれ、どちらも含まなければ EA
    pub fn parse(value: &str) -> Self {
        let element = value.contains('E');
        let attribute = value.contains('A');
        match (element, attribute) {
            (true, false) => Restrict::E,
            (false, true) => Restrict::A,
            _ => Restrict::EA,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Restrict::E => "E",
            Restrict::A => "A",
            Restrict::EA => "EA",
        }
    }

    pub fn allows_element(&self) -> bool {
        matches!(self, Restrict::E | Restrict::EA)
    }

    pub fn allows_attribute(&self) -> bool {
        matches!(self, Restrict::A | Restrict::EA)
    }
}

impl fmt::Display for Restrict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `.directive(name, factory)` で登録されたディレクティブ
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    pub name: String,
    pub html_name: String,
    /// 関数ディレクティブの場合は None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub restrict: Restrict,
    pub path: PathBuf,
    pub span: Span,
}

impl Directive {
    pub fn new(name: impl Into<String>, path: PathBuf, span: Span) -> Self {
        let name = name.into();
        Self {
            html_name: camel_to_kebab(&name),
            name,
            class_name: None,
            restrict: Restrict::default(),
            path,
            span,
        }
    }

    /// 登録名を設定し、html名も合わせて更新する
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.html_name = camel_to_kebab(&self.name);
    }
}
