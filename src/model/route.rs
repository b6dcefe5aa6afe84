use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::component::{ControllerLink, Template};
use super::controller::ControllerSet;
use super::span::Span;

/// `.state(name, config)` で登録されたルート
///
/// `views` がある場合、各ビューも同じ形のルートとして保持する
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    pub path: PathBuf,
    pub span: Span,
    pub template: Option<Template>,
    #[serde(flatten)]
    pub link: ControllerLink,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<Route>,
}

impl Route {
    pub fn new(name: impl Into<String>, path: PathBuf, span: Span) -> Self {
        Self {
            name: name.into(),
            path,
            span,
            template: None,
            link: ControllerLink::default(),
            views: Vec::new(),
        }
    }

    /// 自身と全ビューのコントローラー参照を解決する
    pub fn resolve_controllers(&mut self, controllers: &ControllerSet) {
        self.link.resolve(controllers);
        for view in &mut self.views {
            view.resolve_controllers(controllers);
        }
    }

    /// 自身とネストしたビューを深さ優先で列挙する
    pub fn walk(&self) -> Vec<&Route> {
        let mut result = vec![self];
        for view in &self.views {
            result.extend(view.walk());
        }
        result
    }
}
