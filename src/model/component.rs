use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::controller::{Controller, ControllerSet};
use super::span::Span;
use crate::config::DefinitionParts;
use crate::util::camel_to_kebab;

/// `controllerAs` 未指定時のエイリアス
pub const DEFAULT_CONTROLLER_AS: &str = "$ctrl";

fn default_controller_as() -> String {
    DEFAULT_CONTROLLER_AS.to_string()
}

/// コンポーネント・ルートに紐づくテンプレート
///
/// `body` があればインライン定義、なければ `path` のファイルを参照する
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub path: PathBuf,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Template {
    pub fn inline(path: PathBuf, span: Span, body: impl Into<String>) -> Self {
        Self {
            path,
            span,
            body: Some(body.into()),
        }
    }

    pub fn file(path: PathBuf, span: Span) -> Self {
        Self {
            path,
            span,
            body: None,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.body.is_some()
    }
}

/// コントローラー参照（コンポーネントとルートで共通）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerLink {
    /// `controller: 'CardCtrl'` の文字列参照
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_name: Option<String>,
    /// `controller: CardController` の識別子参照
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_class_name: Option<String>,
    #[serde(default = "default_controller_as")]
    pub controller_as: String,
    /// 既知コントローラーに対して解決できた場合のみ設定される
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<Arc<Controller>>,
}

impl Default for ControllerLink {
    fn default() -> Self {
        Self {
            controller_name: None,
            controller_class_name: None,
            controller_as: default_controller_as(),
            controller: None,
        }
    }
}

impl ControllerLink {
    pub fn has_reference(&self) -> bool {
        self.controller_name.is_some() || self.controller_class_name.is_some()
    }

    /// 既知コントローラー集合に対して参照を解決する
    pub fn resolve(&mut self, controllers: &ControllerSet) {
        self.controller = if let Some(name) = &self.controller_name {
            controllers.find_by_name(name)
        } else if let Some(class_name) = &self.controller_class_name {
            controllers.find_by_class_name(class_name)
        } else {
            None
        };
    }
}

/// コンポーネントのバインディング
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub name: String,
    pub html_name: String,
    #[serde(rename = "type")]
    pub binding_type: String,
    pub span: Span,
}

impl Binding {
    pub fn new(name: impl Into<String>, binding_type: impl Into<String>, span: Span) -> Self {
        let name = name.into();
        Self {
            html_name: camel_to_kebab(&name),
            name,
            binding_type: binding_type.into(),
            span,
        }
    }
}

/// `.component(name, config)` で登録されたコンポーネント
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    pub html_name: String,
    pub path: PathBuf,
    pub span: Span,
    pub bindings: Vec<Binding>,
    pub template: Option<Template>,
    #[serde(flatten)]
    pub link: ControllerLink,
}

impl Component {
    pub fn new(name: impl Into<String>, path: PathBuf, span: Span) -> Self {
        let name = name.into();
        Self {
            html_name: camel_to_kebab(&name),
            name,
            path,
            span,
            bindings: Vec::new(),
            template: None,
            link: ControllerLink::default(),
        }
    }

    pub fn find_binding(&self, name: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.name == name || b.html_name == name)
    }

    /// 定義ジャンプに参加する位置の一覧
    pub fn definition_targets(&self, parts: &DefinitionParts) -> Vec<(PathBuf, Span)> {
        let mut targets = Vec::new();
        if parts.component {
            targets.push((self.path.clone(), self.span));
        }
        if parts.template {
            if let Some(template) = &self.template {
                targets.push((template.path.clone(), template.span));
            }
        }
        if parts.controller {
            if let Some(controller) = &self.link.controller {
                targets.push((controller.path.clone(), controller.span));
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_name_is_kebab_case() {
        let component = Component::new("exampleComponent", PathBuf::from("/a.ts"), Span::default());
        assert_eq!(component.html_name, "example-component");
        assert!(component.bindings.is_empty());
        assert_eq!(component.link.controller_as, "$ctrl");
    }

    #[test]
    fn test_controller_link_resolution() {
        let mut ctrl = Controller::new("CardController", PathBuf::from("/c.ts"), Span::default());
        ctrl.name = "CardCtrl".to_string();
        let set = ControllerSet::new(vec![Arc::new(ctrl)]);

        let mut by_name = ControllerLink {
            controller_name: Some("CardCtrl".to_string()),
            ..Default::default()
        };
        by_name.resolve(&set);
        assert!(by_name.controller.is_some());

        let mut by_class = ControllerLink {
            controller_class_name: Some("CardController".to_string()),
            ..Default::default()
        };
        by_class.resolve(&set);
        assert!(by_class.controller.is_some());

        let mut missing = ControllerLink {
            controller_name: Some("Unknown".to_string()),
            ..Default::default()
        };
        missing.resolve(&set);
        assert!(missing.controller.is_none());
    }

    #[test]
    fn test_definition_targets_respect_parts() {
        let mut component = Component::new("card", PathBuf::from("/card.ts"), Span::new(1, 0, 1, 6));
        component.template = Some(Template::file(PathBuf::from("/card.html"), Span::default()));

        let all = component.definition_targets(&DefinitionParts::default());
        assert_eq!(all.len(), 2);

        let parts = DefinitionParts {
            component: false,
            template: true,
            controller: true,
        };
        let only_template = component.definition_targets(&parts);
        assert_eq!(only_template, vec![(PathBuf::from("/card.html"), Span::default())]);
    }
}
