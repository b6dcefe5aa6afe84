use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::span::Span;

/// 型注釈がない場合の戻り値型
pub const ANY_TYPE: &str = "any";

/// メソッドのパラメータ
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// コントローラーのプロパティ
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    pub return_type: String,
    pub is_public: bool,
    pub span: Span,
}

/// コントローラーのメソッド（アロー関数プロパティを含む）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub name: String,
    pub return_type: String,
    pub is_public: bool,
    pub span: Span,
    pub parameters: Vec<MethodParameter>,
}

/// コントローラーのメンバー
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Member {
    Property(Property),
    Method(Method),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Property(p) => &p.name,
            Member::Method(m) => &m.name,
        }
    }

    pub fn return_type(&self) -> &str {
        match self {
            Member::Property(p) => &p.return_type,
            Member::Method(m) => &m.return_type,
        }
    }

    pub fn is_public(&self) -> bool {
        match self {
            Member::Property(p) => p.is_public,
            Member::Method(m) => m.is_public,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Member::Property(p) => p.span,
            Member::Method(m) => m.span,
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Member::Method(_))
    }
}

/// コントローラー（クラスまたは関数）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Controller {
    /// 登録名（`.controller('Alias', Class)` で上書きされる）
    pub name: String,
    pub class_name: String,
    pub path: PathBuf,
    pub span: Span,
    pub base_class_name: Option<String>,
    /// キャッシュ側で解決される継承先
    #[serde(skip)]
    pub base_class: Option<Arc<Controller>>,
    pub members: Vec<Member>,
}

impl Controller {
    pub fn new(class_name: impl Into<String>, path: PathBuf, span: Span) -> Self {
        let class_name = class_name.into();
        Self {
            name: class_name.clone(),
            class_name,
            path,
            span,
            base_class_name: None,
            base_class: None,
            members: Vec::new(),
        }
    }

    /// クラス名が一致するか、継承チェーンのどこかで一致するか
    pub fn is_instance_of(&self, class_name: &str) -> bool {
        if self.class_name == class_name {
            return true;
        }
        self.base_class
            .as_ref()
            .is_some_and(|base| base.is_instance_of(class_name))
    }

    /// 継承元を含めた全メンバー（派生クラス側の定義を優先）
    pub fn all_members(&self) -> Vec<&Member> {
        let mut members: Vec<&Member> = self.members.iter().collect();
        let mut current = self.base_class.as_deref();
        let mut depth = 0;
        while let Some(base) = current {
            for member in &base.members {
                if !members.iter().any(|m| m.name() == member.name()) {
                    members.push(member);
                }
            }
            current = base.base_class.as_deref();
            depth += 1;
            if depth > 32 {
                break;
            }
        }
        members
    }
}

/// 既知コントローラーの集合（名前・クラス名での検索用）
#[derive(Clone, Debug, Default)]
pub struct ControllerSet {
    controllers: Vec<Arc<Controller>>,
}

impl ControllerSet {
    pub fn new(controllers: Vec<Arc<Controller>>) -> Self {
        Self { controllers }
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<Controller>> {
        self.controllers.iter().find(|c| c.name == name).cloned()
    }

    pub fn find_by_class_name(&self, class_name: &str) -> Option<Arc<Controller>> {
        self.controllers
            .iter()
            .find(|c| c.class_name == class_name)
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Controller>> {
        self.controllers.iter()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

/// 継承関係を解決して `base_class` を埋めたコントローラー一覧を返す
///
/// 循環継承（A extends B, B extends A）は循環に入った時点でリンクを打ち切る
pub fn link_base_classes(controllers: &[Arc<Controller>]) -> Vec<Arc<Controller>> {
    let by_class: HashMap<&str, &Controller> = controllers
        .iter()
        .map(|c| (c.class_name.as_str(), c.as_ref()))
        .collect();
    let mut linked: HashMap<String, Arc<Controller>> = HashMap::new();

    fn link(
        controller: &Controller,
        by_class: &HashMap<&str, &Controller>,
        linked: &mut HashMap<String, Arc<Controller>>,
        visiting: &mut Vec<String>,
    ) -> Arc<Controller> {
        if let Some(done) = linked.get(&controller.class_name) {
            if done.name == controller.name && done.path == controller.path {
                return Arc::clone(done);
            }
        }

        visiting.push(controller.class_name.clone());
        let base_class = controller
            .base_class_name
            .as_deref()
            .filter(|base| !visiting.iter().any(|v| v == base))
            .and_then(|base| by_class.get(base))
            .map(|base| link(base, by_class, linked, visiting));
        visiting.pop();

        let result = Arc::new(Controller {
            base_class,
            ..controller.clone()
        });
        linked
            .entry(controller.class_name.clone())
            .or_insert_with(|| Arc::clone(&result));
        result
    }

    controllers
        .iter()
        .map(|c| link(c, &by_class, &mut linked, &mut Vec::new()))
        .collect()
}
