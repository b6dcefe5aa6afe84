use phf::phf_set;
use tracing::debug;
use tree_sitter::Node;

use super::config_accessor::{property_name, this_assignment};
use super::query::{is_function_node, unwrap_expression, TreeQuery};
use super::source::{ParseContext, SourceUnit};
use super::syntax::{walk, CallExpression, ClassDeclaration, FunctionDeclaration, Visitor};
use crate::error::AnalyzerError;
use crate::model::{Controller, Member, Method, MethodParameter, Property, Span, ANY_TYPE};

/// 実装していればコントローラーではなく設定クラスとみなすインターフェース
static CONFIG_MARKER_INTERFACES: phf::Set<&'static str> = phf_set! {
    "IComponentOptions",
    "IDirective",
};

/// コントローラーの抽出
///
/// 認識パターン:
/// ```javascript
/// function CardController($scope) { this.value = 1; }
/// class CardController extends BaseController { ... }
/// angular.module('app').controller('CardCtrl', CardController);
/// angular.module('app').controller('CardCtrl', ['$scope', CardController]);
/// ```
#[derive(Debug, Default)]
pub struct ControllerParser;

impl ControllerParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, unit: &SourceUnit, ctx: &ParseContext) -> Result<Vec<Controller>, AnalyzerError> {
        let query = TreeQuery::new(unit, ctx);
        let mut visitor = ControllerVisitor {
            query: &query,
            controllers: Vec::new(),
            aliases: Vec::new(),
        };
        walk(unit, &mut visitor)?;
        Ok(visitor.finish())
    }
}

struct ControllerVisitor<'a, 'q> {
    query: &'q TreeQuery<'a>,
    controllers: Vec<Controller>,
    /// (クラス名, 登録名)
    aliases: Vec<(String, String)>,
}

impl<'a> Visitor<'a> for ControllerVisitor<'a, '_> {
    fn visit_function(&mut self, function: &FunctionDeclaration<'a>) -> Result<(), AnalyzerError> {
        let Some(name) = function.name else {
            return Ok(());
        };
        if is_nested_in_function(function.node) {
            return Ok(());
        }

        let mut controller = Controller::new(
            self.query.text(name),
            self.query.unit().path().to_path_buf(),
            Span::of(name),
        );
        if let Some(body) = function.body {
            controller.members = self.function_members(body);
        }
        self.controllers.push(controller);
        Ok(())
    }

    fn visit_class(&mut self, class: &ClassDeclaration<'a>) -> Result<(), AnalyzerError> {
        let Some(name) = class.name else {
            return Ok(());
        };
        if implements_marker(self.query, class.node) {
            return Ok(());
        }

        let mut controller = Controller::new(
            self.query.text(name),
            self.query.unit().path().to_path_buf(),
            Span::of(name),
        );
        controller.base_class_name = base_class_name(self.query, class.node);
        if let Some(body) = class.body {
            controller.members = self.class_members(body);
        }
        self.controllers.push(controller);
        Ok(())
    }

    fn visit_call(&mut self, call: &CallExpression<'a>) -> Result<(), AnalyzerError> {
        if !call.is_method("controller") {
            return Ok(());
        }
        let args = call.arguments();
        let [name, reference] = args.as_slice() else {
            return Ok(());
        };
        let Some(alias) = self.query.get_string_value(*name) else {
            debug!(path = %self.query.unit().path().display(), "controller name is not static");
            return Ok(());
        };
        match registered_class(self.query, *reference) {
            Some(class_name) => self.aliases.push((class_name.to_string(), alias)),
            None => debug!(alias, "controller registration without class reference"),
        }
        Ok(())
    }
}

impl<'a> ControllerVisitor<'a, '_> {
    /// 登録名を反映する
    ///
    /// 同じクラスに2つ目の登録名があれば、別エントリとして複製する
    fn finish(mut self) -> Vec<Controller> {
        for (class_name, alias) in std::mem::take(&mut self.aliases) {
            if self
                .controllers
                .iter()
                .any(|c| c.class_name == class_name && c.name == alias)
            {
                continue;
            }
            if let Some(unaliased) = self
                .controllers
                .iter_mut()
                .find(|c| c.class_name == class_name && c.name == c.class_name)
            {
                unaliased.name = alias;
                continue;
            }
            let Some(template) = self.controllers.iter().find(|c| c.class_name == class_name) else {
                debug!(class_name, alias, "registered controller class is not declared in this file");
                continue;
            };
            let mut copy = template.clone();
            copy.name = alias;
            self.controllers.push(copy);
        }
        self.controllers
    }

    // ========== クラスメンバー ==========

    fn class_members(&self, body: Node<'a>) -> Vec<Member> {
        let mut members: Vec<Member> = Vec::new();
        let mut cursor = body.walk();
        for node in body.named_children(&mut cursor) {
            let member = match node.kind() {
                "method_definition" => {
                    if self.is_constructor(node) {
                        members.extend(self.parameter_properties(node));
                        continue;
                    }
                    self.method_member(node)
                }
                "public_field_definition" | "field_definition" => self.field_member(node),
                "abstract_method_signature" | "method_signature" => self.method_member(node),
                _ => None,
            };
            if let Some(member) = member {
                if !members.iter().any(|m| m.name() == member.name()) {
                    members.push(member);
                }
            }
        }
        members
    }

    fn is_constructor(&self, method: Node<'a>) -> bool {
        method
            .child_by_field_name("name")
            .is_some_and(|n| self.query.text(n) == "constructor")
    }

    fn method_member(&self, node: Node<'a>) -> Option<Member> {
        let name_node = node.child_by_field_name("name")?;
        let name = property_name(self.query, name_node)?;
        let is_public = is_public(self.query, node, name_node);
        let return_type = type_text(self.query, node.child_by_field_name("return_type"));

        if has_keyword(node, "get") || has_keyword(node, "set") {
            return Some(Member::Property(Property {
                name,
                return_type,
                is_public,
                span: Span::of(name_node),
            }));
        }

        Some(Member::Method(Method {
            name,
            return_type,
            is_public,
            span: Span::of(name_node),
            parameters: self.parameters(node.child_by_field_name("parameters")),
        }))
    }

    fn field_member(&self, node: Node<'a>) -> Option<Member> {
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| node.child_by_field_name("property"))?;
        let name = property_name(self.query, name_node)?;
        let is_public = is_public(self.query, node, name_node);
        let declared_type = node.child_by_field_name("type");

        let value = node.child_by_field_name("value").map(unwrap_expression);
        if let Some(function) = value.filter(|v| is_function_node(*v)) {
            let return_type = match function.child_by_field_name("return_type") {
                Some(annotation) => type_text(self.query, Some(annotation)),
                None => type_text(self.query, declared_type),
            };
            return Some(Member::Method(Method {
                name,
                return_type,
                is_public,
                span: Span::of(name_node),
                parameters: self.function_parameters(function),
            }));
        }

        Some(Member::Property(Property {
            name,
            return_type: type_text(self.query, declared_type),
            is_public,
            span: Span::of(name_node),
        }))
    }

    /// アクセス修飾子付きのコンストラクタ引数（パラメータプロパティ）
    fn parameter_properties(&self, constructor: Node<'a>) -> Vec<Member> {
        let Some(params) = constructor.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut cursor = params.walk();
        let params: Vec<Node<'a>> = params.named_children(&mut cursor).collect();
        params
            .into_iter()
            .filter_map(|param| {
                let modifier = accessibility_modifier(self.query, param)?;
                let pattern = param.child_by_field_name("pattern")?;
                Some(Member::Property(Property {
                    name: self.query.text(pattern).to_string(),
                    return_type: type_text(self.query, param.child_by_field_name("type")),
                    is_public: modifier != "private",
                    span: Span::of(pattern),
                }))
            })
            .collect()
    }

    // ========== 関数コントローラー ==========

    /// 関数本体直下の `this.x = ...` からメンバーを集める
    fn function_members(&self, body: Node<'a>) -> Vec<Member> {
        let mut members: Vec<Member> = Vec::new();
        let mut cursor = body.walk();
        for statement in body.named_children(&mut cursor) {
            let Some((name, value)) = this_assignment(self.query, statement) else {
                continue;
            };
            let span = statement
                .named_child(0)
                .and_then(|a| a.child_by_field_name("left"))
                .and_then(|l| l.child_by_field_name("property"))
                .map(Span::of)
                .unwrap_or_else(|| Span::of(statement));
            let value = unwrap_expression(value);
            let member = if is_function_node(value) {
                Member::Method(Method {
                    name: name.to_string(),
                    return_type: type_text(self.query, value.child_by_field_name("return_type")),
                    is_public: true,
                    span,
                    parameters: self.function_parameters(value),
                })
            } else {
                Member::Property(Property {
                    name: name.to_string(),
                    return_type: ANY_TYPE.to_string(),
                    is_public: true,
                    span,
                })
            };
            if let Some(existing) = members.iter_mut().find(|m| m.name() == name) {
                *existing = member;
            } else {
                members.push(member);
            }
        }
        members
    }

    // ========== パラメータ ==========

    fn function_parameters(&self, function: Node<'a>) -> Vec<MethodParameter> {
        if let Some(single) = function.child_by_field_name("parameter") {
            return vec![MethodParameter {
                name: self.query.text(single).to_string(),
                ty: ANY_TYPE.to_string(),
            }];
        }
        self.parameters(function.child_by_field_name("parameters"))
    }

    fn parameters(&self, params: Option<Node<'a>>) -> Vec<MethodParameter> {
        let Some(params) = params else {
            return Vec::new();
        };
        let mut cursor = params.walk();
        let params: Vec<Node<'a>> = params.named_children(&mut cursor).collect();
        params
            .into_iter()
            .filter_map(|param| {
                let (name, ty) = match param.kind() {
                    "required_parameter" | "optional_parameter" => (
                        param.child_by_field_name("pattern")?,
                        type_text(self.query, param.child_by_field_name("type")),
                    ),
                    "identifier" | "object_pattern" | "array_pattern" => {
                        (param, ANY_TYPE.to_string())
                    }
                    "assignment_pattern" => {
                        (param.child_by_field_name("left")?, ANY_TYPE.to_string())
                    }
                    "rest_pattern" => (param.named_child(0)?, ANY_TYPE.to_string()),
                    _ => return None,
                };
                Some(MethodParameter {
                    name: self.query.text(name).to_string(),
                    ty,
                })
            })
            .collect()
    }
}

/// 関数やメソッドの内側で宣言された関数か
fn is_nested_in_function(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(
            n.kind(),
            "function_declaration" | "method_definition" | "class_body"
        ) {
            return true;
        }
        current = n.parent();
    }
    false
}

/// `implements ng.IComponentOptions` のような設定インターフェースを実装しているか
fn implements_marker(query: &TreeQuery, class: Node) -> bool {
    let Some(heritage) = child_of_kind(class, "class_heritage") else {
        return false;
    };
    let Some(implements) = child_of_kind(heritage, "implements_clause") else {
        return false;
    };
    let mut cursor = implements.walk();
    let found = implements.named_children(&mut cursor).any(|ty| {
        let text = query.text(ty);
        let text = text.split('<').next().unwrap_or(text);
        let simple = text.rsplit('.').next().unwrap_or(text).trim();
        CONFIG_MARKER_INTERFACES.contains(simple)
    });
    found
}

/// `extends Base` の基底クラス名
fn base_class_name(query: &TreeQuery, class: Node) -> Option<String> {
    let heritage = child_of_kind(class, "class_heritage")?;
    let value = match child_of_kind(heritage, "extends_clause") {
        // TS: extends_clause の value
        Some(extends) => {
            let mut cursor = extends.walk();
            let values: Vec<Node> = extends
                .children_by_field_name("value", &mut cursor)
                .collect();
            match values.as_slice() {
                [single] => *single,
                _ => return None,
            }
        }
        // JS: class_heritage の直下が式
        None => heritage
            .named_child(0)
            .filter(|n| n.kind() != "implements_clause")?,
    };
    Some(query.text(value).to_string())
}

/// `.controller(name, X)` / `.controller(name, ['$dep', X])` の X
fn registered_class<'a>(query: &TreeQuery<'a>, reference: Node<'a>) -> Option<&'a str> {
    let reference = unwrap_expression(reference);
    match reference.kind() {
        "identifier" => Some(query.text(reference)),
        "array" => {
            let count = reference.named_child_count();
            let last = (0..count)
                .rev()
                .filter_map(|i| reference.named_child(i))
                .find(|n| n.kind() != "comment")?;
            registered_class(query, last)
        }
        _ => None,
    }
}

fn child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn has_keyword(node: Node, keyword: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .take_while(|c| c.kind() != "formal_parameters")
        .any(|c| !c.is_named() && c.kind() == keyword);
    found
}

fn accessibility_modifier<'a>(query: &TreeQuery<'a>, node: Node<'a>) -> Option<&'a str> {
    child_of_kind(node, "accessibility_modifier").map(|m| query.text(m))
}

/// private 修飾子または `#name` でなければ公開
fn is_public(query: &TreeQuery, member: Node, name: Node) -> bool {
    if name.kind() == "private_property_identifier" {
        return false;
    }
    let mut cursor = member.walk();
    let private = member
        .children(&mut cursor)
        .filter(|c| c.kind() == "accessibility_modifier")
        .any(|m| query.text(m) == "private");
    !private
}

/// `: Type` 注釈から型名を取り出す（なければ any）
fn type_text(query: &TreeQuery, annotation: Option<Node>) -> String {
    annotation
        .map(|a| query.text(a).trim_start_matches(':').trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| ANY_TYPE.to_string())
}
