use std::path::Path;

use tracing::debug;
use tree_sitter::Node;

use super::config_accessor::ConfigAccessor;
use super::query::{is_class_node, is_function_node, unwrap_expression, TreeQuery};
use super::source::{ParseContext, SourceUnit};
use super::syntax::{walk, CallExpression, ClassDeclaration, Visitor};
use crate::error::AnalyzerError;
use crate::model::{Directive, Restrict, Span};
use crate::util::same_path;

/// ディレクティブの抽出
///
/// 認識パターン:
/// ```javascript
/// // クラスディレクティブ
/// .directive('classDirective', () => new ClassDirective())
/// .directive('classDirective', ClassDirective.factory())
/// .directive('classDirective', function() { return new ClassDirective(); })
/// // 関数ディレクティブ
/// .directive('myDir', function() { return { restrict: 'E' }; })
/// .directive('myDir', ['$dep', function($dep) { return { restrict: 'A' }; }])
/// .directive('myDir', myDirFactory)
/// ```
#[derive(Debug, Default)]
pub struct DirectiveParser;

impl DirectiveParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, unit: &SourceUnit, ctx: &ParseContext) -> Result<Vec<Directive>, AnalyzerError> {
        let query = TreeQuery::new(unit, ctx);
        let mut visitor = DirectiveVisitor {
            query: &query,
            classes: Vec::new(),
            registrations: Vec::new(),
        };
        walk(unit, &mut visitor)?;
        Ok(visitor.finish())
    }
}

/// 登録呼び出しの第2引数が指すもの
enum Factory {
    /// このファイル内のクラス
    LocalClass(String),
    /// 他ファイルで定義されたクラス
    ImportedClass(Directive),
    /// 返却されるディレクティブ定義オブジェクト
    Definition(Restrict),
}

struct DirectiveVisitor<'a, 'q> {
    query: &'q TreeQuery<'a>,
    /// 名前が付くまでの仮エントリ（クラス名で引く）
    classes: Vec<Directive>,
    registrations: Vec<CallExpression<'a>>,
}

impl<'a> Visitor<'a> for DirectiveVisitor<'a, '_> {
    fn visit_class(&mut self, class: &ClassDeclaration<'a>) -> Result<(), AnalyzerError> {
        if let Some(name) = class.name {
            let directive = class_directive(self.query, class.node, name);
            self.classes.push(directive);
        }
        Ok(())
    }

    fn visit_call(&mut self, call: &CallExpression<'a>) -> Result<(), AnalyzerError> {
        if call.is_method("directive") && call.arguments().len() == 2 {
            self.registrations.push(*call);
        }
        Ok(())
    }
}

impl DirectiveVisitor<'_, '_> {
    /// 登録呼び出しと突き合わせ、名前が付いたものだけを返す
    fn finish(self) -> Vec<Directive> {
        let origin = self.query.unit().path();
        let mut directives = Vec::new();

        for call in &self.registrations {
            let args = call.arguments();
            let (Some(name_node), Some(factory_node)) = (args.first(), args.get(1)) else {
                continue;
            };
            let Some(name) = self.query.get_string_value(*name_node) else {
                debug!(path = %origin.display(), "directive name is not static");
                continue;
            };
            let factory = self.query.follow(*factory_node, &mut |q: &TreeQuery<'_>, n: Node<'_>| {
                factory_of(q, n, origin)
            });

            let directive = match factory {
                Some(Factory::LocalClass(class_name)) => {
                    let Some(provisional) = self
                        .classes
                        .iter()
                        .find(|d| d.class_name.as_deref() == Some(class_name.as_str()))
                    else {
                        debug!(class_name, "directive class not found");
                        continue;
                    };
                    let mut directive = provisional.clone();
                    directive.set_name(name);
                    directive
                }
                Some(Factory::ImportedClass(mut directive)) => {
                    directive.set_name(name);
                    directive
                }
                Some(Factory::Definition(restrict)) => {
                    let mut directive =
                        Directive::new(name, origin.to_path_buf(), Span::of(*name_node));
                    directive.restrict = restrict;
                    directive
                }
                None => {
                    debug!(name, path = %origin.display(), "unrecognized directive factory");
                    continue;
                }
            };
            directives.push(directive);
        }

        directives.retain(|d| !d.name.is_empty());
        directives
    }
}

/// 名前未設定のクラスディレクティブ（restrict はフィールドまたはコンストラクタ代入から）
fn class_directive(query: &TreeQuery, class: Node, name: Node) -> Directive {
    let mut directive = Directive::new("", query.unit().path().to_path_buf(), Span::of(name));
    directive.class_name = Some(query.text(name).to_string());
    directive.restrict = ConfigAccessor::from_class(query, class)
        .get("restrict")
        .and_then(|value| query.get_string_value(value))
        .map(|value| Restrict::parse(&value))
        .unwrap_or_default();
    directive
}

/// ファクトリ式の終端ノードを分類する
fn factory_of(query: &TreeQuery, node: Node, origin: &Path) -> Option<Factory> {
    match node.kind() {
        "array" => {
            // DI配列は末尾の要素だけを見る
            let count = node.named_child_count();
            let last = (0..count)
                .rev()
                .filter_map(|i| node.named_child(i))
                .find(|n| n.kind() != "comment")?;
            query.follow(last, &mut |q: &TreeQuery<'_>, n: Node<'_>| factory_of(q, n, origin))
        }
        // ClassName.factory()
        "call_expression" => {
            let callee = node.child_by_field_name("function")?;
            if callee.kind() != "member_expression" {
                return None;
            }
            let object = unwrap_expression(callee.child_by_field_name("object")?);
            class_factory(query, object, origin)
        }
        _ if is_function_node(node) => {
            let returned = returned_expression(node)?;
            match returned.kind() {
                "new_expression" => {
                    let constructor = returned.child_by_field_name("constructor")?;
                    class_factory(query, constructor, origin)
                }
                _ => query.follow(returned, &mut |q: &TreeQuery<'_>, n: Node<'_>| {
                    definition_object(q, n)
                }),
            }
        }
        _ => None,
    }
}

/// クラスを指す識別子から Factory を作る
fn class_factory(query: &TreeQuery, class_ref: Node, origin: &Path) -> Option<Factory> {
    if class_ref.kind() != "identifier" {
        return None;
    }
    let name = query.text(class_ref);
    let local = query
        .declaration_of(name, class_ref)
        .filter(|decl| is_class_node(*decl));
    if local.is_some() && same_path(query.unit().path(), origin) {
        return Some(Factory::LocalClass(name.to_string()));
    }
    query.follow(class_ref, &mut |q: &TreeQuery<'_>, n: Node<'_>| {
        if !is_class_node(n) {
            return None;
        }
        let name = n.child_by_field_name("name")?;
        Some(Factory::ImportedClass(class_directive(q, n, name)))
    })
}

/// 関数ディレクティブが返す定義オブジェクト
fn definition_object(query: &TreeQuery, node: Node) -> Option<Factory> {
    if node.kind() != "object" {
        return None;
    }
    let restrict = ConfigAccessor::from_object(query, node)
        .get("restrict")
        .and_then(|value| query.get_string_value(value))
        .map(|value| Restrict::parse(&value))
        .unwrap_or_default();
    Some(Factory::Definition(restrict))
}

/// 関数が返す式（アロー関数の式本体、またはブロック直下の return）
pub(crate) fn returned_expression(function: Node) -> Option<Node> {
    let body = function.child_by_field_name("body")?;
    if body.kind() != "statement_block" {
        return Some(unwrap_expression(body));
    }
    let mut cursor = body.walk();
    let statement = body
        .named_children(&mut cursor)
        .find(|s| s.kind() == "return_statement")?;
    statement
        .named_child(0)
        .filter(|n| n.kind() != "comment")
        .map(unwrap_expression)
}
