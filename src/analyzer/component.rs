use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use tree_sitter::Node;

use super::config_accessor::ConfigAccessor;
use super::query::{is_class_node, TreeQuery};
use super::source::{ParseContext, SourceUnit};
use super::syntax::{walk, CallExpression, Visitor};
use super::template::{resolve_controller_link, resolve_template};
use crate::error::AnalyzerError;
use crate::model::{Binding, Component, Span};
use crate::util::same_path;

/// バインディング型文字列を「記号部分」と「名前の上書き」に分ける
static BINDING_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(\w+)?$").expect("binding type pattern is valid"));

/// コンポーネントの抽出
///
/// 認識パターン:
/// ```typescript
/// angular.module('app').component('card', { bindings: { value: '<' }, ... });
/// angular.module('app').component('foo', new FooComponent());
/// angular.module('app').component('bar', BarComponent);      // import された設定
/// angular.module('app').component(Details.name, Details.config);
/// ```
#[derive(Debug, Default)]
pub struct ComponentParser;

impl ComponentParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, unit: &SourceUnit, ctx: &ParseContext) -> Result<Vec<Component>, AnalyzerError> {
        let query = TreeQuery::new(unit, ctx);
        let mut visitor = RegistrationCollector::default();
        walk(unit, &mut visitor)?;

        // 登録呼び出しより後に宣言・importされた設定も参照できるよう、走査後にまとめて解決する
        let mut components = Vec::new();
        for call in &visitor.registrations {
            if let Some(component) = self.resolve_registration(&query, call)? {
                components.push(component);
            }
        }
        Ok(components)
    }

    fn resolve_registration<'a>(
        &self,
        query: &TreeQuery<'a>,
        call: &CallExpression<'a>,
    ) -> Result<Option<Component>, AnalyzerError> {
        let args = call.arguments();
        let [name_node, config_node] = args.as_slice() else {
            return Ok(None);
        };
        let origin = query.unit().path();
        let Some(name) = query.get_string_value(*name_node) else {
            debug!(path = %origin.display(), "component name is not static");
            return Ok(None);
        };

        let site = Site {
            origin,
            name: &name,
            name_span: Span::of(*name_node),
        };
        let resolved = query.follow(*config_node, &mut |q: &TreeQuery<'_>, n: Node<'_>| {
            Some(component_from_config(q, n, &site))
        });

        match resolved {
            Some(result) => {
                let component = result?;
                if let Some(component) = &component {
                    if component.template.is_none() {
                        debug!(component = %component.name, path = %component.path.display(), "component has no resolvable template");
                    }
                    if !component.link.has_reference() {
                        debug!(component = %component.name, "component has no controller reference");
                    }
                }
                Ok(component)
            }
            None => {
                debug!(component = %name, path = %origin.display(), "component configuration is not resolvable");
                Ok(None)
            }
        }
    }
}

#[derive(Default)]
struct RegistrationCollector<'a> {
    registrations: Vec<CallExpression<'a>>,
}

impl<'a> Visitor<'a> for RegistrationCollector<'a> {
    fn visit_call(&mut self, call: &CallExpression<'a>) -> Result<(), AnalyzerError> {
        if call.is_method("component") && call.arguments().len() == 2 {
            self.registrations.push(*call);
        }
        Ok(())
    }
}

/// 登録呼び出しの位置情報
struct Site<'s> {
    origin: &'s Path,
    name: &'s str,
    name_span: Span,
}

/// 設定式の終端ノードからコンポーネントを組み立てる
///
/// オブジェクトリテラル・クラス・`new Class()` 以外の形はサポート外
fn component_from_config(
    query: &TreeQuery,
    node: Node,
    site: &Site,
) -> Result<Option<Component>, AnalyzerError> {
    if node.kind() == "new_expression" {
        let Some(constructor) = node.child_by_field_name("constructor") else {
            return Err(unsupported(query, node));
        };
        let resolved = query.follow(constructor, &mut |q: &TreeQuery<'_>, n: Node<'_>| {
            is_class_node(n).then(|| component_from_config(q, n, site))
        });
        return match resolved {
            Some(result) => result,
            None => {
                debug!(component = site.name, "component class is not resolvable");
                Ok(None)
            }
        };
    }

    let Some(config) = ConfigAccessor::from_node(query, node) else {
        return Err(unsupported(query, node));
    };

    // 同一ファイル内なら名前リテラル、import経由なら定義側のクラス名・オブジェクトに位置を合わせる
    let (path, span) = if same_path(query.unit().path(), site.origin) {
        (site.origin.to_path_buf(), site.name_span)
    } else {
        let anchor = node.child_by_field_name("name").unwrap_or(node);
        (query.unit().path().to_path_buf(), Span::of(anchor))
    };

    Ok(Some(build_component(query, &config, site.name, path, span)))
}

fn build_component(
    query: &TreeQuery,
    config: &ConfigAccessor,
    name: &str,
    path: PathBuf,
    span: Span,
) -> Component {
    let mut component = Component::new(name, path, span);
    component.bindings = config
        .get("bindings")
        .and_then(|value| {
            query.follow(value, &mut |q: &TreeQuery<'_>, n: Node<'_>| {
                (n.kind() == "object").then(|| bindings_of(q, n))
            })
        })
        .unwrap_or_default();
    component.template = resolve_template(query, config);
    component.link = resolve_controller_link(query, config);
    component
}

/// `bindings` オブジェクトの各プロパティをバインディングにする
fn bindings_of(query: &TreeQuery, object: Node) -> Vec<Binding> {
    ConfigAccessor::from_object(query, object)
        .entries()
        .filter_map(|(key, value)| {
            let raw = query.get_string_value(value)?;
            let (binding_type, name_override) = split_binding_type(&raw);
            let anchor = value
                .parent()
                .filter(|p| p.kind() == "pair")
                .and_then(|p| p.child_by_field_name("key"))
                .unwrap_or(value);
            Some(Binding::new(
                name_override.unwrap_or(key),
                binding_type,
                Span::of(anchor),
            ))
        })
        .collect()
}

/// `"=otherModel"` -> (`"="`, Some(`"otherModel"`))
pub fn split_binding_type(raw: &str) -> (&str, Option<&str>) {
    match BINDING_TYPE_RE.captures(raw) {
        Some(captures) => (
            captures.get(1).map_or("", |m| m.as_str()),
            captures.get(2).map(|m| m.as_str()),
        ),
        None => (raw, None),
    }
}

fn unsupported(query: &TreeQuery, node: Node) -> AnalyzerError {
    AnalyzerError::UnsupportedConfiguration {
        kind: "component",
        path: query.unit().path().to_path_buf(),
        line: node.start_position().row as u32 + 1,
    }
}
