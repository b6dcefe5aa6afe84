//! コンポーネントとルートで共通のテンプレート・コントローラー参照の解決

use std::path::Path;

use tracing::debug;
use tree_sitter::Node;

use super::config_accessor::ConfigAccessor;
use super::query::{unwrap_expression, TreeQuery};
use crate::model::{ControllerLink, Span, Template};
use crate::util::{camel_to_kebab, is_html_file, join_relative, normalize_template_path};

/// テンプレートの解決
///
/// `templateUrl` が優先。なければ `template` を以下の順で解決する:
/// - 文字列・テンプレートリテラル（インライン）
/// - `require('./x.html')`（同じディレクトリからの相対パス）
/// - `import x from './x.html'` でバインドされた識別子
/// - 変数を辿った先の上記いずれか
pub fn resolve_template(query: &TreeQuery, config: &ConfigAccessor) -> Option<Template> {
    if let Some(url_node) = config.get("templateUrl") {
        match query.get_string_value(url_node) {
            Some(url) => {
                let path = query.ctx().root().join(normalize_template_path(&url));
                return Some(Template::file(path, Span::of(url_node)));
            }
            None => debug!(path = %query.unit().path().display(), "templateUrl is not static"),
        }
    }

    let template = unwrap_expression(config.get("template")?);
    if template.kind() == "identifier" {
        if let Some(import) = query.import_of(query.text(template)) {
            if is_html_file(Path::new(&import.source)) {
                let path = join_relative(query.unit().dir(), &import.source);
                return Some(Template::file(path, Span::of(template)));
            }
        }
    }

    let resolved = query.follow(template, &mut |q: &TreeQuery<'_>, n: Node<'_>| {
        template_terminal(q, n)
    });
    if resolved.is_none() {
        debug!(path = %query.unit().path().display(), "template is not statically resolvable");
    }
    resolved
}

fn template_terminal(query: &TreeQuery, node: Node) -> Option<Template> {
    if let Some(body) = query.string_literal(node) {
        return Some(Template::inline(
            query.unit().path().to_path_buf(),
            Span::of(node),
            body,
        ));
    }
    if node.kind() == "call_expression" {
        let callee = node.child_by_field_name("function")?;
        if query.text(callee) != "require" {
            return None;
        }
        let args = node.child_by_field_name("arguments")?;
        let specifier = query.string_literal(args.named_child(0)?)?;
        let path = join_relative(query.unit().dir(), &specifier);
        return Some(Template::file(path, Span::of(node)));
    }
    None
}

/// コンポーネント名を自己終了タグにしたインラインテンプレート
///
/// 例: `CompA` -> `<comp-a />`
pub fn component_tag_template(query: &TreeQuery, component_name: &str, node: Node) -> Template {
    Template::inline(
        query.unit().path().to_path_buf(),
        Span::of(node),
        format!("<{} />", camel_to_kebab(component_name)),
    )
}

/// `controller` / `controllerAs` からコントローラー参照を作る
///
/// 文字列は登録名、識別子（クラス・関数）はクラス名として扱う。
/// `'CardCtrl as card'` 形式の文字列はエイリアスも設定する
pub fn resolve_controller_link(query: &TreeQuery, config: &ConfigAccessor) -> ControllerLink {
    let mut link = ControllerLink::default();

    if let Some(value) = config.get("controller") {
        let value = controller_reference(value);
        match query.get_string_value(value) {
            Some(name) => match name.split_once(" as ") {
                Some((name, alias)) => {
                    link.controller_name = Some(name.trim().to_string());
                    link.controller_as = alias.trim().to_string();
                }
                None => link.controller_name = Some(name),
            },
            None if value.kind() == "identifier" => {
                link.controller_class_name = Some(query.text(value).to_string());
            }
            None => {}
        }
    }

    if let Some(alias) = config
        .get("controllerAs")
        .and_then(|value| query.get_string_value(value))
    {
        link.controller_as = alias;
    }
    link
}

/// `['$scope', Ctrl]` のDI配列なら末尾の要素
fn controller_reference(value: Node) -> Node {
    let value = unwrap_expression(value);
    if value.kind() != "array" {
        return value;
    }
    let count = value.named_child_count();
    (0..count)
        .rev()
        .filter_map(|i| value.named_child(i))
        .find(|n| n.kind() != "comment")
        .map(unwrap_expression)
        .unwrap_or(value)
}
