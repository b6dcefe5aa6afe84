//! 構文木への汎用問い合わせ
//!
//! 宣言・importの索引を構築時に一度だけ作り、識別子の解決はそこから引く。
//! 静的に解決できない値は `None`（ResolutionMiss）として返し、エラーにはしない

use std::collections::HashMap;

use tracing::debug;
use tree_sitter::Node;

use super::config_accessor::ConfigAccessor;
use super::source::{ParseContext, SourceUnit};
use crate::model::Span;

/// 識別子を辿る最大段数（`var a = b; var b = a;` のような自己参照対策）
const MAX_FOLLOW_DEPTH: usize = 16;

/// 式を辿った先の終端ノードに適用する処理
///
/// 別ファイルへ解決が進んだ場合は、そのファイルの `TreeQuery` が渡される
pub type Resolve<'f, R> = dyn for<'b> FnMut(&TreeQuery<'b>, Node<'b>) -> Option<R> + 'f;

/// import でバインドされた名前の由来
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Imported {
    /// `import x from './x'`
    Default,
    /// `import { a as x } from './x'`
    Named(String),
    /// `import * as x from './x'` / `import x = require('./x')`
    Namespace,
}

#[derive(Clone, Debug)]
pub struct ImportBinding {
    pub source: String,
    pub imported: Imported,
}

/// クラスノード（宣言・式）かどうか
pub fn is_class_node(node: Node) -> bool {
    matches!(
        node.kind(),
        "class_declaration" | "abstract_class_declaration" | "class"
    )
}

/// 関数ノード（宣言・式・アロー関数）かどうか
pub fn is_function_node(node: Node) -> bool {
    matches!(
        node.kind(),
        "function_declaration"
            | "function_expression"
            | "function"
            | "arrow_function"
            | "generator_function_declaration"
    )
}

/// 型アサーション・括弧などの包みを外す
pub fn unwrap_expression(mut node: Node) -> Node {
    loop {
        let inner = match node.kind() {
            "as_expression" | "satisfies_expression" | "non_null_expression"
            | "parenthesized_expression" => node.named_child(0),
            "type_assertion" => node.named_child(1),
            _ => None,
        };
        match inner {
            Some(inner) => node = inner,
            None => return node,
        }
    }
}

/// 宣言のスコープとなる最も近いブロック
fn scope_of(node: Node) -> Option<Node> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(n.kind(), "statement_block" | "program") {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

fn encloses(scope: Node, site: Node) -> bool {
    scope.start_byte() <= site.start_byte() && site.end_byte() <= scope.end_byte()
}

pub struct TreeQuery<'a> {
    unit: &'a SourceUnit,
    ctx: &'a ParseContext,
    /// 名前 → (スコープ, 宣言ノード)
    declarations: HashMap<&'a str, Vec<(Node<'a>, Node<'a>)>>,
    imports: HashMap<&'a str, ImportBinding>,
}

impl<'a> TreeQuery<'a> {
    pub fn new(unit: &'a SourceUnit, ctx: &'a ParseContext) -> Self {
        let mut query = Self {
            unit,
            ctx,
            declarations: HashMap::new(),
            imports: HashMap::new(),
        };
        query.index();
        query
    }

    pub fn unit(&self) -> &'a SourceUnit {
        self.unit
    }

    pub fn ctx(&self) -> &'a ParseContext {
        self.ctx
    }

    pub fn text(&self, node: Node) -> &'a str {
        self.unit.node_text(node)
    }

    pub fn span(&self, node: Node) -> Span {
        Span::of(node)
    }

    // ========== 索引 ==========

    fn index(&mut self) {
        let root = self.unit.root();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "variable_declarator" => self.index_declaration(node),
                "class_declaration"
                | "abstract_class_declaration"
                | "function_declaration"
                | "generator_function_declaration" => self.index_declaration(node),
                "import_statement" => self.index_import(node),
                _ => {}
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    fn index_declaration(&mut self, node: Node<'a>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        if !matches!(name.kind(), "identifier" | "type_identifier") {
            return;
        }
        let Some(scope) = scope_of(node) else {
            return;
        };
        self.declarations
            .entry(self.unit.node_text(name))
            .or_default()
            .push((scope, node));
    }

    fn index_import(&mut self, node: Node<'a>) {
        let unit = self.unit;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_clause" => {
                    let Some(source) = node
                        .child_by_field_name("source")
                        .and_then(|s| self.string_literal(s))
                    else {
                        return;
                    };
                    self.index_import_clause(child, &source);
                }
                "import_require_clause" => {
                    let source = child
                        .child_by_field_name("source")
                        .and_then(|s| self.string_literal(s));
                    let local = child.named_child(0).filter(|n| n.kind() == "identifier");
                    if let (Some(source), Some(local)) = (source, local) {
                        self.imports.insert(
                            unit.node_text(local),
                            ImportBinding {
                                source,
                                imported: Imported::Namespace,
                            },
                        );
                    }
                }
                _ => {}
            }
        }
    }

    fn index_import_clause(&mut self, clause: Node<'a>, source: &str) {
        let unit = self.unit;
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => {
                    self.imports.insert(
                        unit.node_text(child),
                        ImportBinding {
                            source: source.to_string(),
                            imported: Imported::Default,
                        },
                    );
                }
                "namespace_import" => {
                    if let Some(local) = child.named_child(0) {
                        self.imports.insert(
                            unit.node_text(local),
                            ImportBinding {
                                source: source.to_string(),
                                imported: Imported::Namespace,
                            },
                        );
                    }
                }
                "named_imports" => {
                    let mut specifiers = child.walk();
                    for specifier in child.named_children(&mut specifiers) {
                        if specifier.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = specifier.child_by_field_name("name") else {
                            continue;
                        };
                        let local = specifier.child_by_field_name("alias").unwrap_or(name);
                        self.imports.insert(
                            unit.node_text(local),
                            ImportBinding {
                                source: source.to_string(),
                                imported: Imported::Named(unit.node_text(name).to_string()),
                            },
                        );
                    }
                }
                _ => {}
            }
        }
    }

    /// 使用箇所から見える宣言（最も内側のスコープを優先）
    pub fn declaration_of(&self, name: &str, site: Node) -> Option<Node<'a>> {
        self.declarations
            .get(name)?
            .iter()
            .filter(|(scope, _)| encloses(*scope, site))
            .max_by_key(|(scope, _)| scope.start_byte())
            .map(|(_, decl)| *decl)
    }

    /// トップレベルの宣言
    pub fn top_level(&self, name: &str) -> Option<Node<'a>> {
        self.declaration_of(name, self.unit.root())
    }

    pub fn import_of(&self, name: &str) -> Option<&ImportBinding> {
        self.imports.get(name)
    }

    // ========== 値の解決 ==========

    /// 文字列リテラル・置換なしテンプレートリテラルの中身
    pub fn string_literal(&self, node: Node) -> Option<String> {
        match node.kind() {
            "string" => {
                let text = self.text(node);
                Some(text.get(1..text.len().saturating_sub(1)).unwrap_or("").to_string())
            }
            "template_string" => {
                let mut cursor = node.walk();
                if node
                    .named_children(&mut cursor)
                    .any(|c| c.kind() == "template_substitution")
                {
                    return None;
                }
                let text = self.text(node);
                Some(text.get(1..text.len().saturating_sub(1)).unwrap_or("").to_string())
            }
            _ => None,
        }
    }

    /// 式から静的に文字列を求める
    ///
    /// 識別子は宣言の初期化式へ、`obj.prop` はオブジェクトやクラスフィールドへ辿る。
    /// import された識別子は別ファイルまで追う
    pub fn get_string_value(&self, node: Node<'a>) -> Option<String> {
        self.follow(node, &mut |q: &TreeQuery<'_>, n: Node<'_>| q.string_literal(n))
    }

    /// 式から同一ファイル内のオブジェクトリテラルを求める
    pub fn get_object_literal_value(&self, node: Node<'a>) -> Option<Node<'a>> {
        let mut steps = MAX_FOLLOW_DEPTH;
        self.object_literal_within(node, &mut steps)
    }

    /// `steps` はネストした `obj.prop` の解決と共有する残り段数
    fn object_literal_within(&self, node: Node<'a>, steps: &mut usize) -> Option<Node<'a>> {
        let mut node = unwrap_expression(node);
        loop {
            if *steps == 0 {
                debug!(path = %self.unit.path().display(), "gave up following object literal");
                return None;
            }
            *steps -= 1;
            match node.kind() {
                "object" => return Some(node),
                "identifier" => {
                    let decl = self.declaration_of(self.text(node), node)?;
                    node = unwrap_expression(decl.child_by_field_name("value")?);
                }
                "member_expression" => {
                    let object = node.child_by_field_name("object")?;
                    let property = self.text(node.child_by_field_name("property")?);
                    let target = self.object_literal_within(object, steps)?;
                    node = unwrap_expression(ConfigAccessor::from_object(self, target).get(property)?);
                }
                _ => return None,
            }
        }
    }

    /// 式を静的に辿り、終端ノードに `f` を適用する
    ///
    /// 終端は文字列・オブジェクト・クラス・関数・`new` 式など、それ以上辿れないノード
    pub fn follow<R>(&self, node: Node<'a>, f: &mut Resolve<'_, R>) -> Option<R> {
        self.follow_at(node, f, 0)
    }

    fn follow_at<R>(&self, node: Node<'a>, f: &mut Resolve<'_, R>, depth: usize) -> Option<R> {
        if depth > MAX_FOLLOW_DEPTH {
            debug!(path = %self.unit.path().display(), "gave up following expression");
            return None;
        }
        let node = unwrap_expression(node);
        match node.kind() {
            "identifier" | "shorthand_property_identifier" => {
                let name = self.text(node);
                if let Some(decl) = self.declaration_of(name, node) {
                    return self.follow_declaration(decl, f, depth + 1);
                }
                if let Some(binding) = self.imports.get(name) {
                    return self.follow_import(binding, None, f);
                }
                debug!(name, path = %self.unit.path().display(), "unresolved identifier");
                None
            }
            "member_expression" => self.follow_member(node, f, depth),
            _ => f(self, node),
        }
    }

    fn follow_declaration<R>(&self, decl: Node<'a>, f: &mut Resolve<'_, R>, depth: usize) -> Option<R> {
        if decl.kind() == "variable_declarator" {
            let value = decl.child_by_field_name("value")?;
            return self.follow_at(value, f, depth);
        }
        f(self, decl)
    }

    fn follow_member<R>(&self, node: Node<'a>, f: &mut Resolve<'_, R>, depth: usize) -> Option<R> {
        let object = unwrap_expression(node.child_by_field_name("object")?);
        let property = self.text(node.child_by_field_name("property")?);

        if object.kind() == "this" {
            let class = enclosing_class(node)?;
            let value = ConfigAccessor::from_class(self, class).get(property)?;
            return self.follow_at(value, f, depth + 1);
        }

        if object.kind() == "identifier" {
            let name = self.text(object);
            if self.declaration_of(name, object).is_none() {
                if let Some(binding) = self.imports.get(name) {
                    if binding.imported == Imported::Namespace {
                        return self.follow_import(binding, Some(property), f);
                    }
                }
            }
        }

        self.follow_at(
            object,
            &mut |q: &TreeQuery<'_>, target: Node<'_>| {
                let value = ConfigAccessor::from_node(q, target)?.get(property)?;
                q.follow_at(value, &mut *f, depth + 1)
            },
            depth + 1,
        )
    }

    fn follow_import<R>(&self, binding: &ImportBinding, member: Option<&str>, f: &mut Resolve<'_, R>) -> Option<R> {
        let name = match (&binding.imported, member) {
            (Imported::Named(name), _) => name.as_str(),
            (Imported::Namespace, Some(member)) => member,
            (Imported::Namespace, None) | (Imported::Default, _) => "default",
        };
        self.with_module(&binding.source, &mut |q: &TreeQuery<'_>| {
            q.resolve_export(name, &mut *f)
        })
    }

    // ========== ファイル横断 ==========

    /// import指定子のファイルを読み込み、その `TreeQuery` で `f` を実行する
    ///
    /// 解決できない・循環している場合は None
    pub fn with_module<R>(
        &self,
        specifier: &str,
        f: &mut dyn for<'b> FnMut(&TreeQuery<'b>) -> Option<R>,
    ) -> Option<R> {
        let path = self.ctx.resolve_module(self.unit.dir(), specifier)?;
        let _guard = self.ctx.enter(&path)?;
        let unit = self.ctx.load(&path)?;
        let query = TreeQuery::new(&unit, self.ctx);
        f(&query)
    }

    /// エクスポート名から定義を辿り `f` を適用する
    ///
    /// 完全一致がない場合に限り default エクスポートを候補にする
    pub fn resolve_export<R>(&self, name: &str, f: &mut Resolve<'_, R>) -> Option<R> {
        if let Some(found) = self.resolve_export_exact(name, f) {
            return Some(found);
        }
        if name != "default" {
            debug!(name, path = %self.unit.path().display(), "falling back to default export");
            return self.resolve_export_exact("default", f);
        }
        None
    }

    fn resolve_export_exact<R>(&self, name: &str, f: &mut Resolve<'_, R>) -> Option<R> {
        let root = self.unit.root();
        let mut cursor = root.walk();
        let statements: Vec<Node<'a>> = root
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "export_statement")
            .collect();

        for statement in statements {
            let is_default = has_token(statement, "default") || has_token(statement, "=");
            let source = statement
                .child_by_field_name("source")
                .and_then(|s| self.string_literal(s));

            if let Some(declaration) = statement.child_by_field_name("declaration") {
                if is_default {
                    if name == "default" {
                        return f(self, declaration);
                    }
                    continue;
                }
                if let Some(found) = self.exported_declaration(declaration, name, f) {
                    return Some(found);
                }
                continue;
            }

            if is_default {
                if name != "default" {
                    continue;
                }
                let value = statement.child_by_field_name("value").or_else(|| {
                    let mut c = statement.walk();
                    let expr = statement
                        .named_children(&mut c)
                        .find(|n| n.kind() != "comment");
                    expr
                })?;
                return self.follow(value, f);
            }

            let clause = {
                let mut c = statement.walk();
                let clause = statement
                    .named_children(&mut c)
                    .find(|n| n.kind() == "export_clause");
                clause
            };
            match (clause, source) {
                (Some(clause), source) => {
                    let Some(local) = self.export_specifier_local(clause, name) else {
                        continue;
                    };
                    return match source {
                        Some(source) => self.with_module(&source, &mut |q: &TreeQuery<'_>| {
                            q.resolve_export_exact(local, &mut *f)
                        }),
                        None => self.follow_top_level(local, f),
                    };
                }
                (None, Some(source)) => {
                    // export * from './x'
                    if name == "default" {
                        continue;
                    }
                    let found = self.with_module(&source, &mut |q: &TreeQuery<'_>| {
                        q.resolve_export_exact(name, &mut *f)
                    });
                    if found.is_some() {
                        return found;
                    }
                }
                (None, None) => {}
            }
        }
        None
    }

    fn exported_declaration<R>(&self, declaration: Node<'a>, name: &str, f: &mut Resolve<'_, R>) -> Option<R> {
        match declaration.kind() {
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = declaration.walk();
                let declarators: Vec<Node<'a>> =
                    declaration.named_children(&mut cursor).collect();
                declarators
                    .into_iter()
                    .filter(|d| d.kind() == "variable_declarator")
                    .find(|d| {
                        d.child_by_field_name("name")
                            .is_some_and(|n| self.text(n) == name)
                    })
                    .and_then(|d| self.follow_declaration(d, f, 0))
            }
            _ => {
                let declared = declaration.child_by_field_name("name")?;
                if self.text(declared) == name {
                    f(self, declaration)
                } else {
                    None
                }
            }
        }
    }

    /// `export { local as exported }` のうち `exported == name` の local 名
    fn export_specifier_local(&self, clause: Node<'a>, name: &str) -> Option<&'a str> {
        let mut cursor = clause.walk();
        let specifiers: Vec<Node<'a>> = clause.named_children(&mut cursor).collect();
        specifiers
            .into_iter()
            .filter(|s| s.kind() == "export_specifier")
            .find_map(|specifier| {
                let local = specifier.child_by_field_name("name")?;
                let exported = specifier.child_by_field_name("alias").unwrap_or(local);
                let exported_name = self
                    .string_literal(exported)
                    .unwrap_or_else(|| self.text(exported).to_string());
                (exported_name == name).then(|| self.text(local))
            })
    }

    /// トップレベルの名前（宣言または再エクスポートされたimport）を辿る
    fn follow_top_level<R>(&self, local: &str, f: &mut Resolve<'_, R>) -> Option<R> {
        if let Some(decl) = self.top_level(local) {
            return self.follow_declaration(decl, f, 0);
        }
        let binding = self.imports.get(local)?;
        self.follow_import(binding, None, f)
    }
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| !c.is_named() && c.kind() == token);
    found
}

/// ノードを含む最も近いクラス
pub fn enclosing_class(node: Node) -> Option<Node> {
    let mut current = node.parent();
    while let Some(n) = current {
        if is_class_node(n) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}
