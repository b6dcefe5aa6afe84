//! 設定（オブジェクトリテラル／クラス）を `名前 → 式` の表として扱う

use tree_sitter::Node;

use super::query::{is_class_node, unwrap_expression, TreeQuery};

/// 設定ソースを正規化した `名前 → 式` の表
///
/// クラスの場合はフィールド宣言を先に取り込み、コンストラクタ内の
/// `this.field = expr;` をその後に適用する（同名は後勝ち）
#[derive(Clone, Debug)]
pub struct ConfigAccessor<'a> {
    node: Node<'a>,
    entries: Vec<(String, Node<'a>)>,
}

impl<'a> ConfigAccessor<'a> {
    /// オブジェクトリテラル・クラス・同一ファイル内クラスの `new` 式から生成
    pub fn from_node(query: &TreeQuery<'a>, node: Node<'a>) -> Option<Self> {
        let node = unwrap_expression(node);
        match node.kind() {
            "object" => Some(Self::from_object(query, node)),
            "new_expression" => {
                let constructor = node.child_by_field_name("constructor")?;
                if constructor.kind() != "identifier" {
                    return None;
                }
                let class = query.declaration_of(query.text(constructor), constructor)?;
                is_class_node(class).then(|| Self::from_class(query, class))
            }
            _ if is_class_node(node) => Some(Self::from_class(query, node)),
            _ => None,
        }
    }

    /// オブジェクトリテラルの各プロパティを取り込む
    pub fn from_object(query: &TreeQuery<'a>, object: Node<'a>) -> Self {
        let mut accessor = Self {
            node: object,
            entries: Vec::new(),
        };
        let mut cursor = object.walk();
        for child in object.named_children(&mut cursor) {
            match child.kind() {
                "pair" => {
                    let key = child
                        .child_by_field_name("key")
                        .and_then(|k| property_name(query, k));
                    if let (Some(key), Some(value)) = (key, child.child_by_field_name("value")) {
                        accessor.set(key, value);
                    }
                }
                "shorthand_property_identifier" => {
                    accessor.set(query.text(child).to_string(), child);
                }
                "method_definition" => {
                    if let Some(key) = child
                        .child_by_field_name("name")
                        .and_then(|k| property_name(query, k))
                    {
                        accessor.set(key, child);
                    }
                }
                _ => {}
            }
        }
        accessor
    }

    /// クラスのフィールド宣言とコンストラクタ代入を取り込む
    pub fn from_class(query: &TreeQuery<'a>, class: Node<'a>) -> Self {
        let mut accessor = Self {
            node: class,
            entries: Vec::new(),
        };
        let Some(body) = class.child_by_field_name("body") else {
            return accessor;
        };

        accessor.apply_field_declarations(query, body);
        accessor.apply_constructor_assignments(query, body);
        accessor
    }

    fn apply_field_declarations(&mut self, query: &TreeQuery<'a>, body: Node<'a>) {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            let name = match member.kind() {
                // TS: name / JS: property
                "public_field_definition" => member.child_by_field_name("name"),
                "field_definition" => member.child_by_field_name("property"),
                _ => continue,
            };
            let key = name.and_then(|n| property_name(query, n));
            if let (Some(key), Some(value)) = (key, member.child_by_field_name("value")) {
                self.set(key, value);
            }
        }
    }

    fn apply_constructor_assignments(&mut self, query: &TreeQuery<'a>, body: Node<'a>) {
        let Some(constructor_body) = constructor_body(query, body) else {
            return;
        };
        let mut cursor = constructor_body.walk();
        for statement in constructor_body.named_children(&mut cursor) {
            if let Some((name, value)) = this_assignment(query, statement) {
                self.set(name.to_string(), value);
            }
        }
    }

    fn set(&mut self, name: String, value: Node<'a>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Node<'a>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 取り込んだ全エントリ（最初に現れた順）
    pub fn entries(&self) -> impl Iterator<Item = (&str, Node<'a>)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// 元になったノード（オブジェクトリテラルまたはクラス）
    pub fn node(&self) -> Node<'a> {
        self.node
    }

    pub fn is_class(&self) -> bool {
        is_class_node(self.node)
    }
}

/// プロパティキーの名前（識別子・文字列・数値）
pub fn property_name(query: &TreeQuery, key: Node) -> Option<String> {
    match key.kind() {
        "property_identifier" | "private_property_identifier" | "identifier" | "number" => {
            Some(query.text(key).to_string())
        }
        "string" => query.string_literal(key),
        _ => None,
    }
}

/// クラス本体からコンストラクタの本体を探す
pub fn constructor_body<'a>(query: &TreeQuery<'a>, class_body: Node<'a>) -> Option<Node<'a>> {
    let mut cursor = class_body.walk();
    let constructor = class_body.named_children(&mut cursor).find(|m| {
        m.kind() == "method_definition"
            && m.child_by_field_name("name")
                .is_some_and(|n| query.text(n) == "constructor")
    })?;
    constructor.child_by_field_name("body")
}

/// `this.field = expr;` の形の文から (field, expr) を取り出す
pub fn this_assignment<'a>(query: &TreeQuery<'a>, statement: Node<'a>) -> Option<(&'a str, Node<'a>)> {
    if statement.kind() != "expression_statement" {
        return None;
    }
    let assignment = statement.named_child(0)?;
    if assignment.kind() != "assignment_expression" {
        return None;
    }
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "member_expression" {
        return None;
    }
    let object = left.child_by_field_name("object")?;
    if object.kind() != "this" {
        return None;
    }
    let property = left.child_by_field_name("property")?;
    let right = assignment.child_by_field_name("right")?;
    Some((query.text(property), right))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::analyzer::source::{Documents, ParseContext, SourceUnit};

    fn entries_of(source: &str, file: &str) -> Vec<(String, String)> {
        let unit = SourceUnit::parse_from_text(source, Path::new(file)).unwrap();
        let ctx = ParseContext::new("/app", Documents::new(), unit.path());
        let query = TreeQuery::new(&unit, &ctx);
        let root = unit.root();
        let mut target = None;
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            if n.kind() == "object" || is_class_node(n) {
                target = Some(n);
                break;
            }
            let mut c = n.walk();
            let children: Vec<_> = n.named_children(&mut c).collect();
            stack.extend(children.into_iter().rev());
        }
        let accessor = ConfigAccessor::from_node(&query, target.unwrap()).unwrap();
        accessor
            .entries()
            .map(|(name, value)| (name.to_string(), query.text(value).to_string()))
            .collect()
    }

    #[test]
    fn test_object_literal_entries() {
        let entries = entries_of(
            "x({ template: 'a', 'controllerAs': 'vm', bindings, $onInit() {} });",
            "/app/a.js",
        );
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["template", "controllerAs", "bindings", "$onInit"]);
        assert_eq!(entries[0].1, "'a'");
    }

    #[test]
    fn test_class_fields_typescript() {
        let entries = entries_of(
            "class Foo implements ng.IComponentOptions {\n  controller = 'FooCtrl';\n  bindings = { x: '<' };\n  noValue: string;\n}",
            "/app/a.ts",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("controller".to_string(), "'FooCtrl'".to_string()));
    }

    #[test]
    fn test_class_fields_javascript() {
        let entries = entries_of("class Foo {\n  restrict = 'E';\n}", "/app/a.js");
        assert_eq!(entries, vec![("restrict".to_string(), "'E'".to_string())]);
    }

    #[test]
    fn test_constructor_assignment_overrides_declaration() {
        let entries = entries_of(
            "class Foo {\n  template = 'declared';\n  constructor() {\n    this.template = 'assigned';\n    this.controllerAs = 'vm';\n    other.x = 1;\n  }\n}",
            "/app/a.ts",
        );
        assert_eq!(
            entries,
            vec![
                ("template".to_string(), "'assigned'".to_string()),
                ("controllerAs".to_string(), "'vm'".to_string()),
            ]
        );
    }
}
