//! 構文ノードの種別判定と走査
//!
//! ノード種別の分岐はここで一度だけ行い、各パーサーは `Visitor` の
//! 種別ごとのハンドラだけを実装する

use tree_sitter::Node;

use super::source::SourceUnit;
use crate::error::AnalyzerError;

/// 関数呼び出し `callee(args...)`
#[derive(Clone, Copy, Debug)]
pub struct CallExpression<'a> {
    pub node: Node<'a>,
    pub callee: Node<'a>,
    /// `obj.method(...)` の `obj`
    pub object: Option<Node<'a>>,
    /// `obj.method(...)` の `method`
    pub method: Option<&'a str>,
    arguments: Option<Node<'a>>,
}

impl<'a> CallExpression<'a> {
    /// コメントを除いた引数
    pub fn arguments(&self) -> Vec<Node<'a>> {
        let Some(args) = self.arguments else {
            return Vec::new();
        };
        let mut cursor = args.walk();
        args.named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect()
    }

    pub fn argument(&self, index: usize) -> Option<Node<'a>> {
        self.arguments().get(index).copied()
    }

    pub fn is_method(&self, name: &str) -> bool {
        self.method == Some(name)
    }
}

/// クラス宣言
#[derive(Clone, Copy, Debug)]
pub struct ClassDeclaration<'a> {
    pub node: Node<'a>,
    pub name: Option<Node<'a>>,
    pub body: Option<Node<'a>>,
}

/// 関数宣言
#[derive(Clone, Copy, Debug)]
pub struct FunctionDeclaration<'a> {
    pub node: Node<'a>,
    pub name: Option<Node<'a>>,
    pub parameters: Option<Node<'a>>,
    pub body: Option<Node<'a>>,
}

/// 代入式 `left = right`
#[derive(Clone, Copy, Debug)]
pub struct Assignment<'a> {
    pub node: Node<'a>,
    pub left: Node<'a>,
    pub right: Node<'a>,
}

/// 解析で意味を持つノード種別
#[derive(Clone, Copy, Debug)]
pub enum SyntaxNode<'a> {
    Call(CallExpression<'a>),
    Class(ClassDeclaration<'a>),
    Function(FunctionDeclaration<'a>),
    Assignment(Assignment<'a>),
    Other(Node<'a>),
}

impl<'a> SyntaxNode<'a> {
    pub fn classify(node: Node<'a>, unit: &'a SourceUnit) -> Self {
        match node.kind() {
            "call_expression" => {
                let Some(callee) = node.child_by_field_name("function") else {
                    return SyntaxNode::Other(node);
                };
                let (object, method) = if callee.kind() == "member_expression" {
                    (
                        callee.child_by_field_name("object"),
                        callee
                            .child_by_field_name("property")
                            .map(|p| unit.node_text(p)),
                    )
                } else {
                    (None, None)
                };
                SyntaxNode::Call(CallExpression {
                    node,
                    callee,
                    object,
                    method,
                    arguments: node.child_by_field_name("arguments"),
                })
            }
            "class_declaration" | "abstract_class_declaration" => {
                SyntaxNode::Class(ClassDeclaration {
                    node,
                    name: node.child_by_field_name("name"),
                    body: node.child_by_field_name("body"),
                })
            }
            "function_declaration" => SyntaxNode::Function(FunctionDeclaration {
                node,
                name: node.child_by_field_name("name"),
                parameters: node.child_by_field_name("parameters"),
                body: node.child_by_field_name("body"),
            }),
            "assignment_expression" => {
                match (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) {
                    (Some(left), Some(right)) => {
                        SyntaxNode::Assignment(Assignment { node, left, right })
                    }
                    _ => SyntaxNode::Other(node),
                }
            }
            _ => SyntaxNode::Other(node),
        }
    }
}

/// 種別ごとのハンドラ（既定では何もしない）
pub trait Visitor<'a> {
    fn visit_call(&mut self, _call: &CallExpression<'a>) -> Result<(), AnalyzerError> {
        Ok(())
    }

    fn visit_class(&mut self, _class: &ClassDeclaration<'a>) -> Result<(), AnalyzerError> {
        Ok(())
    }

    fn visit_function(&mut self, _function: &FunctionDeclaration<'a>) -> Result<(), AnalyzerError> {
        Ok(())
    }

    fn visit_assignment(&mut self, _assignment: &Assignment<'a>) -> Result<(), AnalyzerError> {
        Ok(())
    }
}

/// ツリー全体を後行順に走査する
///
/// 子を先に訪問するため、`a.state(..).state(..)` のような連鎖呼び出しは記述順に届く
pub fn walk<'a, V: Visitor<'a>>(unit: &'a SourceUnit, visitor: &mut V) -> Result<(), AnalyzerError> {
    let mut cursor = unit.root().walk();
    loop {
        // 葉まで降りる
        while cursor.goto_first_child() {}

        loop {
            dispatch(SyntaxNode::classify(cursor.node(), unit), visitor)?;
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return Ok(());
            }
        }
    }
}

fn dispatch<'a, V: Visitor<'a>>(node: SyntaxNode<'a>, visitor: &mut V) -> Result<(), AnalyzerError> {
    match node {
        SyntaxNode::Call(call) => visitor.visit_call(&call),
        SyntaxNode::Class(class) => visitor.visit_class(&class),
        SyntaxNode::Function(function) => visitor.visit_function(&function),
        SyntaxNode::Assignment(assignment) => visitor.visit_assignment(&assignment),
        SyntaxNode::Other(_) => Ok(()),
    }
}
