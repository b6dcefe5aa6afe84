//! HTML内のカスタム要素・属性参照の収集

use std::path::Path;

use phf::phf_set;
use tree_sitter::{Node, Parser};

use crate::error::AnalyzerError;
use crate::model::{HtmlReference, HtmlReferenceKind, Span};

/// 標準HTML属性（カスタムディレクティブとして扱わない）
static STANDARD_HTML_ATTRIBUTES: phf::Set<&'static str> = phf_set! {
    // Global attributes
    "accesskey", "autocapitalize", "autocomplete", "autofocus", "class",
    "contenteditable", "dir", "draggable", "enterkeyhint", "hidden", "id",
    "inert", "inputmode", "is", "itemid", "itemprop", "itemref", "itemscope",
    "itemtype", "lang", "nonce", "part", "popover", "role", "slot",
    "spellcheck", "style", "tabindex", "title", "translate",

    // Element-specific attributes
    "accept", "action", "align", "allow", "alt", "async", "autoplay",
    "border", "charset", "checked", "cite", "cols", "colspan", "content",
    "controls", "coords", "crossorigin", "data", "datetime", "decoding",
    "default", "defer", "disabled", "download", "enctype", "for", "form",
    "headers", "height", "high", "href", "hreflang", "kind", "label",
    "list", "loading", "loop", "low", "max", "maxlength", "media", "method",
    "min", "minlength", "multiple", "muted", "name", "novalidate", "open",
    "pattern", "placeholder", "poster", "preload", "readonly", "rel",
    "required", "reversed", "rows", "rowspan", "sandbox", "scope", "selected",
    "shape", "size", "sizes", "span", "src", "srcdoc", "srclang", "srcset",
    "start", "step", "summary", "target", "type", "usemap", "value", "width",
    "wrap", "xmlns", "viewbox",

    // Event handler attributes
    "onblur", "onchange", "onclick", "ondblclick", "onerror", "onfocus",
    "oninput", "onkeydown", "onkeypress", "onkeyup", "onload", "onmousedown",
    "onmouseenter", "onmouseleave", "onmousemove", "onmouseout",
    "onmouseover", "onmouseup", "onreset", "onresize", "onscroll",
    "onselect", "onsubmit", "onwheel",
};

/// 標準のHTML・SVG・MathML要素（カスタム要素として扱わない）
///
/// 名前は小文字で持つ（`linearGradient` は `lineargradient`）
static STANDARD_HTML_ELEMENTS: phf::Set<&'static str> = phf_set! {
    // Document / metadata
    "html", "head", "body", "base", "link", "meta", "style", "title", "script",
    "noscript", "template", "slot",

    // Sections
    "address", "article", "aside", "footer", "header", "h1", "h2", "h3", "h4", "h5",
    "h6", "hgroup", "main", "nav", "section", "search",

    // Grouping
    "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure", "hr", "li", "menu",
    "ol", "p", "pre", "ul",

    // Text-level
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "dfn", "em", "i",
    "kbd", "mark", "q", "rp", "rt", "ruby", "s", "samp", "small", "span", "strong",
    "sub", "sup", "time", "u", "var", "wbr", "del", "ins",

    // Embedded
    "area", "audio", "canvas", "embed", "iframe", "img", "map", "object", "picture",
    "portal", "source", "track", "video", "param",

    // Tables
    "caption", "col", "colgroup", "table", "tbody", "td", "tfoot", "th", "thead", "tr",

    // Forms
    "button", "datalist", "fieldset", "form", "input", "label", "legend", "meter",
    "optgroup", "option", "output", "progress", "select", "selectedcontent", "textarea",

    // Interactive
    "details", "dialog", "summary",

    // Obsolete but still parsed
    "acronym", "applet", "basefont", "big", "blink", "center", "dir", "font", "frame",
    "frameset", "marquee", "nobr", "noembed", "noframes", "plaintext", "rb", "rtc",
    "strike", "tt", "xmp", "image",

    // SVG
    "svg", "g", "defs", "symbol", "use", "switch", "foreignobject", "desc", "metadata",
    "path", "rect", "circle", "ellipse", "line", "polyline", "polygon", "text", "tspan",
    "textpath", "lineargradient", "radialgradient", "stop", "pattern", "clippath",
    "mask", "marker", "filter", "view", "animate", "animatemotion", "animatetransform",
    "set", "mpath", "fecolormatrix", "fecomposite", "feblend", "feflood",
    "fegaussianblur", "feoffset", "femerge", "femergenode", "feimage", "femorphology",
    "feturbulence", "fedisplacementmap", "fedropshadow", "fetile",
    "fecomponenttransfer", "fefunca", "fefuncb", "fefuncg", "fefuncr",
    "fediffuselighting", "fespecularlighting", "fedistantlight", "fepointlight",
    "fespotlight", "feconvolvematrix",

    // MathML
    "math", "mi", "mn", "mo", "ms", "mtext", "mrow", "mfrac", "msqrt", "mroot", "msub",
    "msup", "msubsup", "munder", "mover", "munderover", "mtable", "mtr", "mtd",
    "mspace", "mpadded", "mphantom", "menclose", "semantics", "annotation",
};

/// `data-` / `x-` 接頭辞を除いたhtml名
fn normalize_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    for prefix in ["data-", "x-"] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    lower
}

fn is_custom_element(name: &str) -> bool {
    !STANDARD_HTML_ELEMENTS.contains(name)
}

/// カスタム属性か（aria-*・標準属性・ng組み込みは除外）
fn is_custom_attribute(name: &str) -> bool {
    if name.is_empty() || name.starts_with("aria-") || name.starts_with("ng-") {
        return false;
    }
    // 属性バインディング記法などの記号を含むものは対象外
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return false;
    }
    name.contains('-') || !STANDARD_HTML_ATTRIBUTES.contains(name)
}

/// HTMLファイルからカスタム要素・属性の参照を集める
#[derive(Debug, Default)]
pub struct HtmlReferenceParser;

impl HtmlReferenceParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path, text: &str) -> Result<Vec<HtmlReference>, AnalyzerError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_html::LANGUAGE.into())
            .map_err(|e| AnalyzerError::syntax(path, e.to_string()))?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| AnalyzerError::syntax(path, "parser produced no tree"))?;

        let mut references = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if matches!(node.kind(), "start_tag" | "self_closing_tag") {
                self.collect_tag(node, text, path, &mut references);
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        Ok(references)
    }

    fn collect_tag(&self, tag: Node, text: &str, path: &Path, out: &mut Vec<HtmlReference>) {
        let mut cursor = tag.walk();
        for child in tag.named_children(&mut cursor) {
            match child.kind() {
                "tag_name" => {
                    let name = normalize_name(node_text(child, text));
                    if is_custom_element(&name) {
                        out.push(HtmlReference {
                            name,
                            kind: HtmlReferenceKind::Element,
                            path: path.to_path_buf(),
                            span: Span::of(child),
                        });
                    }
                }
                "attribute" => {
                    let Some(attr_name) = child.named_child(0).filter(|n| n.kind() == "attribute_name") else {
                        continue;
                    };
                    let name = normalize_name(node_text(attr_name, text));
                    if is_custom_attribute(&name) {
                        out.push(HtmlReference {
                            name,
                            kind: HtmlReferenceKind::Attribute,
                            path: path.to_path_buf(),
                            span: Span::of(attr_name),
                        });
                    }
                }
                _ => {}
            }
        }
    }
}

fn node_text<'a>(node: Node, text: &'a str) -> &'a str {
    text.get(node.byte_range()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Vec<(String, HtmlReferenceKind)> {
        HtmlReferenceParser::new()
            .parse(Path::new("/app/card.html"), html)
            .unwrap()
            .into_iter()
            .map(|r| (r.name, r.kind))
            .collect()
    }

    #[test]
    fn test_custom_elements_and_attributes() {
        let refs = parse(
            r#"<div class="x" my-tooltip="vm.text"><card-item value="vm.v"></card-item><br/></div>"#,
        );
        assert_eq!(
            refs,
            vec![
                ("my-tooltip".to_string(), HtmlReferenceKind::Attribute),
                ("card-item".to_string(), HtmlReferenceKind::Element),
            ]
        );
    }

    #[test]
    fn test_prefixes_are_stripped() {
        let refs = parse(r#"<data-user-card x-highlight></data-user-card>"#);
        assert_eq!(
            refs,
            vec![
                ("user-card".to_string(), HtmlReferenceKind::Element),
                ("highlight".to_string(), HtmlReferenceKind::Attribute),
            ]
        );
    }

    #[test]
    fn test_builtin_and_standard_names_are_skipped() {
        let refs = parse(r#"<input type="text" ng-model="vm.a" aria-label="a" onclick="f()">"#);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_standard_html_and_svg_elements_are_skipped() {
        let refs = parse(
            r#"<address><progress></progress><menu></menu><area><object></object></address>
<svg viewBox="0 0 10 10"><rect></rect><circle></circle><linearGradient></linearGradient></svg>
<tabs></tabs>"#,
        );
        assert_eq!(refs, vec![("tabs".to_string(), HtmlReferenceKind::Element)]);
    }
}
