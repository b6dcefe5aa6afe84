use std::path::{Component, Path, PathBuf};

/// ファイルがHTMLかどうか判定
pub fn is_html_file(path: &Path) -> bool {
    matches!(
        extension_lowercase(path).as_deref(),
        Some("html") | Some("htm")
    )
}

/// ファイルがTS/JSかどうか判定
pub fn is_script_file(path: &Path) -> bool {
    matches!(
        extension_lowercase(path).as_deref(),
        Some("ts") | Some("tsx") | Some("js") | Some("jsx") | Some("mjs") | Some("cjs")
    )
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// camelCaseをkebab-caseに変換
/// 例: "myDirective" -> "my-directive"
pub fn camel_to_kebab(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('-');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// テンプレートパスを正規化（クエリパラメータを除去、`../`を除去）
pub fn normalize_template_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    let mut normalized = path;
    while let Some(rest) = normalized.strip_prefix("../") {
        normalized = rest;
    }
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest;
    }
    normalized.trim_start_matches('/').to_string()
}

/// プラットフォーム差異を吸収した比較用パスキー
///
/// 区切り文字を `/` に揃え、大文字小文字を無視する
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

/// 2つのパスが同じファイルを指すか（大文字小文字・区切り文字を無視）
pub fn same_path(a: &Path, b: &Path) -> bool {
    path_key(a) == path_key(b)
}

/// ディレクトリを起点に相対パスを結合し、`.` と `..` を畳み込む
pub fn join_relative(dir: &Path, relative: &str) -> PathBuf {
    let mut result = dir.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_to_kebab() {
        assert_eq!(camel_to_kebab("myDirective"), "my-directive");
        assert_eq!(camel_to_kebab("exampleComponent"), "example-component");
        assert_eq!(camel_to_kebab("simple"), "simple");
        assert_eq!(camel_to_kebab("CompA"), "comp-a");
        assert_eq!(camel_to_kebab("ABC"), "a-b-c");
    }

    #[test]
    fn test_normalize_template_path() {
        assert_eq!(normalize_template_path("../foo/bar/baz.html"), "foo/bar/baz.html");
        assert_eq!(normalize_template_path("/foo/bar/baz.html"), "foo/bar/baz.html");
        assert_eq!(normalize_template_path("./foo/bar.html"), "foo/bar.html");
        assert_eq!(normalize_template_path("foo/bar.html?v=1"), "foo/bar.html");
    }

    #[test]
    fn test_path_key_ignores_case_and_separator() {
        assert_eq!(path_key(Path::new("C:\\App\\Foo.ts")), "c:/app/foo.ts");
        assert!(same_path(Path::new("/src/Foo.ts"), Path::new("/src/foo.ts")));
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(
            join_relative(Path::new("/app/src/cards"), "./card.html"),
            PathBuf::from("/app/src/cards/card.html")
        );
        assert_eq!(
            join_relative(Path::new("/app/src/cards"), "../shared/index"),
            PathBuf::from("/app/src/shared/index")
        );
    }
}
