use std::path::PathBuf;

use super::{components, main_path, Project, MAIN};
use crate::analyzer::component::split_binding_type;
use crate::analyzer::ComponentParser;
use crate::error::AnalyzerError;
use crate::model::Span;

// ==========================================================================
// 基本パターン: オブジェクトリテラル
// ==========================================================================

#[test]
fn test_object_literal_component() {
    let result = components(
        "angular.module('app').component('card', {controller:'CardCtrl', bindings:{value:'<'}});",
    );

    assert_eq!(result.len(), 1);
    let card = &result[0];
    assert_eq!(card.name, "card");
    assert_eq!(card.html_name, "card");
    assert_eq!(card.path, main_path());
    assert_eq!(card.span, Span::new(0, 32, 0, 38), "位置は名前リテラル");
    assert_eq!(card.bindings.len(), 1);
    assert_eq!(card.bindings[0].name, "value");
    assert_eq!(card.bindings[0].binding_type, "<");
    assert_eq!(card.bindings[0].html_name, "value");
    assert_eq!(card.link.controller_name.as_deref(), Some("CardCtrl"));
    assert_eq!(card.link.controller_class_name, None);
    assert_eq!(card.link.controller_as, "$ctrl");
    assert!(card.template.is_none());
}

#[test]
fn test_binding_name_override_and_html_name() {
    let result = components(
        r#"
angular.module('app').component('exampleComponent', {
    bindings: {
        data: '<',
        x: '=otherModel',
        onSelect: '&',
        optional: '<?',
    },
});
"#,
    );
    let component = &result[0];
    assert_eq!(component.html_name, "example-component");

    let bindings: Vec<(&str, &str, &str)> = component
        .bindings
        .iter()
        .map(|b| (b.name.as_str(), b.binding_type.as_str(), b.html_name.as_str()))
        .collect();
    assert_eq!(
        bindings,
        vec![
            ("data", "<", "data"),
            ("otherModel", "=", "other-model"),
            ("onSelect", "&", "on-select"),
            ("optional", "<?", "optional"),
        ]
    );
}

#[test]
fn test_missing_bindings_is_empty() {
    let result = components("angular.module('app').component('plain', { template: '<p></p>' });");
    assert!(result[0].bindings.is_empty());
}

#[test]
fn test_split_binding_type() {
    assert_eq!(split_binding_type("<"), ("<", None));
    assert_eq!(split_binding_type("=otherModel"), ("=", Some("otherModel")));
    assert_eq!(split_binding_type("@?title"), ("@?", Some("title")));
}

#[test]
fn test_component_name_from_constant() {
    let result = components(
        "const NAME = 'userCard';\nangular.module('app').component(NAME, { bindings: {} });",
    );
    assert_eq!(result[0].name, "userCard");
    assert_eq!(result[0].html_name, "user-card");
}

// ==========================================================================
// クラス設定
// ==========================================================================

#[test]
fn test_new_class_configuration() {
    let result = components(
        r#"
class Foo implements ng.IComponentOptions {
    controller = 'FooCtrl';
    bindings = { x: '<' };
}
angular.module('app').component('foo', new Foo());
"#,
    );
    assert_eq!(result.len(), 1);
    let foo = &result[0];
    assert_eq!(foo.name, "foo");
    assert_eq!(foo.span, Span::new(5, 32, 5, 37));
    assert_eq!(foo.bindings[0].name, "x");
    assert_eq!(foo.bindings[0].binding_type, "<");
    assert_eq!(foo.link.controller_name.as_deref(), Some("FooCtrl"));
}

#[test]
fn test_constructor_assigned_fields() {
    let result = components(
        r#"
class Foo {
    controllerAs = 'declared';
    constructor() {
        this.controller = FooController;
        this.controllerAs = 'vm';
        this.template = require('./foo.html');
    }
}
angular.module('app').component('foo', new Foo());
"#,
    );
    let foo = &result[0];
    assert_eq!(foo.link.controller_class_name.as_deref(), Some("FooController"));
    assert_eq!(foo.link.controller_as, "vm", "コンストラクタ代入が後勝ち");
    let template = foo.template.as_ref().unwrap();
    assert_eq!(template.path, PathBuf::from("/app/src/foo.html"));
    assert!(template.body.is_none());
}

// ==========================================================================
// テンプレート
// ==========================================================================

#[test]
fn test_template_url_is_joined_with_root() {
    let result = components(
        "angular.module('app').component('card', { templateUrl: '../views/card.html?v=2', template: 'ignored' });",
    );
    let template = result[0].template.as_ref().unwrap();
    assert_eq!(template.path, PathBuf::from("/app/views/card.html"));
    assert!(template.body.is_none(), "templateUrlが優先");
}

#[test]
fn test_inline_template_body() {
    let result = components(
        "angular.module('app').component('card', {\n    template: `<div>{{$ctrl.value}}</div>`\n});",
    );
    let template = result[0].template.as_ref().unwrap();
    assert_eq!(template.body.as_deref(), Some("<div>{{$ctrl.value}}</div>"));
    assert_eq!(template.path, main_path());
    assert_eq!(template.span.start_line, 1);
}

#[test]
fn test_template_through_variable_and_import() {
    let result = components(
        r#"
import listTemplate from './list.html';
const cardTemplate = require('./card.html');
angular.module('app')
    .component('card', { template: cardTemplate })
    .component('list', { template: listTemplate });
"#,
    );
    assert_eq!(
        result[0].template.as_ref().unwrap().path,
        PathBuf::from("/app/src/card.html")
    );
    assert_eq!(
        result[1].template.as_ref().unwrap().path,
        PathBuf::from("/app/src/list.html")
    );
}

#[test]
fn test_unresolvable_template_keeps_component() {
    let result = components(
        "angular.module('app').component('card', { template: buildTemplate() });",
    );
    assert_eq!(result.len(), 1);
    assert!(result[0].template.is_none());
}

#[test]
fn test_mutually_referring_template_objects_keep_component() {
    let result = components(
        "var a = { x: b.x };\nvar b = { x: a.x };\nangular.module('m').component('ok', { template: a.x });",
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].name, "ok");
    assert!(result[0].template.is_none());
}

#[test]
fn test_self_referring_static_name_is_skipped() {
    let result = components(
        "class N { static a = N.a; }\nangular.module('m').component(N.a, {});\nangular.module('m').component('ok', {});",
    );
    let names: Vec<&str> = result.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["ok"]);
}

// ==========================================================================
// コントローラー参照
// ==========================================================================

#[test]
fn test_controller_identifier_and_alias() {
    let result = components(
        r#"
class CardController {}
angular.module('app').component('card', { controller: CardController, controllerAs: 'vm' });
angular.module('app').component('list', { controller: 'ListCtrl as list' });
"#,
    );
    assert_eq!(result[0].link.controller_class_name.as_deref(), Some("CardController"));
    assert_eq!(result[0].link.controller_name, None);
    assert_eq!(result[0].link.controller_as, "vm");
    assert_eq!(result[1].link.controller_name.as_deref(), Some("ListCtrl"));
    assert_eq!(result[1].link.controller_as, "list");
}

// ==========================================================================
// import経由
// ==========================================================================

#[test]
fn test_imported_object_configuration() {
    let project = Project::new()
        .file(
            "src/card/card.component.ts",
            "export const cardComponent = {\n  bindings: { value: '<' },\n  controller: 'CardCtrl'\n};",
        )
        .file(
            MAIN,
            "import { cardComponent } from './card/card.component';\nangular.module('app').component('card', cardComponent);",
        );
    let (result, dependencies) = project
        .parse(MAIN, |u, c| ComponentParser::new().parse(u, c))
        .unwrap();

    assert_eq!(result.len(), 1);
    let card = &result[0];
    assert_eq!(card.path, PathBuf::from("/app/src/card/card.component.ts"));
    assert_eq!(card.span.start_line, 0, "定義側のオブジェクトリテラル位置");
    assert_eq!(card.bindings[0].name, "value");
    assert_eq!(card.link.controller_name.as_deref(), Some("CardCtrl"));
    assert_eq!(
        dependencies,
        vec![PathBuf::from("/app/src/card/card.component.ts")]
    );
}

#[test]
fn test_imported_class_through_reexport_and_default() {
    let project = Project::new()
        .file(
            "src/shared/user.component.ts",
            "export default class UserComponent {\n  bindings = { user: '<' };\n}",
        )
        .file(
            "src/shared/index.ts",
            "import UserComponent from './user.component';\nexport { UserComponent };",
        )
        .file(
            MAIN,
            "import { UserComponent } from './shared';\nangular.module('app').component('user', new UserComponent());",
        );
    let result = project.components(MAIN);

    assert_eq!(result.len(), 1);
    let user = &result[0];
    assert_eq!(user.path, PathBuf::from("/app/src/shared/user.component.ts"));
    assert_eq!(user.span, Span::new(0, 21, 0, 34), "定義側のクラス名位置");
    assert_eq!(user.bindings[0].name, "user");
}

#[test]
fn test_namespace_module_pattern() {
    let project = Project::new()
        .file(
            "src/details.ts",
            "export const name = 'details';\nexport const config = { bindings: { id: '@' } };",
        )
        .file(
            MAIN,
            "import * as Details from './details';\nangular.module('app').component(Details.name, Details.config);",
        );
    let result = project.components(MAIN);
    assert_eq!(result[0].name, "details");
    assert_eq!(result[0].bindings[0].binding_type, "@");
}

#[test]
fn test_import_cycle_is_a_resolution_miss() {
    let project = Project::new()
        .file("src/a.ts", "export { cfg } from './b';")
        .file("src/b.ts", "export { cfg } from './a';")
        .file(
            MAIN,
            "import { cfg } from './a';\nangular.module('app').component('loop', cfg);",
        );
    let result = project.components(MAIN);
    assert!(result.is_empty());
}

#[test]
fn test_missing_module_is_a_resolution_miss() {
    let result = components(
        "import { cfg } from './missing';\nangular.module('app').component('gone', cfg);",
    );
    assert!(result.is_empty());
}

// ==========================================================================
// サポート外
// ==========================================================================

#[test]
fn test_unsupported_configuration_fails_file() {
    let project = Project::new().file(
        MAIN,
        "angular.module('app').component('ok', {});\nangular.module('app').component('bad', makeConfig());",
    );
    let result = project.parse(MAIN, |u, c| ComponentParser::new().parse(u, c));
    match result {
        Err(AnalyzerError::UnsupportedConfiguration { kind, line, .. }) => {
            assert_eq!(kind, "component");
            assert_eq!(line, 2);
        }
        other => panic!("expected unsupported configuration, got {:?}", other.map(|r| r.0.len())),
    }
}
