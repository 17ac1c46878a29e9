//! End-to-end generation of record packages

use argen::core::error::{GeneratorError, LineMapError, Phase};
use argen::core::package::{FieldDeclaration, IndexDeclaration, RecordPackage, TriggerDeclaration};
use argen::generation::formatter;
use argen::generation::line_map::CARET;
use argen::generation::renderer::DISCLAIMER;
use argen::generation::{LinkedPackages, MetaParams, TemplateRenderer, generate, generate_meta};

const APP_INFO: &str = "argen@test (integration)";

fn account(backends: &[&str]) -> RecordPackage {
    let mut pkg = RecordPackage::new("Account", "account");
    pkg.namespace.object_name = "3".into();
    for (name, format) in [("id", "uint64"), ("email", "string"), ("active", "bool")] {
        pkg.add_field(FieldDeclaration {
            name: name.into(),
            format: format.into(),
            primary_key: name == "id",
            ..Default::default()
        });
    }
    pkg.backends = backends.iter().map(|b| b.to_string()).collect();
    pkg
}

fn banner_lines() -> usize {
    DISCLAIMER.lines().count()
}

#[test]
fn test_octopus_package_produces_one_artifact() {
    let files = generate(APP_INFO, &account(&["octopus"]), &LinkedPackages::new()).unwrap();

    assert_eq!(files.len(), 1);
    let file = &files[0];
    assert_eq!(file.backend, "octopus");
    assert_eq!(file.dir, "account");
    assert!(file.name.ends_with(".rs"));

    let text = String::from_utf8(file.data.clone()).unwrap();
    assert!(text.starts_with("// Code generated by argen. DO NOT EDIT.\n"));
    let banner: Vec<&str> = text.lines().take(banner_lines()).collect();
    assert_eq!(banner.last().copied(), Some(format!("// Generate info: {APP_INFO}").as_str()));
}

#[test]
fn test_unimplemented_backend_fails() {
    let err = generate(APP_INFO, &account(&["tarantool16"]), &LinkedPackages::new()).unwrap_err();

    match &err {
        GeneratorError::BackendNotImplemented { name, backend } => {
            assert_eq!(name, "Account");
            assert_eq!(backend, "tarantool16");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("tarantool16"));
}

#[test]
fn test_unknown_backends_fail() {
    for id in ["postgres", "Octopus", ""] {
        let err = generate(APP_INFO, &account(&[id]), &LinkedPackages::new()).unwrap_err();
        assert!(
            matches!(&err, GeneratorError::BackendUnknown { backend, .. } if backend == id),
            "identifier {id:?}: {err}"
        );
    }
}

#[test]
fn test_empty_backend_list_yields_nothing() {
    let files = generate(APP_INFO, &account(&[]), &LinkedPackages::new()).unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_duplicate_backends_are_processed_independently() {
    let files = generate(
        APP_INFO,
        &account(&["octopus", "tarantool15", "octopus"]),
        &LinkedPackages::new(),
    )
    .unwrap();

    let tags: Vec<_> = files.iter().map(|f| f.backend.as_str()).collect();
    assert_eq!(tags, vec!["octopus", "tarantool15", "octopus"]);
    assert_eq!(files[0].data, files[1].data);
}

#[test]
fn test_generation_is_deterministic() {
    let mut pkg = account(&["octopus"]);
    for name in ["Zeta", "Alpha", "Mid"] {
        pkg.trigger_map.insert(
            name.into(),
            TriggerDeclaration {
                name: name.into(),
                pkg: "crate::hooks".into(),
                func: "run".into(),
                params: Default::default(),
            },
        );
    }

    let first = generate(APP_INFO, &pkg, &LinkedPackages::new()).unwrap();
    let second = generate(APP_INFO, &pkg, &LinkedPackages::new()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[1].name, "triggers.rs");
}

#[test]
fn test_generated_output_is_already_normalized() {
    let mut pkg = account(&["octopus"]);
    pkg.indexes.push(IndexDeclaration {
        name: "email".into(),
        num: 1,
        selector: "SelectByEmail".into(),
        fields: vec![1],
        primary: false,
        unique: false,
        partial_of: None,
    });

    let files = generate(APP_INFO, &pkg, &LinkedPackages::new()).unwrap();
    for file in &files {
        assert_eq!(formatter::normalize(&file.data).unwrap(), file.data);
    }
}

#[test]
fn test_malformed_template_fails_at_parse_with_banner_offset() {
    let body = "pub struct Broken;\n{{ missing_helper(name=\"x\") }}\n";
    let diag = TemplateRenderer::default()
        .render("octopus", body, &serde_json::json!({ "app_info": APP_INFO }))
        .unwrap_err();

    assert_eq!(diag.phase, Phase::Parse);
    let snippet = diag.snippet().expect("parse failures are located");
    let lines: Vec<&str> = snippet.split('\n').collect();
    assert_eq!(lines[0], "pub struct Broken;");
    assert_eq!(lines[1], "{{ missing_helper(name=\"x\") }}");
    assert_eq!(lines[2], format!("   {CARET}"));

    let expected_line = banner_lines() + 2;
    assert!(
        diag.to_string()
            .contains(&format!("{expected_line}:4: function \"missing_helper\" is not defined")),
        "{diag}"
    );
}

#[test]
fn test_execute_failure_is_unlocated() {
    let diag = TemplateRenderer::default()
        .render("meta", "{{ namespaces | length }}", &serde_json::json!({ "app_info": "x" }))
        .unwrap_err();

    assert_eq!(diag.phase, Phase::Execute);
    assert!(matches!(diag.context, LineMapError::Unlocated { .. }));
}

#[test]
fn test_meta_lists_every_package() {
    let a = account(&["octopus"]);
    let mut b = RecordPackage::new("Session", "session");
    b.backends = vec!["tarantool15".into()];

    let file = generate_meta(&MetaParams::new(APP_INFO, [&a, &b])).unwrap();
    let text = String::from_utf8(file.data).unwrap();

    assert!(text.contains("pub mod account"));
    assert!(text.contains("#[path = \"session/octopus.rs\"]"));
    assert!(text.find("name: \"Account\"").unwrap() < text.find("name: \"Session\"").unwrap());
}
