// tests/macro_expansion.rs

use proptest::prelude::*;

use soapci::errors::SoapCiError;
use soapci::macros::{expand, MacroContext, MacroLayer, MAX_SUBSTITUTIONS};

fn ctx(pairs: &[(&str, &str)]) -> MacroContext {
    MacroContext::builder()
        .define_all(
            MacroLayer::Global,
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .build()
        .unwrap()
}

#[test]
fn expands_two_placeholders() {
    let names = ctx(&[("a", "x"), ("b", "y")]);
    assert_eq!(expand("${a}-${b}", &names).unwrap(), "x-y");
}

#[test]
fn expands_transitively() {
    let names = ctx(&[("root", "/srv"), ("bin", "${root}/bin"), ("tool", "${bin}/make")]);
    assert_eq!(expand("run ${tool} -j2", &names).unwrap(), "run /srv/bin/make -j2");
}

#[test]
fn repeated_placeholder_is_replaced_everywhere() {
    let names = ctx(&[("d", "out")]);
    assert_eq!(expand("${d}/a ${d}/b", &names).unwrap(), "out/a out/b");
}

#[test]
fn undefined_name_is_reported_exactly() {
    let names = ctx(&[("a", "x")]);

    match expand("echo ${a} ${missing_one}", &names) {
        Err(SoapCiError::UndefinedMacro {
            name,
            template,
            known,
        }) => {
            assert_eq!(name, "missing_one");
            assert_eq!(template, "echo ${a} ${missing_one}");
            assert_eq!(known, vec!["a".to_string()]);
        }
        other => panic!("expected UndefinedMacro, got {other:?}"),
    }
}

#[test]
fn undefined_name_inside_a_value_is_reported() {
    let names = ctx(&[("a", "${nope}")]);
    let err = expand("${a}", &names).unwrap_err();
    assert!(matches!(err, SoapCiError::UndefinedMacro { ref name, .. } if name == "nope"));
}

#[test]
fn non_identifier_braces_are_left_alone() {
    let names = ctx(&[]);
    assert_eq!(expand("echo ${not valid} $HOME {x}", &names).unwrap(), "echo ${not valid} $HOME {x}");
}

#[test]
fn cyclic_definitions_are_rejected_at_build_time() {
    let result = MacroContext::builder()
        .define(MacroLayer::Global, "a", "${b}")
        .define(MacroLayer::Repository, "b", "${c}")
        .define(MacroLayer::Branch, "c", "${a}")
        .build();

    match result {
        Err(SoapCiError::CyclicMacro(msg)) => assert!(msg.contains("cycle")),
        other => panic!("expected CyclicMacro, got {other:?}"),
    }
}

#[test]
fn self_reference_is_a_cycle() {
    let result = MacroContext::builder()
        .define(MacroLayer::Global, "path", "${path}:/usr/bin")
        .build();
    assert!(matches!(result, Err(SoapCiError::CyclicMacro(_))));
}

#[test]
fn shadowed_definition_does_not_form_a_cycle() {
    // The global `a` would loop through `b`, but the branch layer replaces it.
    let names = MacroContext::builder()
        .define(MacroLayer::Global, "a", "${b}")
        .define(MacroLayer::Global, "b", "${a}")
        .define(MacroLayer::Branch, "a", "fixed")
        .build()
        .unwrap();

    assert_eq!(expand("${b}", &names).unwrap(), "fixed");
}

#[test]
fn spliced_placeholders_hit_the_substitution_limit() {
    // Neither value references the other as a whole placeholder, so the
    // context builds, but `${a}}` rewrites to itself after two steps.
    let names = ctx(&[("a", "${b"), ("b", "${a}}")]);

    match expand("${a}}", &names) {
        Err(SoapCiError::ExpansionLimitExceeded { limit, .. }) => {
            assert_eq!(limit, MAX_SUBSTITUTIONS)
        }
        other => panic!("expected ExpansionLimitExceeded, got {other:?}"),
    }
}

#[test]
fn later_layers_shadow_earlier_ones() {
    let names = MacroContext::builder()
        .define(MacroLayer::Reserved, "__repo_name__", "widget")
        .define(MacroLayer::Branch, "flavor", "branch")
        .define(MacroLayer::Global, "flavor", "global")
        .define(MacroLayer::Repository, "flavor", "repo")
        .define(MacroLayer::Global, "only_global", "g")
        .define(MacroLayer::Branch, "__repo_name__", "spoofed")
        .build()
        .unwrap();

    assert_eq!(names.get("flavor"), Some("branch"));
    assert_eq!(names.get("only_global"), Some("g"));
    assert_eq!(names.get("__repo_name__"), Some("widget"));
    assert_eq!(names.len(), 3);
}

proptest! {
    #[test]
    fn template_without_placeholders_is_unchanged(t in "[^$]*") {
        let names = ctx(&[("a", "x")]);
        prop_assert_eq!(expand(&t, &names).unwrap(), t);
    }

    #[test]
    fn dollar_without_brace_is_unchanged(t in "[a-z $}]*") {
        let names = ctx(&[]);
        prop_assert_eq!(expand(&t, &names).unwrap(), t);
    }
}
