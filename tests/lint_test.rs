//! End-to-end lint runs through the public API.

use std::path::Path;

use yamllint::config::LintConfig;
use yamllint::linter::{run, Level};
use yamllint::rules::RuleRegistry;

fn conf_from(yaml: &str) -> LintConfig {
    LintConfig::new_from_yaml(yaml, RuleRegistry::with_builtins()).unwrap()
}

fn default_conf() -> LintConfig {
    LintConfig::with_all_defaults(RuleRegistry::with_builtins())
}

#[test]
fn clean_file_has_no_problems() {
    let buffer = "---\n# deployment settings\nreplicas: 3\nimage:\n  name: app\n  tag: latest\n";
    assert_eq!(run(buffer, &default_conf(), None), vec![]);
}

#[test]
fn trailing_spaces_reported_with_rule_and_position() {
    let problems = run("key: value  \n", &default_conf(), None);
    assert_eq!(problems.len(), 1);
    assert_eq!((problems[0].line, problems[0].column), (1, 11));
    assert_eq!(problems[0].rule, Some("trailing-spaces"));
    assert_eq!(problems[0].message(), "trailing spaces (trailing-spaces)");
}

#[test]
fn indentation_rule_honours_configured_spaces() {
    let conf = conf_from("rules:\n  indentation:\n    spaces: 2\n");
    let problems = run("object:\n   nested: 1\n", &conf, None);
    assert_eq!(problems.len(), 1);
    assert_eq!((problems[0].line, problems[0].column), (2, 4));
    assert_eq!(
        problems[0].message(),
        "wrong indentation: expected 2 but found 3 (indentation)"
    );
}

#[test]
fn key_duplicates_found_in_nested_mappings() {
    let buffer = "top:\n  a: 1\n  b: 2\n  a: 3\n";
    let problems = run(buffer, &default_conf(), None);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].rule, Some("key-duplicates"));
    assert_eq!((problems[0].line, problems[0].column), (4, 3));
}

#[test]
fn comment_rules_fire_on_malformed_comments() {
    let problems = run("#bad comment\nkey: value\n", &default_conf(), None);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].rule, Some("comments"));
    assert_eq!(
        problems[0].desc,
        "missing starting space in comment"
    );
}

#[test]
fn problems_from_different_rules_come_out_in_position_order() {
    let buffer = "a: 1  \nb:\n  c: 2\n  c: 3  \n";
    let problems = run(buffer, &default_conf(), None);
    assert!(problems.len() >= 3);
    let positions: Vec<_> = problems.iter().map(|p| (p.line, p.column)).collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
}

#[test]
fn warning_level_is_carried_through() {
    let conf = conf_from("rules:\n  trailing-spaces:\n    level: warning\n");
    let problems = run("key: value \n", &conf, None);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].level, Some(Level::Warning));
}

#[test]
fn disabled_rules_do_not_run() {
    let conf = conf_from("rules:\n  trailing-spaces: disable\n  key-duplicates: enable\n");
    let problems = run("a: 1  \na: 2\n", &conf, None);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].rule, Some("key-duplicates"));
}

#[test]
fn no_rules_enabled_still_reports_syntax_errors() {
    let conf = LintConfig::new(RuleRegistry::with_builtins());
    assert_eq!(run("key: value  \n", &conf, None), vec![]);

    let problems = run("key: [\n", &conf, None);
    assert_eq!(problems.len(), 1);
    assert!(problems[0].rule.is_none());
    assert_eq!(problems[0].level, Some(Level::Error));
    assert!(problems[0].message().starts_with("syntax error:"));
}

#[test]
fn disable_directive_scopes_to_the_enable() {
    let buffer = "\
a: 1  \n\
# yamllint disable rule:trailing-spaces\n\
b: 2  \n\
c: 3  \n\
# yamllint enable rule:trailing-spaces\n\
d: 4  \n";
    let problems = run(buffer, &default_conf(), None);
    let lines: Vec<_> = problems.iter().map(|p| p.line).collect();
    assert_eq!(lines, vec![1, 6]);
}

#[test]
fn bare_disable_covers_every_rule_until_the_end() {
    let buffer = "# yamllint disable\na: 1  \na: 2\n#bad\n";
    assert_eq!(run(buffer, &default_conf(), None), vec![]);
}

#[test]
fn disable_line_directive_inline_and_next_line() {
    // Inline form: suppresses its own line only. Duplicates are reported
    // at the second occurrence, so the directive goes there.
    let buffer = "a: 1\na: 2  # yamllint disable-line rule:key-duplicates\n";
    assert_eq!(run(buffer, &default_conf(), None), vec![]);

    let buffer = "a: 1\na: 2\n";
    let problems = run(buffer, &default_conf(), None);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].line, 2);

    // Full-line form: suppresses the next line only.
    let buffer = "# yamllint disable-line rule:trailing-spaces\na: 1  \nb: 2  \n";
    let problems = run(buffer, &default_conf(), None);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].line, 3);
}

#[test]
fn disable_file_directive_short_circuits() {
    let buffer = "# yamllint disable-file\na: 1  \na: 2\nbroken: [\n";
    assert_eq!(run(buffer, &default_conf(), None), vec![]);
}

#[test]
fn directives_never_suppress_syntax_errors() {
    let buffer = "# yamllint disable\nkey: [\n";
    let problems = run(buffer, &default_conf(), None);
    assert_eq!(problems.len(), 1);
    assert!(problems[0].rule.is_none());
}

#[test]
fn ignored_file_is_skipped_entirely() {
    let conf = conf_from("rules:\n  trailing-spaces: enable\nignore: |\n  generated/*\n");
    let buffer = "a: 1  \n";
    assert_eq!(
        run(buffer, &conf, Some(Path::new("generated/out.yaml"))),
        vec![]
    );
    assert_eq!(
        run(buffer, &conf, Some(Path::new("src/app.yaml"))).len(),
        1
    );
}

#[test]
fn per_rule_ignore_only_silences_that_rule() {
    let conf = conf_from(
        "rules:\n  trailing-spaces:\n    ignore: |\n      fixtures/*\n  key-duplicates: enable\n",
    );
    let buffer = "a: 1  \na: 2\n";
    let problems = run(buffer, &conf, Some(Path::new("fixtures/f.yaml")));
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].rule, Some("key-duplicates"));

    let problems = run(buffer, &conf, Some(Path::new("other/f.yaml")));
    assert_eq!(problems.len(), 2);
}

#[test]
fn linting_is_deterministic() {
    let buffer = "a: 1  \nb:\n   c: 2\nd: 3\t\n";
    let first = run(buffer, &default_conf(), None);
    let second = run(buffer, &default_conf(), None);
    assert_eq!(first, second);
}

#[test]
fn multi_document_streams_are_supported() {
    let buffer = "---\na: 1\n---\na: 1  \n";
    let problems = run(buffer, &default_conf(), None);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].line, 4);
    assert_eq!(problems[0].rule, Some("trailing-spaces"));
}

#[test]
fn flow_and_block_styles_mix() {
    let buffer = "server:\n  ports: [80, 443]\n  env: {DEBUG: 'false'}\n";
    assert_eq!(run(buffer, &default_conf(), None), vec![]);
}

#[test]
fn run_bytes_reports_decode_failures() {
    let conf = default_conf();
    let err = yamllint::linter::run_bytes(
        b"key: \xff\xfe\n",
        &yamllint::decoder::Utf8Decoder,
        &conf,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, yamllint::YamllintError::Decode { .. }));
}
