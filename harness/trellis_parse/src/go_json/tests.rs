use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use trellis_locate::LocationIndex;
use trellis_model::{Framework, Test, TestLocation};

use super::*;
use crate::ResultParser;

fn parse(input: &str) -> Vec<Test> {
    GoTestParser::without_locations()
        .parse(input.as_bytes())
        .unwrap()
}

fn names(tests: &[Test]) -> Vec<&str> {
    tests.iter().map(|t| t.name.as_str()).collect()
}

#[test]
fn test_single_passing_test() {
    let tests = parse(concat!(
        r#"{"Action":"run","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"pass","Package":"pkg","Test":"TestA","Elapsed":0.1}"#,
        "\n",
    ));

    assert_eq!(tests.len(), 1);
    let test = &tests[0];
    assert_eq!(test.name, "TestA");
    assert_eq!(test.package, "pkg");
    assert_eq!(test.framework, Framework::GoTest);
    assert!(test.passed && !test.failed && !test.skipped);
    assert_eq!(test.duration, Duration::from_millis(100));
}

#[test]
fn test_build_failure_collects_output() {
    let tests = parse(concat!(
        r##"{"ImportPath":"pkg","Action":"build-output","Output":"# pkg\n"}"##,
        "\n",
        r#"{"ImportPath":"pkg","Action":"build-output","Output":"./a.go:3:1: undefined: x\n"}"#,
        "\n",
        r#"{"ImportPath":"pkg","Action":"build-fail"}"#,
        "\n",
        r#"{"Action":"fail","Package":"pkg","Elapsed":0,"FailedBuild":"pkg"}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec![BUILD_FAILED]);
    assert!(tests[0].failed);
    assert_eq!(tests[0].message, "# pkg\n./a.go:3:1: undefined: x\n");
    assert_eq!(tests[0].package, "pkg");
}

#[test]
fn test_build_failure_reported_only_on_package_event() {
    let tests = parse(concat!(
        r#"{"Action":"output","Package":"pkg","Output":"cannot compile\n"}"#,
        "\n",
        r#"{"Action":"fail","Package":"pkg","FailedBuild":"pkg"}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec![BUILD_FAILED]);
    assert_eq!(tests[0].message, "cannot compile\n");
}

#[test]
fn test_build_output_of_successful_build_is_not_a_failure() {
    let tests = parse(concat!(
        r##"{"ImportPath":"example.com/c","Action":"build-output","Output":"# example.com/c\n"}"##,
        "\n",
        r#"{"ImportPath":"example.com/c","Action":"build-output","Output":"cgo-gcc-prolog: warning: unused variable\n"}"#,
        "\n",
        r#"{"Action":"run","Package":"example.com/c","Test":"TestOk"}"#,
        "\n",
        r#"{"Action":"pass","Package":"example.com/c","Test":"TestOk","Elapsed":0.01}"#,
        "\n",
        r#"{"Action":"pass","Package":"example.com/c","Elapsed":0.02}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec!["TestOk"]);
    assert!(tests[0].passed);
}

#[test]
fn test_build_output_without_tests_or_build_fail_is_dropped() {
    let tests = parse(concat!(
        r#"{"ImportPath":"pkg","Action":"build-output","Output":"note: inlining call\n"}"#,
        "\n",
    ));

    assert!(tests.is_empty());
}

#[test]
fn test_package_without_test_files() {
    let tests = parse(concat!(
        r#"{"Action":"start","Package":"pkg/empty"}"#,
        "\n",
        r#"{"Action":"output","Package":"pkg/empty","Output":"?   \tpkg/empty\t[no test files]\n"}"#,
        "\n",
        r#"{"Action":"skip","Package":"pkg/empty","Elapsed":0}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec![NO_TEST_FILES]);
    assert!(tests[0].skipped);
    assert_eq!(tests[0].message, "?   \tpkg/empty\t[no test files]");
}

#[test]
fn test_package_skip_after_tests_is_ignored() {
    let tests = parse(concat!(
        r#"{"Action":"run","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"skip","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"skip","Package":"pkg"}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec!["TestA"]);
}

#[test]
fn test_package_failure_without_failing_test() {
    let tests = parse(concat!(
        r#"{"Action":"run","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"pass","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"output","Package":"pkg","Output":"panic: init failed\n"}"#,
        "\n",
        r#"{"Action":"fail","Package":"pkg","Elapsed":0.5}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec!["TestA", PACKAGE_FAILED]);
    assert!(tests[1].failed);
    assert_eq!(tests[1].message, "panic: init failed");
    assert_eq!(tests[1].duration, Duration::from_millis(500));
}

#[test]
fn test_package_failure_with_failing_test_adds_nothing() {
    let tests = parse(concat!(
        r#"{"Action":"run","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"fail","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"output","Package":"pkg","Output":"FAIL\n"}"#,
        "\n",
        r#"{"Action":"fail","Package":"pkg"}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec!["TestA"]);
}

#[test]
fn test_failure_message_excludes_banners() {
    let tests = parse(concat!(
        r#"{"Action":"run","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"output","Package":"pkg","Test":"TestA","Output":"=== RUN   TestA\n"}"#,
        "\n",
        r#"{"Action":"output","Package":"pkg","Test":"TestA","Output":"    a_test.go:9: boom\n"}"#,
        "\n",
        r#"{"Action":"output","Package":"pkg","Test":"TestA","Output":"--- FAIL: TestA (0.00s)\n"}"#,
        "\n",
        r#"{"Action":"fail","Package":"pkg","Test":"TestA","Elapsed":0}"#,
        "\n",
    ));

    assert_eq!(tests[0].message, "    a_test.go:9: boom");
    assert_eq!(tests[0].stdout, "    a_test.go:9: boom\n");
    assert_eq!(tests[0].duration, Duration::ZERO);
}

#[test]
fn test_is_banner_line() {
    assert!(is_banner_line("=== RUN   TestA\n"));
    assert!(is_banner_line("    --- PASS: TestA/sub (0.00s)\n"));
    assert!(is_banner_line("=== NAME  TestA\n"));
    assert!(!is_banner_line("ok  \tpkg\t0.01s\n"));
    assert!(!is_banner_line("    a_test.go:9: boom\n"));
}

#[test]
fn test_subtests_carry_suite_chain() {
    let tests = parse(concat!(
        r#"{"Action":"run","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"run","Package":"pkg","Test":"TestA/group/case"}"#,
        "\n",
        r#"{"Action":"pass","Package":"pkg","Test":"TestA/group/case"}"#,
        "\n",
        r#"{"Action":"pass","Package":"pkg","Test":"TestA"}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec!["TestA", "TestA/group/case"]);
    assert!(tests[0].suite.is_empty());
    assert_eq!(tests[1].suite, vec!["TestA".to_string(), "group".to_string()]);
}

#[test]
fn test_locations_fall_back_to_parent_function() {
    let mut index = LocationIndex::new();
    index.insert("pkg/api", "TestServe", TestLocation::new("pkg/api/serve_test.go", 12));
    let parser = GoTestParser::new(Arc::new(index), "./pkg/api");

    let tests = parser
        .parse(
            concat!(
                r#"{"Action":"run","Package":"example.com/pkg/api","Test":"TestServe/tls"}"#,
                "\n",
                r#"{"Action":"pass","Package":"example.com/pkg/api","Test":"TestServe/tls"}"#,
                "\n",
            )
            .as_bytes(),
        )
        .unwrap();

    assert_eq!(tests[0].file, "pkg/api/serve_test.go");
    assert_eq!(tests[0].line, 12);
}

#[test]
fn test_bootstrap_entry_points_are_dropped() {
    let mut index = LocationIndex::new();
    index.insert(".", "TestSuite", TestLocation::new("suite_test.go", 9).bootstrap());
    let parser = GoTestParser::new(Arc::new(index), ".");

    let tests = parser
        .parse(
            concat!(
                r#"{"Action":"run","Package":"pkg","Test":"TestSuite"}"#,
                "\n",
                r#"{"Action":"fail","Package":"pkg","Test":"TestSuite"}"#,
                "\n",
                r#"{"Action":"run","Package":"pkg","Test":"TestOther"}"#,
                "\n",
                r#"{"Action":"pass","Package":"pkg","Test":"TestOther"}"#,
                "\n",
            )
            .as_bytes(),
        )
        .unwrap();

    assert_eq!(names(&tests), vec!["TestOther"]);
}

#[test]
fn test_malformed_and_plain_lines_are_skipped() {
    let tests = parse(concat!(
        "go: downloading example.com/dep v1.0.0\n",
        "{\"Action\":\"run\",\"Package\":\"pkg\",\"Test\":\"TestA\"\n",
        "\n",
        r#"{"Action":"run","Package":"pkg","Test":"TestB"}"#,
        "\n",
        r#"{"Action":"pass","Package":"pkg","Test":"TestB"}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec!["TestB"]);
}

#[test]
fn test_unknown_actions_are_ignored() {
    let tests = parse(concat!(
        r#"{"Action":"attr","Package":"pkg","Test":"TestA","Key":"k"}"#,
        "\n",
        r#"{"Action":"pass","Package":"pkg","Test":"TestA"}"#,
        "\n",
    ));

    assert_eq!(names(&tests), vec!["TestA"]);
    assert!(tests[0].passed);
}

#[test]
fn test_unfinished_test_is_reported_failed() {
    let tests = parse(concat!(
        r#"{"Action":"run","Package":"pkg","Test":"TestHang"}"#,
        "\n",
        r#"{"Action":"output","Package":"pkg","Test":"TestHang","Output":"waiting\n"}"#,
        "\n",
    ));

    assert_eq!(tests.len(), 1);
    assert!(tests[0].failed);
    assert_eq!(tests[0].message, format!("waiting\n{NO_RESULT}"));
}

#[test]
fn test_progress_sees_terminal_states_in_order() {
    let parser = GoTestParser::without_locations();
    let input = concat!(
        r#"{"Action":"run","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"run","Package":"pkg","Test":"TestB"}"#,
        "\n",
        r#"{"Action":"fail","Package":"pkg","Test":"TestB"}"#,
        "\n",
        r#"{"Action":"pass","Package":"pkg","Test":"TestA"}"#,
        "\n",
    );

    let mut seen = Vec::new();
    let mut sunk = Vec::new();
    let mut reader = input.as_bytes();
    let counts = parser
        .parse_stream(
            &mut reader,
            &mut |test: Test| sunk.push(test.name),
            &mut |test: &Test| seen.push((test.name.clone(), test.failed)),
        )
        .unwrap();

    assert_eq!(
        seen,
        vec![("TestB".to_string(), true), ("TestA".to_string(), false)]
    );
    assert_eq!(sunk, vec!["TestA".to_string(), "TestB".to_string()]);
    assert_eq!(counts, StreamCounts { passed: 1, failed: 1 });
}

#[test]
fn test_every_leaf_has_exactly_one_state() {
    let tests = parse(concat!(
        r#"{"Action":"run","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"fail","Package":"pkg","Test":"TestA"}"#,
        "\n",
        r#"{"Action":"run","Package":"pkg","Test":"TestB"}"#,
        "\n",
        r#"{"Action":"skip","Package":"pkg","Test":"TestB"}"#,
        "\n",
        r#"{"Action":"run","Package":"pkg","Test":"TestC"}"#,
        "\n",
    ));

    assert!(tests.iter().all(Test::state_is_consistent));
}
