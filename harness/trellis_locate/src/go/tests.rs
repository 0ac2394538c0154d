use super::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const PLAIN_TESTS: &str = r#"package api

import "testing"

func helper() int { return 1 }

func TestServe(t *testing.T) {
	if helper() != 1 {
		t.Fatal("bad")
	}
}

func TestMain(m *testing.M) {}

func Testlowercase(t *testing.T) {}

func Test_underscore(t *testing.T) {}

func Test(t *testing.T) {}
"#;

const GINKGO_SUITE: &str = r#"package api_test

import (
	"testing"

	. "github.com/onsi/ginkgo/v2"
	. "github.com/onsi/gomega"
)

func TestAPI(t *testing.T) {
	RegisterFailHandler(Fail)
	RunSpecs(t, "API Suite")
}

func TestQualified(t *testing.T) {
	if true {
		ginkgo.RunSpecs(t, "Qualified")
	}
}
"#;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn test_naming_convention() {
    assert!(is_test_entry("TestServe"));
    assert!(is_test_entry("Test"));
    assert!(is_test_entry("Test_underscore"));
    assert!(is_test_entry("Test1"));
    assert!(!is_test_entry("Testlowercase"));
    assert!(!is_test_entry("TestMain"));
    assert!(!is_test_entry("BenchmarkServe"));
    assert!(!is_test_entry("helper"));
}

#[test]
fn test_indexes_test_functions_with_lines() {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("api");
    fs::create_dir(&pkg).unwrap();
    write(&pkg, "serve_test.go", PLAIN_TESTS);

    let index = GoResolver::new().resolve(dir.path(), dir.path());
    let entries: Vec<(&str, u32)> = index
        .entries("api")
        .into_iter()
        .map(|(name, loc)| (name, loc.line))
        .collect();
    assert_eq!(entries, vec![("Test", 19), ("TestServe", 7), ("Test_underscore", 17)]);

    let serve = index.get("./api", "TestServe").unwrap();
    assert_eq!(serve.file, "api/serve_test.go");
    assert!(!serve.is_bootstrap);
}

#[test]
fn test_flags_bootstrap_functions() {
    let dir = tempdir().unwrap();
    write(dir.path(), "suite_test.go", GINKGO_SUITE);

    let index = GoResolver::new().resolve_package(dir.path(), dir.path());
    assert!(index.is_bootstrap(".", "TestAPI"));
    assert!(index.is_bootstrap(".", "TestQualified"));
    assert!(!index.has_runnable_tests("."));
}

#[test]
fn test_syntax_errors_do_not_lose_other_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "broken_test.go", "package x\nfunc TestBroken(t *testing.T) {\n");
    write(dir.path(), "ok_test.go", PLAIN_TESTS);

    let index = GoResolver::new().resolve_package(dir.path(), dir.path());
    assert!(index.get(".", "TestServe").is_some());
}

#[test]
fn test_resolve_package_is_not_recursive() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    write(&nested, "serve_test.go", PLAIN_TESTS);

    let shallow = GoResolver::new().resolve_package(dir.path(), dir.path());
    assert!(shallow.is_empty());

    let deep = GoResolver::new().resolve(dir.path(), dir.path());
    assert!(deep.has_runnable_tests("nested"));
}
