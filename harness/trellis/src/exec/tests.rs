#![cfg(unix)]

use std::io::BufRead;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh", std::env::temp_dir()).args(["-c", script])
}

const TIMEOUT: Duration = Duration::from_secs(30);

#[test]
fn test_captures_output_and_exit_code() {
    let (execution, ()) = execute(&sh("printf 'out\\n'; printf 'err\\n' >&2; exit 3"), TIMEOUT, |_| ())
        .unwrap();

    assert_eq!(execution.stdout, "out\n");
    assert_eq!(execution.stderr, "err\n");
    assert_eq!(execution.exit_code, Some(3));
    assert!(!execution.timed_out);
    assert!(!execution.success());
    assert_eq!(execution.reported_exit_code(), 3);
}

#[test]
fn test_consumer_reads_lines_and_capture_keeps_everything() {
    let (execution, first) = execute(&sh("printf 'one\\ntwo\\nthree\\n'"), TIMEOUT, |reader| {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        line
    })
    .unwrap();

    assert_eq!(first, "one\n");
    assert_eq!(execution.stdout, "one\ntwo\nthree\n");
    assert!(execution.success());
}

#[test]
fn test_consumer_sees_every_line() {
    let (_, lines) = execute(&sh("for i in 1 2 3; do echo line$i; done"), TIMEOUT, |reader| {
        reader.lines().map(Result::unwrap).collect::<Vec<_>>()
    })
    .unwrap();

    assert_eq!(lines, vec!["line1", "line2", "line3"]);
}

#[test]
fn test_timeout_kills_the_process() {
    let (execution, ()) =
        execute(&sh("exec sleep 30"), Duration::from_millis(200), |_| ()).unwrap();

    assert!(execution.timed_out);
    assert!(!execution.success());
    assert_eq!(execution.reported_exit_code(), -1);
    assert!(execution.elapsed < Duration::from_secs(20));
}

#[test]
fn test_timeout_kills_background_children_holding_the_pipes() {
    let script = "sleep 30 & echo started; sleep 30";
    let (execution, first) = execute(&sh(script), Duration::from_millis(500), |reader| {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        line
    })
    .unwrap();

    assert_eq!(first, "started\n");
    assert!(execution.timed_out);
    assert!(execution.elapsed < Duration::from_secs(10));
}

#[test]
fn test_missing_program_fails_to_spawn() {
    let spec = CommandSpec::new("trellis-no-such-program", std::env::temp_dir());
    assert!(execute(&spec, TIMEOUT, |_| ()).is_err());
}
