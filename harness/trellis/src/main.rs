//! trellis CLI
//!
//! Runs every detected test framework across a source tree.

use trellis::commands::{parse_run_args, run_tests, EXIT_FATAL};

fn main() {
    trellis::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(EXIT_FATAL);
    }

    let command = &args[1];

    match command.as_str() {
        "run" => {
            let options = match parse_run_args(&args[2..]) {
                Ok(options) => options,
                Err(e) => {
                    eprintln!("error: {e}");
                    eprintln!();
                    print_usage();
                    std::process::exit(EXIT_FATAL);
                }
            };
            std::process::exit(run_tests(&options));
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("trellis {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(EXIT_FATAL);
        }
    }
}

fn print_usage() {
    println!("trellis: run go test and Ginkgo suites as one report");
    println!();
    println!("Usage: trellis <command> [options]");
    println!();
    println!("Commands:");
    println!("  run [paths...]       Run tests below the given directories (default: whole tree)");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Run options:");
    println!("  --root=<dir>         Source tree root (default: current directory)");
    println!("  --show-passed        Include passing tests in the report");
    println!("  --show-stdout=<when> Print captured output: never, on-failure (default), always");
    println!("  --verbosity=<n>      0 failures only, 1 sections with counts, 2 everything");
    println!("  --format=<fmt>       text (default) or json");
    println!("  --timeout=<secs>     Per-package timeout (default: 600, or TRELLIS_TIMEOUT)");
    println!("  --jobs=<n>           Packages run in parallel (default: CPU count)");
    println!("  --dry-run            Print the commands that would run");
    println!("  --sync-todos         Write failing tests to TODO.md under the root");
    println!("  -- <args...>         Pass remaining arguments to every framework command");
    println!();
    println!("Environment:");
    println!("  RUST_LOG             Enable diagnostic logging (e.g. RUST_LOG=trellis=debug)");
    println!("  TRELLIS_TIMEOUT      Default per-package timeout in seconds");
    println!();
    println!("Exit status: 0 all passed, 1 test failures, 2 usage or setup error");
    println!();
    println!("Examples:");
    println!("  trellis run");
    println!("  trellis run ./pkg/api --show-passed");
    println!("  trellis run --dry-run -- -race");
}
