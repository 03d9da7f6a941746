//! Shared fixtures for integration tests
//!
//! The fake debugger is a `/bin/sh` script that speaks just enough of a
//! prompt-driven protocol:
//!
//! - prints `(gdb) ` whenever it is ready
//! - `sleep N` sleeps (interruptible by SIGINT) and then prints `slept N`
//! - `fail X` writes `error: X` to stderr
//! - `crash` exits with status 3, `quit` exits cleanly
//! - `page` prints a pager prompt and waits for a newline
//! - `later N` prints the prompt at once and `async notice` N seconds later
//! - `lines N` prints N numbered rows
//! - `nonl` prints `foo` with no newline before the prompt
//! - anything else is echoed back as `echo: <line>`

#![allow(dead_code)]

use std::time::Duration;

use kodegen_gdb::{DebuggerOptions, DebuggerOptionsBuilder};

pub const FAKE_GDB: &str = r#"trap 'echo interrupted' INT
printf '(gdb) '
while IFS= read -r line; do
  case "$line" in
    quit) exit 0 ;;
    crash) exit 3 ;;
    "sleep "*) sleep "${line#sleep }" & wait $!; echo "slept ${line#sleep }" ;;
    "fail "*) echo "error: ${line#fail }" >&2 ;;
    page) printf 'line 1\n--Type <RET> for more, q to quit, c to continue without paging--'; IFS= read -r _; echo 'line 2' ;;
    "later "*) (sleep "${line#later }"; echo "async notice") & ;;
    nonl) printf 'foo' ;;
    "lines "*) i=0; while [ "$i" -lt "${line#lines }" ]; do echo "row $i"; i=$((i+1)); done ;;
    *) echo "echo: $line" ;;
  esac
  printf '(gdb) '
done"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Options driving the fake debugger
pub fn fake_builder() -> DebuggerOptionsBuilder {
    fake_builder_with(FAKE_GDB)
}

/// Options running an arbitrary shell script as the debugger
pub fn fake_builder_with(script: &str) -> DebuggerOptionsBuilder {
    DebuggerOptions::builder()
        .debugger_path("/bin/sh")
        .debugger_args(["-c", script])
        .error_patterns(["^error:"])
        .startup_timeout(Duration::from_secs(5))
        .command_timeout(Duration::from_secs(10))
}

pub fn fake_options() -> DebuggerOptions {
    fake_builder().build()
}
