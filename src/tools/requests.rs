//! MCP tool request types
//!
//! These structs define the parameters for each tool exposed by the server.

use rmcp::schemars::JsonSchema;
use serde::Deserialize;

/// Parameters for `gdb_start`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StartRequest {
    #[schemars(description = "Debugger executable (default: gdb on PATH or KODEGEN_GDB_PATH)")]
    pub gdb_path: Option<String>,
    #[schemars(description = "Working directory for the debugger process (default: server cwd)")]
    pub working_dir: Option<String>,
    #[schemars(description = "Debugger arguments, replacing the defaults (--quiet --nx plus pagination/confirm off)")]
    pub args: Option<Vec<String>>,
}

/// Parameters naming a single session (`gdb_terminate`, `gdb_interrupt`)
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
}

/// Parameters for `gdb_list_sessions`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListSessionsRequest {
    #[schemars(description = "Also list recently terminated or crashed sessions (default: false)")]
    pub include_ended: Option<bool>,
}

/// Parameters for execution control without arguments (`gdb_continue`, `gdb_finish`)
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Seconds to wait for the command to finish (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_load`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Path of the program to debug")]
    pub program: String,
    #[schemars(description = "Arguments passed to the program when it is run")]
    pub arguments: Option<Vec<String>>,
    #[schemars(description = "Seconds to wait for each command (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_attach`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AttachRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Process id to attach to")]
    pub pid: u32,
    #[schemars(description = "Seconds to wait for the attach (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_load_core`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadCoreRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Program that produced the core dump (loaded first when given)")]
    pub program: Option<String>,
    #[schemars(description = "Path of the core dump")]
    pub core_path: String,
    #[schemars(description = "Seconds to wait for each command (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_step` and `gdb_next`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StepRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Step by machine instruction instead of source line (default: false)")]
    pub instructions: Option<bool>,
    #[schemars(description = "Seconds to wait for the step (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_set_breakpoint`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BreakpointRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Location: function, file:line, or *address")]
    pub location: String,
    #[schemars(description = "Condition expression; the breakpoint only stops when it is true")]
    pub condition: Option<String>,
    #[schemars(description = "Seconds to wait (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_backtrace`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BacktraceRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Include local variables of each frame (default: false)")]
    pub full: Option<bool>,
    #[schemars(description = "Maximum number of frames")]
    pub limit: Option<u32>,
    #[schemars(description = "Seconds to wait (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_print`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PrintRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Expression to evaluate")]
    pub expression: String,
    #[schemars(description = "Seconds to wait (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_examine`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExamineRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Address expression, e.g. $sp or &buf")]
    #[serde(alias = "address")]
    pub expression: String,
    #[schemars(description = "Number of units to display")]
    pub count: Option<u32>,
    #[schemars(description = "Format and unit letters, e.g. x, xg, s, i")]
    pub format: Option<String>,
    #[schemars(description = "Seconds to wait (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_info_registers`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RegistersRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Single register to show (default: all general registers)")]
    pub register: Option<String>,
    #[schemars(description = "Seconds to wait (default: 30)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `gdb_command`
///
/// The command must be a single line.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CommandRequest {
    #[schemars(description = "Session id returned by gdb_start")]
    pub session_id: String,
    #[schemars(description = "Debugger command line, sent verbatim")]
    pub command: String,
    #[schemars(description = "Seconds to wait (default: 30)")]
    pub timeout_secs: Option<u64>,
}
