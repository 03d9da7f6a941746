//! MCP server exposing debugger sessions as tools

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::manager::{SessionRegistry, StartSessionRequest};
use crate::types::command::DebuggerCommand;
use crate::types::envelope::ToolEnvelope;
use crate::types::identifiers::SessionId;

use super::dispatch::{envelope_result, failure};
use super::requests::{
    AttachRequest, BacktraceRequest, BreakpointRequest, CommandRequest, ExamineRequest,
    ExecRequest, ListSessionsRequest, LoadCoreRequest, LoadRequest, PrintRequest,
    RegistersRequest, SessionRequest, StartRequest, StepRequest,
};

const INSTRUCTIONS: &str = "GDB sessions as tools. \
    \n1. gdb_start: spawn a debugger; returns session_id \
    \n2. gdb_load / gdb_attach / gdb_load_core: choose a target \
    \n3. gdb_set_breakpoint, gdb_continue, gdb_step, gdb_next, gdb_finish: control execution \
    \n4. gdb_backtrace, gdb_print, gdb_examine, gdb_info_registers: inspect state \
    \n5. gdb_command: any other debugger command, sent verbatim \
    \n6. gdb_terminate when done \
    \n\nCommands on one session run one at a time in submission order; sessions are independent. \
    Every tool returns {status, output?, error?}. A timed-out command leaves the session usable. \
    gdb_interrupt stops a running program without waiting for the queue.";

/// MCP server for concurrent GDB sessions
#[derive(Clone)]
pub struct GdbServer {
    pub(super) registry: Arc<SessionRegistry>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GdbServer {
    /// Create a server backed by `registry`
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Start a new GDB session. Waits for the debugger's first prompt and \
        returns its session_id. Optional gdb_path, working_dir, and args override the defaults.")]
    async fn gdb_start(
        &self,
        Parameters(req): Parameters<StartRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = StartSessionRequest {
            debugger_path: req.gdb_path.map(PathBuf::from),
            args: req.args,
            working_dir: req.working_dir.map(PathBuf::from),
        };

        let envelope = match self.registry.create(request).await {
            Ok(session_id) => {
                let mut envelope = ToolEnvelope::ok();
                envelope.output = Some(format!("session {session_id} ready"));
                envelope.sessions = self
                    .registry
                    .get(&session_id)
                    .ok()
                    .map(|session| vec![session.summary()]);
                envelope.session(session_id)
            }
            Err(e) => ToolEnvelope::from(e),
        };
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Terminate a GDB session: cancels queued commands, kills the debugger, \
        and frees the session id. Terminating an already-ended session succeeds.")]
    async fn gdb_terminate(
        &self,
        Parameters(req): Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let session_id = SessionId::from(req.session_id);
        let envelope = match self.registry.terminate(&session_id).await {
            Ok(response) => {
                let mut envelope = ToolEnvelope::ok();
                envelope.output = Some(format!("session {}", response.final_state));
                envelope.terminated = Some(response);
                envelope.session(session_id)
            }
            Err(e) => failure(session_id, e),
        };
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "List active GDB sessions with their state, target, and start time.")]
    async fn gdb_list_sessions(
        &self,
        Parameters(req): Parameters<ListSessionsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let sessions = self.registry.list(req.include_ended.unwrap_or(false));
        let mut envelope = ToolEnvelope::ok();
        envelope.output = Some(format!("{} session(s)", sessions.len()));
        envelope.sessions = Some(sessions);
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Load a program into GDB (`file`), optionally setting its run arguments.")]
    async fn gdb_load(
        &self,
        Parameters(req): Parameters<LoadRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut commands = vec![DebuggerCommand::File(req.program.clone())];
        if let Some(arguments) = req.arguments.filter(|a| !a.is_empty()) {
            commands.push(DebuggerCommand::SetArgs(arguments));
        }

        let envelope = match self.run_steps(&req.session_id, commands, req.timeout_secs).await {
            Ok(steps) => {
                if steps.first().is_some_and(ToolEnvelope::is_ok) {
                    self.record_executable(&req.session_id, &req.program);
                }
                fold_steps(steps).session(SessionId::from(req.session_id))
            }
            Err(envelope) => envelope,
        };
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Attach GDB to a running process by pid.")]
    async fn gdb_attach(
        &self,
        Parameters(req): Parameters<AttachRequest>,
    ) -> Result<CallToolResult, McpError> {
        let envelope = self
            .run_command(&req.session_id, DebuggerCommand::Attach(req.pid), req.timeout_secs)
            .await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Load a core dump, loading its program first when given. \
        Ok only if every step succeeds; per-step results are in `steps`.")]
    async fn gdb_load_core(
        &self,
        Parameters(req): Parameters<LoadCoreRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut commands = Vec::with_capacity(2);
        if let Some(program) = req.program.clone() {
            commands.push(DebuggerCommand::File(program));
        }
        commands.push(DebuggerCommand::Core(req.core_path));

        let envelope = match self.run_steps(&req.session_id, commands, req.timeout_secs).await {
            Ok(steps) => {
                if let Some(program) = req.program.as_deref() {
                    if steps.first().is_some_and(ToolEnvelope::is_ok) {
                        self.record_executable(&req.session_id, program);
                    }
                }
                ToolEnvelope::from_steps(steps).session(SessionId::from(req.session_id))
            }
            Err(envelope) => envelope,
        };
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Continue program execution until the next stop.")]
    async fn gdb_continue(
        &self,
        Parameters(req): Parameters<ExecRequest>,
    ) -> Result<CallToolResult, McpError> {
        let envelope = self
            .run_command(&req.session_id, DebuggerCommand::Continue, req.timeout_secs)
            .await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Step into the next source line (or machine instruction).")]
    async fn gdb_step(
        &self,
        Parameters(req): Parameters<StepRequest>,
    ) -> Result<CallToolResult, McpError> {
        let command = DebuggerCommand::Step {
            instructions: req.instructions.unwrap_or(false),
        };
        let envelope = self.run_command(&req.session_id, command, req.timeout_secs).await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Step over function calls to the next source line (or instruction).")]
    async fn gdb_next(
        &self,
        Parameters(req): Parameters<StepRequest>,
    ) -> Result<CallToolResult, McpError> {
        let command = DebuggerCommand::Next {
            instructions: req.instructions.unwrap_or(false),
        };
        let envelope = self.run_command(&req.session_id, command, req.timeout_secs).await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Run until the current function returns.")]
    async fn gdb_finish(
        &self,
        Parameters(req): Parameters<ExecRequest>,
    ) -> Result<CallToolResult, McpError> {
        let envelope = self
            .run_command(&req.session_id, DebuggerCommand::Finish, req.timeout_secs)
            .await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Set a breakpoint at a function, file:line, or *address, \
        optionally with a condition.")]
    async fn gdb_set_breakpoint(
        &self,
        Parameters(req): Parameters<BreakpointRequest>,
    ) -> Result<CallToolResult, McpError> {
        let command = DebuggerCommand::Break {
            location: req.location,
            condition: req.condition.filter(|c| !c.trim().is_empty()),
        };
        let envelope = self.run_command(&req.session_id, command, req.timeout_secs).await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Show the call stack, optionally with locals (`full`) and a frame limit.")]
    async fn gdb_backtrace(
        &self,
        Parameters(req): Parameters<BacktraceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let command = DebuggerCommand::Backtrace {
            full: req.full.unwrap_or(false),
            limit: req.limit.filter(|l| *l > 0),
        };
        let envelope = self.run_command(&req.session_id, command, req.timeout_secs).await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Print the value of an expression.")]
    async fn gdb_print(
        &self,
        Parameters(req): Parameters<PrintRequest>,
    ) -> Result<CallToolResult, McpError> {
        let envelope = self
            .run_command(&req.session_id, DebuggerCommand::Print(req.expression), req.timeout_secs)
            .await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Examine memory (`x/<count><format> <expression>`).")]
    async fn gdb_examine(
        &self,
        Parameters(req): Parameters<ExamineRequest>,
    ) -> Result<CallToolResult, McpError> {
        let command = DebuggerCommand::Examine {
            address: req.expression,
            count: req.count.filter(|c| *c > 0),
            format: req.format.filter(|f| !f.trim().is_empty()),
        };
        let envelope = self.run_command(&req.session_id, command, req.timeout_secs).await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Display registers, or a single named register.")]
    async fn gdb_info_registers(
        &self,
        Parameters(req): Parameters<RegistersRequest>,
    ) -> Result<CallToolResult, McpError> {
        let command = DebuggerCommand::Registers(req.register.filter(|r| !r.trim().is_empty()));
        let envelope = self.run_command(&req.session_id, command, req.timeout_secs).await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Execute any GDB command line verbatim and return its output.")]
    async fn gdb_command(
        &self,
        Parameters(req): Parameters<CommandRequest>,
    ) -> Result<CallToolResult, McpError> {
        let envelope = self
            .run_command(&req.session_id, DebuggerCommand::Raw(req.command), req.timeout_secs)
            .await;
        Ok(envelope_result(&envelope))
    }

    #[tool(description = "Interrupt the running program (SIGINT to the debugger) without \
        waiting for queued commands. The in-flight command then completes normally.")]
    async fn gdb_interrupt(
        &self,
        Parameters(req): Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let session_id = SessionId::from(req.session_id);
        let envelope = match self.registry.interrupt(&session_id) {
            Ok(()) => {
                let mut envelope = ToolEnvelope::ok();
                envelope.output = Some("interrupt sent".to_string());
                envelope.session(session_id)
            }
            Err(e) => failure(session_id, e),
        };
        Ok(envelope_result(&envelope))
    }
}

impl GdbServer {
    fn record_executable(&self, session_id: &str, program: &str) {
        if let Ok(session) = self.registry.get(&SessionId::from(session_id)) {
            session.set_executable_path(program);
        }
    }
}

/// A single step is reported as-is; several are folded
fn fold_steps(mut steps: Vec<ToolEnvelope>) -> ToolEnvelope {
    if steps.len() == 1 {
        if let Some(step) = steps.pop() {
            return step;
        }
    }
    ToolEnvelope::from_steps(steps)
}

#[tool_handler]
impl ServerHandler for GdbServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::options::DebuggerOptions;
    use std::time::Duration;

    const FAKE_GDB: &str = r#"printf '(gdb) '
while IFS= read -r line; do
  case "$line" in
    "file "*) echo "Reading symbols from ${line#file }..." ;;
    "core "*) echo "core: No such file or directory." ;;
    *) echo "echo: $line" ;;
  esac
  printf '(gdb) '
done"#;

    fn server() -> GdbServer {
        let options = DebuggerOptions::builder()
            .debugger_path("/bin/sh")
            .debugger_args(["-c", FAKE_GDB])
            .error_patterns([": No such file or directory\\.$"])
            .startup_timeout(Duration::from_secs(5))
            .command_timeout(Duration::from_secs(5))
            .build();
        GdbServer::new(Arc::new(SessionRegistry::new(options)))
    }

    fn body(result: &CallToolResult) -> serde_json::Value {
        let text = result.content[0]
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default();
        serde_json::from_str(&text).unwrap()
    }

    async fn start(server: &GdbServer) -> String {
        let result = server
            .gdb_start(Parameters(StartRequest {
                gdb_path: None,
                working_dir: None,
                args: None,
            }))
            .await
            .unwrap();
        let json = body(&result);
        assert_eq!(json["status"], "ok", "{json}");
        json["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn unknown_session_is_uniform() {
        let server = server();
        let result = server
            .gdb_print(Parameters(PrintRequest {
                session_id: "missing".into(),
                expression: "argc".into(),
                timeout_secs: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        let json = body(&result);
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "session not found");

        let result = server
            .gdb_terminate(Parameters(SessionRequest {
                session_id: "missing".into(),
            }))
            .await
            .unwrap();
        assert_eq!(body(&result)["error"], "session not found");
    }

    #[tokio::test]
    async fn load_records_executable_and_args() {
        let server = server();
        let session_id = start(&server).await;

        let result = server
            .gdb_load(Parameters(LoadRequest {
                session_id: session_id.clone(),
                program: "/bin/true".into(),
                arguments: Some(vec!["-v".into(), "x".into()]),
                timeout_secs: None,
            }))
            .await
            .unwrap();
        let json = body(&result);
        assert_eq!(json["status"], "ok", "{json}");
        assert_eq!(json["command"], "file /bin/true; set args -v x");
        assert_eq!(json["steps"].as_array().map(Vec::len), Some(2));

        let list = body(
            &server
                .gdb_list_sessions(Parameters(ListSessionsRequest {
                    include_ended: None,
                }))
                .await
                .unwrap(),
        );
        assert_eq!(list["sessions"][0]["executable_path"], "/bin/true");

        server.registry.shutdown().await;
    }

    #[tokio::test]
    async fn load_core_fails_when_a_step_fails() {
        let server = server();
        let session_id = start(&server).await;

        let result = server
            .gdb_load_core(Parameters(LoadCoreRequest {
                session_id: session_id.clone(),
                program: Some("/bin/true".into()),
                core_path: "core.123".into(),
                timeout_secs: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        let json = body(&result);
        assert_eq!(json["status"], "error");
        assert_eq!(json["steps"][0]["status"], "ok");
        assert_eq!(json["steps"][1]["result"], "error");

        server.registry.shutdown().await;
    }

    #[tokio::test]
    async fn formatted_commands_reach_the_debugger() {
        let server = server();
        let session_id = start(&server).await;

        let result = server
            .gdb_examine(Parameters(ExamineRequest {
                session_id: session_id.clone(),
                expression: "$sp".into(),
                count: Some(4),
                format: Some("xg".into()),
                timeout_secs: None,
            }))
            .await
            .unwrap();
        assert_eq!(body(&result)["output"], "echo: x/4xg $sp");

        let result = server
            .gdb_set_breakpoint(Parameters(BreakpointRequest {
                session_id: session_id.clone(),
                location: "main".into(),
                condition: Some("argc > 1".into()),
                timeout_secs: None,
            }))
            .await
            .unwrap();
        assert_eq!(body(&result)["output"], "echo: break main if argc > 1");

        let result = server
            .gdb_terminate(Parameters(SessionRequest { session_id }))
            .await
            .unwrap();
        let json = body(&result);
        assert_eq!(json["terminated"]["final_state"], "terminated");
        assert_eq!(json["terminated"]["already_ended"], false);
    }

    #[tokio::test]
    async fn huge_timeout_and_multi_line_commands_are_handled() {
        let server = server();
        let session_id = start(&server).await;

        let result = server
            .gdb_print(Parameters(PrintRequest {
                session_id: session_id.clone(),
                expression: "argc".into(),
                timeout_secs: Some(u64::MAX),
            }))
            .await
            .unwrap();
        assert_eq!(body(&result)["output"], "echo: print argc");

        let result = server
            .gdb_command(Parameters(CommandRequest {
                session_id: session_id.clone(),
                command: "print 1\nprint 2".into(),
                timeout_secs: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        let json = body(&result);
        assert_eq!(json["result"], "error");
        assert!(json["output"].as_str().unwrap_or_default().contains("single line"));

        let result = server
            .gdb_command(Parameters(CommandRequest {
                session_id,
                command: "info frame".into(),
                timeout_secs: None,
            }))
            .await
            .unwrap();
        assert_eq!(body(&result)["output"], "echo: info frame");

        server.registry.shutdown().await;
    }
}
