// kodegen-gdb: GDB session tools over MCP stdio
//
// stdout carries the MCP protocol, so all logging goes to stderr.

use anyhow::{Context, Result};
use kodegen_gdb::DebuggerOptions;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let options = DebuggerOptions::from_env().context("invalid KODEGEN_GDB_* configuration")?;
    log::debug!("{options:?}");

    kodegen_gdb::serve_stdio(options).await
}
