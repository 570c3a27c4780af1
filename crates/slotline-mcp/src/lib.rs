// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! `slotline-mcp` — MCP (Model Context Protocol) server for slotline.
//!
//! Serves whatever the registered integrations bound into the [`Catalog`]
//! over **stdio** using line-delimited JSON-RPC.
//!
//! # MCP client configuration (`mcp.json`)
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "slotline": {
//!       "command": "slotline",
//!       "args": ["serve"],
//!       "env": { "CALCOM_API_KEY": "cal_live_..." }
//!     }
//!   }
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! MCP client
//!       │  stdin/stdout (line-delimited JSON-RPC)
//!       ▼
//! SlotlineMcpServer (rmcp ServerHandler)
//!       │
//!       ▼
//! Catalog  ──►  Tool::execute() / Resource::read() / PromptTemplate
//! ```

pub mod bridge;
pub mod server;

pub use server::SlotlineMcpServer;

use anyhow::Result;
use rmcp::ServiceExt;

/// Serve `server` on `stdin` / `stdout` until the client disconnects
/// (stdin EOF) or the process is terminated.
pub async fn serve_stdio(server: SlotlineMcpServer) -> Result<()> {
    let running = server
        .serve((tokio::io::stdin(), tokio::io::stdout()))
        .await
        .map_err(|e| anyhow::anyhow!("MCP server init error: {e}"))?;
    running
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))?;
    Ok(())
}
