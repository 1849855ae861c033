//! Proxy configuration
//!
//! Every setting the binary front needs, sourced from the environment (with
//! `clap`'s `env` feature) and a handful of CLI flags that override it.
//! Grounded on the environment-variable list in the proxy's own operator
//! documentation: `TARGET_SERVER_URL`/`TARGET_SERVER_TRANSPORT`/
//! `TARGET_SERVER_MCP_PATH`/`PORT`/`HOOKS`/`SOURCE_SERVER_MCP_PATH`, plus a
//! `--stdio` flag that switches the source front.

use std::fmt;

use clap::Parser;
use reqwest::Url;

use crate::context::{HookConfig, OtherRequestPolicy};
use crate::hooks::HookMethodSet;
use crate::transport::TargetTransportMode;

/// Every bit a `RemoteHookClient` might override; `methods` is advisory
/// (consulted by `HookRouter` on the serving side, never by this client) so
/// a hook discovered purely by URL is free to claim the whole surface.
const ALL_HOOK_METHODS: HookMethodSet = HookMethodSet::INITIALIZE_REQUEST
    .union(HookMethodSet::INITIALIZE_RESULT)
    .union(HookMethodSet::LIST_TOOLS_REQUEST)
    .union(HookMethodSet::LIST_TOOLS_RESULT)
    .union(HookMethodSet::CALL_TOOL_REQUEST)
    .union(HookMethodSet::CALL_TOOL_RESULT)
    .union(HookMethodSet::OTHER_REQUEST)
    .union(HookMethodSet::OTHER_RESULT)
    .union(HookMethodSet::TARGET_REQUEST)
    .union(HookMethodSet::TARGET_RESULT)
    .union(HookMethodSet::NOTIFICATION)
    .union(HookMethodSet::TARGET_NOTIFICATION)
    .union(HookMethodSet::INITIALIZE_TRANSPORT_ERROR)
    .union(HookMethodSet::LIST_TOOLS_TRANSPORT_ERROR)
    .union(HookMethodSet::CALL_TOOL_TRANSPORT_ERROR);

/// Raised when `TARGET_SERVER_TRANSPORT` names anything but `sse`/`httpStream`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportModeParseError(String);

impl fmt::Display for TransportModeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a recognized target transport (expected 'sse' or 'httpStream')", self.0)
    }
}

impl std::error::Error for TransportModeParseError {}

fn parse_transport_mode(raw: &str) -> Result<TargetTransportMode, TransportModeParseError> {
    match raw {
        "sse" => Ok(TargetTransportMode::Sse),
        "httpStream" => Ok(TargetTransportMode::HttpStream),
        other => Err(TransportModeParseError(other.to_string())),
    }
}

/// CLI/environment configuration for the proxy binary.
#[derive(Debug, Parser)]
#[command(name = "mcp-passthrough-proxy", about = "Transparent passthrough proxy for the Model Context Protocol")]
pub struct Cli {
    /// Base URL of the target MCP server this proxy forwards to
    #[arg(long, env = "TARGET_SERVER_URL")]
    pub target_server_url: Url,

    /// Wire shape the target server speaks
    #[arg(long, env = "TARGET_SERVER_TRANSPORT", value_parser = parse_transport_mode)]
    pub target_server_transport: TargetTransportMode,

    /// Path segment joined onto `TARGET_SERVER_URL` for MCP traffic
    #[arg(long, env = "TARGET_SERVER_MCP_PATH", default_value = "/mcp")]
    pub target_server_mcp_path: String,

    /// Port the HTTP front listens on
    #[arg(long, env = "PORT", default_value_t = 34000)]
    pub port: u16,

    /// Comma-separated base URLs of remote hooks, applied in listed order
    #[arg(long, env = "HOOKS", value_delimiter = ',', default_value = "")]
    pub hooks: Vec<String>,

    /// Path this proxy mounts its own MCP endpoint at
    #[arg(long, env = "SOURCE_SERVER_MCP_PATH", default_value = "/mcp")]
    pub source_server_mcp_path: String,

    /// Bearer token forwarded to the target in place of an inbound one
    #[arg(long, env = "TARGET_SERVER_AUTH_TOKEN")]
    pub target_server_auth_token: Option<String>,

    /// Read newline-delimited JSON-RPC from stdin/stdout instead of serving HTTP
    #[arg(long)]
    pub stdio: bool,
}

/// Resolved proxy configuration, derived from [`Cli`] once at startup.
pub struct ProxyConfig {
    /// Target MCP server, joined with `target_server_mcp_path`
    pub target_url: Url,
    /// Target server's bare base URL, for the reverse-proxy fallback route
    pub target_base_url: Url,
    /// Wire shape the target speaks
    pub target_transport: TargetTransportMode,
    /// HTTP port the source front listens on
    pub port: u16,
    /// Path this proxy's own MCP endpoint is mounted at
    pub source_mcp_path: String,
    /// Hook chain configuration, in application order
    pub hooks: Vec<HookConfig>,
    /// Bearer token forwarded to the target, overriding any inbound one
    pub auth_token: Option<String>,
    /// Whether unrecognized methods still traverse the hook chain
    pub other_policy: OtherRequestPolicy,
    /// Serve over stdio instead of HTTP
    pub stdio: bool,
}

impl ProxyConfig {
    /// Parse `std::env::args()` plus environment variables into a resolved config.
    pub fn from_args() -> Result<Self, Box<dyn std::error::Error>> {
        Self::from_cli(Cli::parse())
    }

    /// Resolve an already-parsed [`Cli`] into a [`ProxyConfig`].
    pub fn from_cli(cli: Cli) -> Result<Self, Box<dyn std::error::Error>> {
        let target_url = cli.target_server_url.join(cli.target_server_mcp_path.trim_start_matches('/'))?;

        let hooks = cli
            .hooks
            .into_iter()
            .filter(|url| !url.trim().is_empty())
            .enumerate()
            .map(|(index, raw)| -> Result<HookConfig, Box<dyn std::error::Error>> {
                let base_url = Url::parse(raw.trim())?;
                Ok(HookConfig::Remote {
                    name: format!("hook-{index}"),
                    base_url,
                    methods: ALL_HOOK_METHODS,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            target_base_url: cli.target_server_url.clone(),
            target_url,
            target_transport: cli.target_server_transport,
            port: cli.port,
            source_mcp_path: cli.source_server_mcp_path,
            hooks,
            auth_token: cli.target_server_auth_token,
            other_policy: OtherRequestPolicy::ForwardDirectly,
            stdio: cli.stdio,
        })
    }
}
