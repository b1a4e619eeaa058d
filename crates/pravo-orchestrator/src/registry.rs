//! The tool registry: typed dispatch with schemas and deadlines.
//!
//! Every tool is registered once with its JSON-Schema; dispatch validates
//! the name, deserializes the arguments into the tool's typed record, and
//! runs the handler under the context deadline. Unknown names and malformed
//! arguments are `INVALID_ARGUMENT`; a fired deadline is
//! `DEADLINE_EXCEEDED` with no partial result.

use crate::{tools, ToolContext};
use futures::future::BoxFuture;
use pravo_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// What a tool call returns: a structured payload plus optional warnings.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub payload: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ToolOutput {
    /// A payload with no warnings.
    pub fn ok<T: Serialize>(payload: &T) -> Result<ToolOutput> {
        Ok(ToolOutput {
            payload: serde_json::to_value(payload).map_err(|e| Error::Internal(e.into()))?,
            warnings: Vec::new(),
        })
    }

    /// A payload with warnings attached.
    pub fn with_warnings<T: Serialize>(payload: &T, warnings: Vec<String>) -> Result<ToolOutput> {
        Ok(ToolOutput {
            payload: serde_json::to_value(payload).map_err(|e| Error::Internal(e.into()))?,
            warnings,
        })
    }
}

/// Handler signature shared by every tool.
pub type ToolHandler =
    Arc<dyn Fn(Arc<ToolContext>, Value) -> BoxFuture<'static, Result<ToolOutput>> + Send + Sync>;

/// One registered tool.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub handler: ToolHandler,
}

/// Serializable descriptor for `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parses tool arguments into their typed record.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| Error::InvalidArgument(format!("bad tool arguments: {e}")))
}

/// The dispatcher. Stateless across requests apart from the injected
/// context.
pub struct Orchestrator {
    ctx: Arc<ToolContext>,
    tools: HashMap<&'static str, ToolSpec>,
}

impl Orchestrator {
    /// Builds the dispatcher with the full tool set registered.
    pub fn new(ctx: ToolContext) -> Self {
        let mut specs = Vec::new();
        tools::register_all(&mut specs);
        let tools = specs.into_iter().map(|spec| (spec.name, spec)).collect();
        Self {
            ctx: Arc::new(ctx),
            tools,
        }
    }

    /// Descriptors of every registered tool, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let mut list: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|spec| ToolDescriptor {
                name: spec.name.to_string(),
                description: spec.description.to_string(),
                input_schema: spec.input_schema.clone(),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Whether a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Invokes a tool under the context deadline.
    pub async fn call(&self, name: &str, args: Value) -> Result<ToolOutput> {
        self.call_as(self.ctx.viewer, name, args).await
    }

    /// Invokes a tool on behalf of a specific caller; document reads are
    /// scoped to that caller's view.
    pub async fn call_as(
        &self,
        viewer: Option<uuid::Uuid>,
        name: &str,
        args: Value,
    ) -> Result<ToolOutput> {
        let spec = self
            .tools
            .get(name)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown tool: {name}")))?;

        let ctx = if viewer == self.ctx.viewer {
            self.ctx.clone()
        } else {
            let mut scoped = (*self.ctx).clone();
            scoped.viewer = viewer;
            Arc::new(scoped)
        };

        info!(tool = name, "tool call");
        let fut = (spec.handler)(ctx.clone(), args);
        match tokio::time::timeout(self.ctx.deadline, fut).await {
            Ok(result) => {
                if let Err(e) = &result {
                    warn!(tool = name, error = %e, code = e.code(), "tool call failed");
                }
                result
            }
            Err(_) => Err(Error::DeadlineExceeded(format!(
                "tool {name} exceeded {}s",
                self.ctx.deadline.as_secs()
            ))),
        }
    }
}
