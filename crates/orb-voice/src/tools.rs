//! Tool registry: named callables the remote model may invoke.
//!
//! The registry only provides the mechanism. What a tool does is up to
//! the handler registered under its name.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use orb_common::ToolDefinition;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::VoiceError;

/// A callable registered under a tool name.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, String>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnTool<F>(pub F);

#[async_trait]
impl<F, Fut> ToolHandler for FnTool<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, String>> + Send,
{
    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, String> {
        (self.0)(arguments).await
    }
}

/// Convert a tool definition to the realtime session wire format.
pub fn to_realtime_tool(tool: &ToolDefinition) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

/// Mutable name → handler map.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler, replacing any previous one with the same name.
    pub async fn register(&self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let name = name.into();
        debug!(tool = %name, "Registering tool");
        self.handlers.write().await.insert(name, handler);
    }

    /// Register an async closure.
    pub async fn register_fn<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, String>> + Send + 'static,
    {
        self.register(name, Arc::new(FnTool(f))).await;
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.handlers.read().await.contains_key(name)
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Invoke the handler registered under `name`.
    ///
    /// Returns `Ok(None)` when nothing is registered. A handler error or
    /// panic becomes [`VoiceError::ToolInvocation`].
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, VoiceError> {
        // Clone the handler out so the lock is not held across the call.
        let handler = match self.handlers.read().await.get(name) {
            Some(h) => Arc::clone(h),
            None => return Ok(None),
        };

        match AssertUnwindSafe(handler.call(arguments))
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(message)) => Err(VoiceError::ToolInvocation {
                name: name.to_string(),
                message,
            }),
            Err(_) => Err(VoiceError::ToolInvocation {
                name: name.to_string(),
                message: "handler panicked".into(),
            }),
        }
    }
}
