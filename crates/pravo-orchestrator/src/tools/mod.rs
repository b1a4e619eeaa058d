//! Tool registration.
//!
//! Each submodule owns one tool family; `register_all` assembles the full
//! dispatch table. Argument records are strongly typed per tool and parsed
//! once at entry.

mod admin;
mod advice;
mod documents;
mod legislation;
mod procedural;
mod search;

use crate::{parse_args, ToolContext, ToolOutput, ToolSpec};
use pravo_core::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Builds a [`ToolSpec`] from an async handler over typed arguments.
pub(crate) fn tool<A, F, Fut>(
    name: &'static str,
    description: &'static str,
    input_schema: Value,
    handler: F,
) -> ToolSpec
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(Arc<ToolContext>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolOutput>> + Send + 'static,
{
    ToolSpec {
        name,
        description,
        input_schema,
        handler: Arc::new(move |ctx, args| {
            let parsed = parse_args::<A>(args);
            let fut = parsed.map(|a| handler(ctx, a));
            Box::pin(async move { fut?.await })
        }),
    }
}

/// Registers every tool family.
pub(crate) fn register_all(specs: &mut Vec<ToolSpec>) {
    advice::register(specs);
    search::register(specs);
    legislation::register(specs);
    procedural::register(specs);
    documents::register(specs);
    admin::register(specs);
}
