//! The host library exposed to every script.
//!
//! Registers the `Request` type (a [`RequestContext`]) and helper functions, and
//! routes `print`/`debug` output from scripts into `tracing`.

use crate::handlers::RequestContext;
use crate::pages::html_escape;
use rhai::{Dynamic, Engine};
use tracing::{debug, info};

fn optional(value: Option<&str>) -> Dynamic {
    value.map_or(Dynamic::UNIT, |v| Dynamic::from(v.to_string()))
}

/// Registers the host library on `engine`.
pub fn register_host(engine: &mut Engine) {
    engine
        .register_type_with_name::<RequestContext>("Request")
        .register_get("method", |ctx: &mut RequestContext| ctx.method.clone())
        .register_get("path", |ctx: &mut RequestContext| ctx.path.clone())
        .register_get("body", |ctx: &mut RequestContext| ctx.body.clone())
        .register_fn("query", |ctx: &mut RequestContext, name: &str| {
            optional(ctx.query(name))
        })
        .register_fn("header", |ctx: &mut RequestContext, name: &str| {
            optional(ctx.header(name))
        })
        .register_fn("cookie", |ctx: &mut RequestContext, name: &str| {
            optional(ctx.cookie(name))
        })
        .register_fn("html_escape", |text: &str| html_escape(text));

    engine
        .on_print(|text| info!(target: "scriptpage::script", "{text}"))
        .on_debug(|text, source, pos| {
            debug!(
                target: "scriptpage::script",
                source = source.unwrap_or_default(),
                position = %pos,
                "{text}"
            )
        });
}
