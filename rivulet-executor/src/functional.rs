//! Components built from plain closures.
//!
//! The adapters fix their port layout at compile time: a [`Source`] has one
//! output `OUT`, a [`Transform`] maps `IN` to `OUT` and a [`Sink`] consumes
//! `IN`. The closure sees packet contents only; the adapter takes care of
//! creating, sending and dropping packets.

use parking_lot::Mutex;
use rivulet_core::context::Context;
use rivulet_core::error::Result;
use rivulet_core::port::PortSpec;
use rivulet_core::traits::{Component, ComponentFuture, ComponentInfo};
use rivulet_core::value::Value;
use std::sync::Arc;

/// Name of the input port of [`Transform`] and [`Sink`].
pub const IN: &str = "IN";
/// Name of the output port of [`Source`] and [`Transform`].
pub const OUT: &str = "OUT";

/// Self-starting component emitting the values produced by a closure.
///
/// The closure is called until it returns `None`.
pub struct Source<F> {
    type_name: String,
    next: F,
}

impl<F> Source<F>
where
    F: FnMut() -> Option<Value> + Send,
{
    /// Create a source of type `type_name`.
    pub fn new(type_name: impl Into<String>, next: F) -> Self {
        Self {
            type_name: type_name.into(),
            next,
        }
    }
}

/// A source emitting a fixed list of values.
pub fn values<I>(items: I) -> Source<impl FnMut() -> Option<Value> + Send>
where
    I: IntoIterator,
    I::Item: Into<Value>,
    I::IntoIter: Send,
{
    let mut items = items.into_iter();
    Source::new("Values", move || items.next().map(Into::into))
}

impl<F> Component for Source<F>
where
    F: FnMut() -> Option<Value> + Send,
{
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new(self.type_name.clone())
            .with_port(PortSpec::output(OUT))
            .self_starting()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let out = ctx.output(OUT)?;
            while let Some(value) = (self.next)() {
                if !out.send_value(value).await? && out.is_closed() {
                    break;
                }
            }
            Ok(())
        })
    }
}

/// Component applying a closure to every packet content.
pub struct Transform<F> {
    type_name: String,
    apply: F,
}

impl<F> Transform<F>
where
    F: FnMut(Value) -> Result<Value> + Send,
{
    /// Create a transform of type `type_name`.
    pub fn new(type_name: impl Into<String>, apply: F) -> Self {
        Self {
            type_name: type_name.into(),
            apply,
        }
    }
}

impl<F> Component for Transform<F>
where
    F: FnMut(Value) -> Result<Value> + Send,
{
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new(self.type_name.clone())
            .with_port(PortSpec::input(IN))
            .with_port(PortSpec::output(OUT))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input(IN)?;
            let out = ctx.output(OUT)?;
            while let Some(mut packet) = input.receive().await? {
                if packet.is_normal() {
                    let content = std::mem::take(packet.content_mut());
                    *packet.content_mut() = match (self.apply)(content) {
                        Ok(mapped) => mapped,
                        Err(e) => {
                            ctx.drop(packet)?;
                            return Err(e);
                        }
                    };
                }
                out.send(packet).await?;
            }
            Ok(())
        })
    }
}

/// Component handing every packet content to a closure.
pub struct Sink<F> {
    type_name: String,
    accept: F,
}

impl<F> Sink<F>
where
    F: FnMut(Value) -> Result<()> + Send,
{
    /// Create a sink of type `type_name`.
    pub fn new(type_name: impl Into<String>, accept: F) -> Self {
        Self {
            type_name: type_name.into(),
            accept,
        }
    }
}

impl<F> Component for Sink<F>
where
    F: FnMut(Value) -> Result<()> + Send,
{
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new(self.type_name.clone()).with_port(PortSpec::input(IN))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input(IN)?;
            while let Some(value) = input.receive_content().await? {
                (self.accept)(value)?;
            }
            Ok(())
        })
    }
}

/// Values gathered by a [`collector`] sink.
pub type Collected = Arc<Mutex<Vec<Value>>>;

/// A sink that stores every content it receives.
pub fn collector() -> (Sink<impl FnMut(Value) -> Result<()> + Send>, Collected) {
    let collected: Collected = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::clone(&collected);
    let sink = Sink::new("Collect", move |value| {
        store.lock().push(value);
        Ok(())
    });
    (sink, collected)
}
