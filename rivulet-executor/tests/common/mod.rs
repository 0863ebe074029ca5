//! Common test components for integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use rivulet_executor::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// Shared log of everything a recorder saw.
pub type Log<T> = Arc<Mutex<Vec<T>>>;

pub fn log<T>() -> Log<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Integer content of a value, for readable assertions.
pub fn ints(values: &[Value]) -> Vec<i64> {
    values.iter().filter_map(Value::as_i64).collect()
}

/// Doubles integer contents.
pub fn doubler() -> Transform<impl FnMut(Value) -> Result<Value> + Send> {
    Transform::new("Double", |v: Value| {
        Ok(Value::from(v.as_i64().unwrap_or_default() * 2))
    })
}

/// Sink recording contents, cloneable so a registry factory can hand out
/// instances that share one log.
#[derive(Clone)]
pub struct Recorder {
    pub seen: Log<Value>,
}

impl Recorder {
    pub fn new() -> (Self, Log<Value>) {
        let seen = log();
        (
            Self {
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

impl Component for Recorder {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Record").with_port(PortSpec::input("IN"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            while let Some(value) = input.receive_content().await? {
                self.seen.lock().push(value);
            }
            Ok(())
        })
    }
}

/// Sink recording packet identity and content.
pub struct IdRecorder {
    pub seen: Log<(PacketId, Value)>,
}

impl Component for IdRecorder {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("IdRecord").with_port(PortSpec::input("IN"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            while let Some(packet) = input.receive().await? {
                let id = packet.id();
                let value = ctx.consume(packet)?;
                self.seen.lock().push((id, value));
            }
            Ok(())
        })
    }
}

/// Sink recording packet kinds, brackets included.
pub struct KindRecorder {
    pub seen: Log<(PacketKind, Value)>,
}

impl Component for KindRecorder {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("KindRecord").with_port(PortSpec::input("IN"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            while let Some(packet) = input.receive().await? {
                let kind = packet.kind();
                let value = ctx.consume(packet)?;
                self.seen.lock().push((kind, value));
            }
            Ok(())
        })
    }
}

/// Emits each group of values as one bracketed substream.
pub struct Bracketed {
    pub groups: Vec<Vec<i64>>,
}

impl Component for Bracketed {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Bracketed")
            .with_port(PortSpec::output("OUT"))
            .self_starting()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let out = ctx.output("OUT")?;
            for group in &self.groups {
                out.send_open(Value::null()).await?;
                for &n in group {
                    out.send_value(n).await?;
                }
                out.send_close(Value::null()).await?;
            }
            Ok(())
        })
    }
}

/// Pairs packets from `A` and `B` into `[a, b]` arrays.
pub struct Zip;

impl Component for Zip {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Zip")
            .with_port(PortSpec::input("A"))
            .with_port(PortSpec::input("B"))
            .with_port(PortSpec::output("OUT"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let inputs = ctx.inputs(&["A", "B"])?;
            let out = ctx.output("OUT")?;
            while let Some(round) = inputs.zip().await? {
                let mut pair = Vec::with_capacity(round.len());
                for packet in round {
                    pair.push(ctx.consume(packet)?.into_inner());
                }
                out.send_value(json!(pair)).await?;
            }
            Ok(())
        })
    }
}

/// Forwards packets from `A` and `B` in arrival order.
pub struct Merge;

impl Component for Merge {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Merge")
            .with_port(PortSpec::input("A"))
            .with_port(PortSpec::input("B"))
            .with_port(PortSpec::output("OUT"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let inputs = ctx.inputs(&["A", "B"])?;
            let out = ctx.output("OUT")?;
            while let Some((_, packet)) = inputs.receive_any().await? {
                out.send(packet).await?;
            }
            Ok(())
        })
    }
}

/// Spreads packets over `OUT1` and `OUT2` by backlog.
pub struct Balance;

impl Component for Balance {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Balance")
            .with_port(PortSpec::input("IN"))
            .with_port(PortSpec::output("OUT1"))
            .with_port(PortSpec::output("OUT2"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            let outs = ctx.outputs(&["OUT1", "OUT2"])?;
            while let Some(packet) = input.receive().await? {
                outs.send_balanced(packet).await?;
            }
            Ok(())
        })
    }
}

/// Takes one data packet per activation and tags it with the `TAG`
/// initializer: `[tag, value]`.
pub struct Tagger;

impl Component for Tagger {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Tagger")
            .with_port(PortSpec::input("IN"))
            .with_port(PortSpec::input("TAG"))
            .with_port(PortSpec::output("OUT"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let Some(value) = ctx.input("IN")?.receive_content().await? else {
                return Ok(());
            };
            let tag = ctx
                .input("TAG")?
                .receive_content()
                .await?
                .unwrap_or_default();
            ctx.output("OUT")?
                .send_value(json!([tag.into_inner(), value.into_inner()]))
                .await?;
            Ok(())
        })
    }
}

/// Counts what arrives and reports the count once; runs even with no input.
pub struct Count {
    seen: usize,
}

impl Count {
    pub fn new() -> Self {
        Self { seen: 0 }
    }
}

impl Component for Count {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Count")
            .with_port(PortSpec::input("IN"))
            .with_port(PortSpec::output("OUT"))
            .must_run()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            while input.receive_content().await?.is_some() {
                self.seen += 1;
            }
            ctx.output("OUT")?.send_value(self.seen).await?;
            Ok(())
        })
    }
}

/// Receives one packet and keeps it past the end of the activation.
pub struct Leaky;

impl Component for Leaky {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Leaky").with_port(PortSpec::input("IN"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let _held = ctx.input("IN")?.receive().await?;
            Ok(())
        })
    }
}

/// Parks every packet on the manual stack and never takes it back.
pub struct Hoarder;

impl Component for Hoarder {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Hoarder").with_port(PortSpec::input("IN"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            if let Some(packet) = ctx.input("IN")?.receive().await? {
                ctx.push(packet)?;
            }
            Ok(())
        })
    }
}

/// Fails on the first packet.
pub struct Failing;

impl Component for Failing {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Failing").with_port(PortSpec::input("IN"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            if let Some(packet) = ctx.input("IN")?.receive().await? {
                ctx.drop(packet)?;
                return Err(ctx.fail("boom"));
            }
            Ok(())
        })
    }
}

/// Self-starting component that sends twice and never reads its input.
pub struct Chatty;

impl Component for Chatty {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Chatty")
            .with_port(PortSpec::input("IN").optional())
            .with_port(PortSpec::output("OUT"))
            .self_starting()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let out = ctx.output("OUT")?;
            out.send_value(1).await?;
            out.send_value(2).await?;
            Ok(())
        })
    }
}

/// Self-starting component bumping the `seed` global into `seen`.
pub struct GlobalBump;

impl Component for GlobalBump {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("GlobalBump").self_starting()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let seed = ctx
                .global("seed")
                .and_then(|v| v.as_i64())
                .ok_or_else(|| ctx.fail("seed global missing"))?;
            ctx.set_global("seen", seed + 1);
            Ok(())
        })
    }
}

/// Endless source of ones, for termination tests.
pub fn endless() -> Source<impl FnMut() -> Option<Value> + Send> {
    Source::new("Endless", || Some(Value::from(1)))
}

/// A subnet around a single doubler, exporting `IN` and `OUT`.
pub fn double_subnet(substream: bool) -> SubNet {
    let mut inner = Network::with_config(NetworkConfig::default().with_name("doubling"));
    inner.add("Dbl", doubler()).unwrap();
    let mut subnet = SubNet::new("DoubleNet", inner);
    if substream {
        subnet.export_input_substream("IN", "Dbl.IN").unwrap();
        subnet.export_output_substream("OUT", "Dbl.OUT").unwrap();
    } else {
        subnet.export_input("IN", "Dbl.IN").unwrap();
        subnet.export_output("OUT", "Dbl.OUT").unwrap();
    }
    subnet
}
