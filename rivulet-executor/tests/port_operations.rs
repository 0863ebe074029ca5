//! Integration tests for single-port and collection operations inside a run.
//!
//! Tests verify that:
//! - `receive_once` takes one packet, closes the port and falls back to a default
//! - `contents()` ends with the stream and disposes of every packet it yields
//! - Forked sends deliver an equal copy to every member
//! - `long_wait` keeps a busy runner out of deadlock detection

mod common;

use common::{Log, Recorder, ints, log};
use futures::StreamExt;
use rivulet_executor::prelude::*;
use std::time::Duration;

/// Forwards the first packet of each run, or `-1` when nothing arrives.
struct FirstOnly;

impl Component for FirstOnly {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("FirstOnly")
            .with_port(PortSpec::input("IN"))
            .with_port(PortSpec::output("OUT"))
            .must_run()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let value = ctx.input("IN")?.receive_once(Value::int(-1)).await?;
            ctx.output("OUT")?.send_value(value).await?;
            Ok(())
        })
    }
}

/// Sums integer contents and sends the total once the input drains.
struct Sum;

impl Component for Sum {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Sum")
            .with_port(PortSpec::input("IN"))
            .with_port(PortSpec::output("OUT"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let mut contents = std::pin::pin!(ctx.input("IN")?.contents());
            let mut total = 0i64;
            while let Some(value) = contents.next().await {
                total += value?.as_i64().unwrap_or_default();
            }
            ctx.output("OUT")?.send_value(total).await?;
            Ok(())
        })
    }
}

/// Copies every packet to both `A` and `B`.
struct Fork;

impl Component for Fork {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Fork")
            .with_port(PortSpec::input("IN"))
            .with_port(PortSpec::output("A"))
            .with_port(PortSpec::output("B"))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            let outs = ctx.outputs(&["A", "B"])?;
            while let Some(packet) = input.receive().await? {
                outs.send_forked(packet).await?;
            }
            Ok(())
        })
    }
}

/// Sleeps inside `long_wait`, recording its runner state, then sends 7.
struct Slow {
    states: Log<RunnerState>,
}

impl Component for Slow {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Slow")
            .with_port(PortSpec::output("OUT"))
            .self_starting()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let states = &self.states;
            let value = ctx
                .long_wait(async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    states.lock().push(ctx.runner().state());
                    7
                })
                .await;
            states.lock().push(ctx.runner().state());
            ctx.output("OUT")?.send_value(value).await?;
            Ok(())
        })
    }
}

#[tokio::test]
async fn test_receive_once_takes_first_and_closes() {
    let (sink, seen) = Recorder::new();
    let mut network = Network::new();
    network.add("Gen", functional::values([5, 6, 7])).unwrap();
    network.add("First", FirstOnly).unwrap();
    network.add("Show", sink).unwrap();
    network.connect("Gen.OUT", "First.IN", None).unwrap();
    network.connect("First.OUT", "Show.IN", None).unwrap();

    network.go().await.unwrap();

    assert_eq!(ints(&seen.lock()), vec![5]);
    // Packets behind the first are discarded or refused, never leaked.
    let counters = network.counters();
    assert_eq!(counters.creates, counters.drops);
}

#[tokio::test]
async fn test_receive_once_falls_back_to_default() {
    let (sink, seen) = Recorder::new();
    let mut network = Network::new();
    network.add("Gen", functional::values(Vec::<i64>::new())).unwrap();
    network.add("First", FirstOnly).unwrap();
    network.add("Show", sink).unwrap();
    network.connect("Gen.OUT", "First.IN", None).unwrap();
    network.connect("First.OUT", "Show.IN", None).unwrap();

    network.go().await.unwrap();

    assert_eq!(ints(&seen.lock()), vec![-1]);
}

#[tokio::test]
async fn test_contents_stream_ends_and_drops_packets() {
    let (sink, seen) = Recorder::new();
    let mut network = Network::new();
    network.add("Gen", functional::values([1, 2, 3, 4])).unwrap();
    network.add("Sum", Sum).unwrap();
    network.add("Show", sink).unwrap();
    network.connect("Gen.OUT", "Sum.IN", Some(1)).unwrap();
    network.connect("Sum.OUT", "Show.IN", None).unwrap();

    network.go().await.unwrap();

    assert_eq!(ints(&seen.lock()), vec![10]);
    let counters = network.counters();
    assert_eq!(counters.creates, 5);
    assert_eq!(counters.creates, counters.drops);
}

#[tokio::test]
async fn test_forked_send_reaches_every_member() {
    let (left, left_seen) = Recorder::new();
    let (right, right_seen) = Recorder::new();
    let mut network = Network::new();
    network.add("Gen", functional::values([9, 8])).unwrap();
    network.add("Fork", Fork).unwrap();
    network.add("Left", left).unwrap();
    network.add("Right", right).unwrap();
    network.connect("Gen.OUT", "Fork.IN", None).unwrap();
    network.connect("Fork.A", "Left.IN", None).unwrap();
    network.connect("Fork.B", "Right.IN", None).unwrap();

    network.go().await.unwrap();

    assert_eq!(ints(&left_seen.lock()), vec![9, 8]);
    assert_eq!(ints(&right_seen.lock()), vec![9, 8]);
    let counters = network.counters();
    assert_eq!(counters.creates, 4);
    assert_eq!(counters.creates, counters.drops);
}

#[tokio::test]
async fn test_long_wait_is_not_a_deadlock() {
    let states = log();
    let (sink, seen) = Recorder::new();
    let mut network = Network::new();
    network
        .add(
            "Slow",
            Slow {
                states: states.clone(),
            },
        )
        .unwrap();
    network.add("Show", sink).unwrap();
    network.connect("Slow.OUT", "Show.IN", None).unwrap();

    tokio::time::timeout(Duration::from_secs(5), network.go())
        .await
        .expect("long wait hung the network")
        .unwrap();

    // Show sat in SUSP_RECV the whole time Slow was waiting.
    assert_eq!(*states.lock(), vec![RunnerState::LongWait, RunnerState::Active]);
    assert_eq!(ints(&seen.lock()), vec![7]);
}
