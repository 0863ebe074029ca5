//! Integration tests for failing networks.
//!
//! Tests verify that:
//! - Deadlocks are reported instead of hanging
//! - The first component error terminates the run and is returned
//! - Packet discipline violations are caught at deactivation
//! - Configuration mistakes are rejected while building

mod common;

use common::{Chatty, Failing, Hoarder, Leaky, Recorder, Zip, doubler};
use rivulet_executor::prelude::*;
use std::time::Duration;

#[tokio::test]
async fn test_deadlock_is_detected() {
    let mut network = Network::with_config(NetworkConfig::default().with_name("stuck"));
    network.add("Ping", Chatty).unwrap();
    network.add("Pong", Chatty).unwrap();
    network.connect("Ping.OUT", "Pong.IN", Some(1)).unwrap();
    network.connect("Pong.OUT", "Ping.IN", Some(1)).unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), network.go())
        .await
        .expect("deadlock was not detected")
        .unwrap_err();

    assert_eq!(err.code(), "E501");
    match err {
        RivuletError::Deadlock { network, blocked } => {
            assert_eq!(network, "stuck");
            let mut names: Vec<_> = blocked.iter().map(|b| b.component.as_str()).collect();
            names.sort_unstable();
            assert_eq!(names, vec!["Ping", "Pong"]);
            assert!(blocked.iter().all(|b| b.state == RunnerState::SuspSend));
        }
        other => panic!("expected deadlock, got {other:?}"),
    }
}

#[tokio::test]
async fn test_deadlock_detection_can_be_disabled() {
    let config = NetworkConfig::default().with_deadlock_detection(false);
    let mut network = Network::with_config(config);
    network.add("Ping", Chatty).unwrap();
    network.add("Pong", Chatty).unwrap();
    network.connect("Ping.OUT", "Pong.IN", Some(1)).unwrap();
    network.connect("Pong.OUT", "Ping.IN", Some(1)).unwrap();

    let handle = network.handle();
    let stopper = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.terminate()
    };
    let (result, stopped) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(network.go(), stopper)
    })
    .await
    .expect("terminate did not end the stuck run");

    assert!(stopped);
    result.unwrap();
}

#[tokio::test]
async fn test_component_error_is_returned() {
    let (sink, _) = Recorder::new();
    let mut network = Network::new();
    network.add("Gen", functional::values([1, 2, 3])).unwrap();
    network.add("Fail", Failing).unwrap();
    network.add("Other", functional::values(0..1000)).unwrap();
    network.add("Show", sink).unwrap();
    network.connect("Gen.OUT", "Fail.IN", None).unwrap();
    network.connect("Other.OUT", "Show.IN", Some(1)).unwrap();

    let err = network.go().await.unwrap_err();

    assert_eq!(err.code(), "E301");
    assert!(err.is_runtime_error());
    match err {
        RivuletError::Execution { component, cause } => {
            assert_eq!(component, "Fail");
            assert_eq!(cause, "boom");
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transform_error_is_returned() {
    let mut network = Network::new();
    network.add("Gen", functional::values(["x"])).unwrap();
    network
        .add(
            "Parse",
            Transform::new("Parse", |v: Value| {
                v.as_str()
                    .and_then(|s| s.parse::<i64>().ok())
                    .map(Value::from)
                    .ok_or_else(|| RivuletError::Execution {
                        component: "Parse".to_string(),
                        cause: "not a number".to_string(),
                    })
            }),
        )
        .unwrap();
    network.connect("Gen.OUT", "Parse.IN", None).unwrap();

    let err = network.go().await.unwrap_err();
    assert_eq!(err.code(), "E301");

    let counters = network.counters();
    assert_eq!(counters.creates, counters.drops);
}

#[tokio::test]
async fn test_undisposed_packet_is_reported() {
    let mut network = Network::new();
    network.add("Gen", functional::values([1])).unwrap();
    network.add("Leaky", Leaky).unwrap();
    network.connect("Gen.OUT", "Leaky.IN", None).unwrap();

    let err = network.go().await.unwrap_err();

    assert_eq!(err.code(), "E401");
    assert!(err.is_packet_error());
    match err {
        RivuletError::PacketsNotDisposed { component, count } => {
            assert_eq!(component, "Leaky");
            assert_eq!(count, 1);
        }
        other => panic!("expected ownership error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_packets_left_on_stack_are_reported() {
    let mut network = Network::new();
    network.add("Gen", functional::values([1, 2])).unwrap();
    network.add("Hoard", Hoarder).unwrap();
    network.connect("Gen.OUT", "Hoard.IN", None).unwrap();

    let err = network.go().await.unwrap_err();

    assert_eq!(err.code(), "E405");
    match err {
        RivuletError::StackNotEmpty { component, count } => {
            assert_eq!(component, "Hoard");
            assert_eq!(count, 2);
        }
        other => panic!("expected stack error, got {other:?}"),
    }
    let counters = network.counters();
    assert_eq!(counters.creates, counters.drops);
}

#[test]
fn test_duplicate_component() {
    let mut network = Network::new();
    network.add("Dbl", doubler()).unwrap();
    let err = network.add("Dbl", doubler()).unwrap_err();
    assert_eq!(err.code(), "E101");
    assert!(err.is_config_error());
}

#[test]
fn test_unknown_component_and_port() {
    let mut network = Network::new();
    network.add("Dbl", doubler()).unwrap();

    let err = network.connect("Ghost.OUT", "Dbl.IN", None).unwrap_err();
    assert_eq!(err.code(), "E102");

    let err = network.connect("Dbl.NOPE", "Dbl.IN", None).unwrap_err();
    assert_eq!(err.code(), "E103");

    let err = network.connect("Dbl.IN", "Dbl.IN", None).unwrap_err();
    assert_eq!(err.code(), "E105");

    let err = network.connect("Dbl", "Dbl.IN", None).unwrap_err();
    assert_eq!(err.code(), "E104");
}

#[tokio::test]
async fn test_missing_required_port() {
    let mut network = Network::new();
    network.add("Gen", functional::values([1])).unwrap();
    network.add("Zip", Zip).unwrap();
    network.connect("Gen.OUT", "Zip.A", None).unwrap();

    let err = network.validate().unwrap_err();
    assert_eq!(err.code(), "E106");

    // Nothing runs when validation fails.
    let err = network.go().await.unwrap_err();
    assert_eq!(err.code(), "E106");
    assert_eq!(network.counters().creates, 0);
}

#[test]
fn test_initializer_conflicts() {
    let mut network = Network::new();
    network.add("Gen", functional::values([1])).unwrap();
    network.add("Zip", Zip).unwrap();

    network.initialize(1, "Zip.A").unwrap();
    let err = network.initialize(2, "Zip.A").unwrap_err();
    assert_eq!(err.code(), "E107");
    let err = network.connect("Gen.OUT", "Zip.A", None).unwrap_err();
    assert_eq!(err.code(), "E107");

    network.connect("Gen.OUT", "Zip.B", None).unwrap();
    let err = network.initialize(2, "Zip.B").unwrap_err();
    assert_eq!(err.code(), "E108");
}

#[test]
fn test_capacity_mismatch() {
    let mut network = Network::new();
    network.add("Low", functional::values([1])).unwrap();
    network.add("High", functional::values([2])).unwrap();
    network.add("Dbl", doubler()).unwrap();

    network.connect("Low.OUT", "Dbl.IN", Some(3)).unwrap();
    let err = network.connect("High.OUT", "Dbl.IN", Some(5)).unwrap_err();
    assert_eq!(err.code(), "E109");

    // Reconnecting the same pair is rejected too.
    let err = network.connect("Low.OUT", "Dbl.IN", None).unwrap_err();
    assert_eq!(err.code(), "E108");
}

#[test]
fn test_validator_rejects_initial_value() {
    struct Typed;
    impl Component for Typed {
        fn info(&self) -> ComponentInfo {
            ComponentInfo::new("Typed").with_port(
                PortSpec::input("COUNT").with_validator(JsonTypeValidator::new(JsonKind::Int)),
            )
        }
        fn execute<'a>(&'a mut self, _ctx: &'a Context<'a>) -> ComponentFuture<'a> {
            Box::pin(async { Ok(()) })
        }
    }

    let mut network = Network::new();
    network.add("Typed", Typed).unwrap();
    let err = network.initialize("three", "Typed.COUNT").unwrap_err();
    assert_eq!(err.code(), "E113");
    network.initialize(3, "Typed.COUNT").unwrap();
}

#[tokio::test]
async fn test_invalid_config_is_rejected_at_start() {
    let mut network = Network::with_config(NetworkConfig::default().with_default_capacity(0));
    let err = network.go().await.unwrap_err();
    assert_eq!(err.code(), "E114");
}

#[tokio::test]
async fn test_rejected_output_value_is_counted_as_dropped() {
    struct Emit;
    impl Component for Emit {
        fn info(&self) -> ComponentInfo {
            ComponentInfo::new("Emit")
                .with_port(
                    PortSpec::output("OUT").with_validator(JsonTypeValidator::new(JsonKind::Int)),
                )
                .self_starting()
        }
        fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
            Box::pin(async move {
                ctx.output("OUT")?.send_value("three").await?;
                Ok(())
            })
        }
    }

    let (sink, seen) = Recorder::new();
    let mut network = Network::new();
    network.add("Emit", Emit).unwrap();
    network.add("Show", sink).unwrap();
    network.connect("Emit.OUT", "Show.IN", None).unwrap();

    let err = network.go().await.unwrap_err();
    assert_eq!(err.code(), "E113");
    assert!(seen.lock().is_empty());

    let counters = network.counters();
    assert_eq!(counters.creates, 1);
    assert_eq!(counters.drops, 1);
}
