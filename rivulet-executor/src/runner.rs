//! Per-component driver.
//!
//! A runner turns one component instance into a cooperatively scheduled
//! future. It decides when the component is activated, checks the packet
//! custody invariant after each activation and closes the component's ports
//! once nothing more is left to do.

use crate::component_span;
use rivulet_core::context::Context;
use rivulet_core::error::{Result, RivuletError};
use rivulet_core::process::Process;
use rivulet_core::scheduler::{RunnerHandle, RunnerState};
use rivulet_core::shared::SharedState;
use rivulet_core::traits::Component;
use tracing::{Instrument, debug, error, warn};

/// Why a runner activates its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    /// Data is ready on some input.
    Input,
    /// Every input drained; the component asked for one more activation.
    MustRun,
    /// Every input drained; packets are left on the manual stack.
    Stack,
}

/// Everything one runner needs, borrowed from the network for one run.
pub(crate) struct Runner<'a> {
    process: &'a Process,
    component: &'a mut dyn Component,
    handle: RunnerHandle,
    shared: &'a SharedState,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Runner<'a> {
    pub(crate) fn new(
        process: &'a Process,
        component: &'a mut dyn Component,
        handle: RunnerHandle,
        shared: &'a SharedState,
        parent: Option<&'a Context<'a>>,
    ) -> Self {
        Self {
            process,
            component,
            handle,
            shared,
            parent,
        }
    }

    /// Drive the component until it terminates.
    ///
    /// Returns `Err(Terminated)` when the run was cancelled and the
    /// component's own error otherwise.
    pub(crate) async fn run(self) -> Result<()> {
        let span = component_span!(self.process.name(), self.process.type_name());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> Result<()> {
        let Self {
            process,
            component,
            handle,
            shared,
            parent,
        } = self;

        handle.set_state(RunnerState::Active);
        let ctx = Context::new(process, handle.clone(), shared, parent);
        let result = activate_loop(process, component, &ctx).await;

        let terminated = matches!(result, Err(RivuletError::Terminated)) || handle.is_terminating();
        let result = finish(process, shared, result, terminated);

        match &result {
            Ok(()) => handle.set_state(RunnerState::Terminated),
            Err(RivuletError::Terminated) => {
                debug!("component terminated by network");
                handle.set_state(RunnerState::Terminated);
            }
            Err(e) => {
                error!(code = e.code(), error = %e, "component failed");
                handle.set_state(RunnerState::Error);
            }
        }
        result
    }
}

async fn activate_loop(
    process: &Process,
    component: &mut dyn Component,
    ctx: &Context<'_>,
) -> Result<()> {
    let self_starting = process.is_self_starting() || !process.has_data_inputs();
    let mut must_run = process.is_must_run();
    let mut first = true;

    loop {
        let activation = if first && self_starting {
            Activation::Input
        } else {
            match next_activation(process, ctx, must_run).await? {
                Some(activation) => activation,
                None => break,
            }
        };
        first = false;
        if ctx.runner().is_terminating() {
            return Err(RivuletError::Terminated);
        }

        let stack_before = process.stack_len();
        process.open_static_inputs();
        component.execute(ctx).await?;

        let owned = process.owned_count();
        if owned != 0 {
            return Err(RivuletError::PacketsNotDisposed {
                component: process.name().to_string(),
                count: owned,
            });
        }

        process.close_static_inputs();
        must_run = false;

        if self_starting {
            break;
        }
        if activation == Activation::Stack && process.stack_len() >= stack_before {
            // The stack did not shrink and no input is left to feed it.
            break;
        }
        tokio::task::yield_now().await;
    }
    Ok(())
}

/// Wait for the next reason to activate, or `None` when the runner is done.
async fn next_activation(
    process: &Process,
    ctx: &Context<'_>,
    must_run: bool,
) -> Result<Option<Activation>> {
    let runner = ctx.runner();
    loop {
        if process.inputs_ready() {
            return Ok(Some(Activation::Input));
        }
        if process.inputs_drained() {
            return Ok(if must_run {
                Some(Activation::MustRun)
            } else if process.stack_len() > 0 {
                Some(Activation::Stack)
            } else {
                None
            });
        }

        let waiter = runner.suspend(RunnerState::Dormant, process.name(), false)?;
        if !process.register_dormant(&waiter) {
            runner.resume();
            continue;
        }
        waiter.wait().await?;
    }
}

/// Close every port and settle the stack.
fn finish(
    process: &Process,
    shared: &SharedState,
    result: Result<()>,
    terminated: bool,
) -> Result<()> {
    process.close_outputs();
    let discarded = process.close_inputs(shared);
    if discarded > 0 && !terminated {
        warn!(count = discarded, "discarded packets still queued on inputs");
    }

    if terminated {
        // Packets held by the cancelled activation were dropped with it.
        let held = process.owned_count();
        if held > 0 {
            shared.record_drop(held);
            process.reset_owned();
        }
    }

    let stacked = process.stack_len();
    if stacked > 0 {
        process.clear_stack(shared);
        if result.is_ok() && !terminated {
            return Err(RivuletError::StackNotEmpty {
                component: process.name().to_string(),
                count: stacked,
            });
        }
        warn!(count = stacked, "discarded packets left on stack");
    }

    if terminated {
        return Err(RivuletError::Terminated);
    }
    result
}
