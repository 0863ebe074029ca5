//! Running a network: preparation, supervision and deadlock detection.

use super::{Entry, Network};
use crate::runner::Runner;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use rivulet_core::context::Context;
use rivulet_core::error::{Result, RivuletError};
use rivulet_core::scheduler::{RunStatus, RunTable};
use rivulet_core::shared::SharedState;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

impl Network {
    /// Run the network to completion.
    ///
    /// Counters are reset, every required port is checked before anything
    /// executes, and the call returns once every component has terminated.
    /// The first component error, or a deadlock, terminates every other
    /// component and is returned. Termination through a [`NetworkHandle`]
    /// returns `Ok(())`.
    ///
    /// [`NetworkHandle`]: super::NetworkHandle
    #[instrument(
        name = "network",
        skip(self),
        fields(network = %self.config.name, components = self.entries.len())
    )]
    pub async fn go(&mut self) -> Result<()> {
        self.config.validate()?;
        self.validate()?;

        let shared = Arc::clone(&self.shared);
        shared.reset_counters();

        let table = RunTable::new(self.config.name.clone());
        *self.active.lock() = Some(Arc::clone(&table));

        let started = Instant::now();
        info!("network starting");
        let result = self.supervise(&table, &shared, None).await;
        *self.active.lock() = None;

        let counters = shared.counters();
        match &result {
            Ok(()) => info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                sends = counters.sends,
                receives = counters.receives,
                creates = counters.creates,
                drops = counters.drops,
                "network finished"
            ),
            Err(e) => warn!(code = e.code(), error = %e, "network failed"),
        }

        match result {
            // Terminated from outside: the caller asked for it.
            Err(RivuletError::Terminated) => Ok(()),
            other => other,
        }
    }

    /// Run the network once inside the activation of a subnet component.
    ///
    /// The nested run shares the enclosing network's globals and counters,
    /// and its run table is linked to the subnet's runner so that waits on
    /// boundary ports and termination cross the boundary.
    pub async fn run_nested<'a>(&'a mut self, ctx: &'a Context<'a>) -> Result<()> {
        self.validate()?;
        let table = RunTable::nested(ctx.name(), ctx.runner());
        debug!(subnet = %ctx.name(), components = self.entries.len(), "nested network starting");
        self.supervise(&table, ctx.shared(), Some(ctx)).await
    }

    /// Check that every required port is connected or initialized.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            entry.process.ports().validate_required()?;
        }
        Ok(())
    }

    fn prepare(&self) {
        for conn in &self.connections {
            conn.open();
        }
        for entry in &self.entries {
            entry.process.reset_owned();
            entry.process.close_static_inputs();
            entry.process.open_outputs();
        }
    }

    async fn supervise<'a>(
        &'a mut self,
        table: &Arc<RunTable>,
        shared: &'a SharedState,
        parent: Option<&'a Context<'a>>,
    ) -> Result<()> {
        self.prepare();

        let network = self.config.name.clone();
        let detect = self.config.deadlock_detection;

        let mut runners: FuturesUnordered<BoxFuture<'a, (String, Result<()>)>> =
            FuturesUnordered::new();
        for entry in self.entries.iter_mut() {
            let Entry { process, component } = entry;
            let label = match parent {
                Some(ctx) => format!("{}.{}", ctx.name(), process.name()),
                None => process.name().to_string(),
            };
            let handle = table.register(label.clone());
            let runner = Runner::new(process, component.as_mut(), handle, shared, parent);
            runners.push(Box::pin(async move { (label, runner.run().await) }));
        }

        let mut first_error: Option<RivuletError> = None;
        loop {
            if detect && first_error.is_none() && !table.is_terminating() {
                if let RunStatus::Deadlocked(blocked) = table.status() {
                    let error = RivuletError::Deadlock {
                        network: network.clone(),
                        blocked,
                    };
                    warn!(error = %error, "deadlock detected, terminating");
                    first_error = Some(error);
                    table.terminate();
                }
            }

            tokio::select! {
                finished = runners.next() => match finished {
                    Some((_, Ok(()))) | Some((_, Err(RivuletError::Terminated))) => {}
                    Some((component, Err(error))) => {
                        if first_error.is_none() {
                            debug!(component = %component, "first failure, terminating network");
                            first_error = Some(error);
                            table.terminate();
                        }
                    }
                    None => break,
                },
                _ = table.changed() => {}
            }
        }

        match first_error {
            Some(error) => Err(error),
            // A nested run cut short by its parent reports the termination.
            None if table.is_terminating() => Err(RivuletError::Terminated),
            None => Ok(()),
        }
    }
}
