//! Multi-port receive and send patterns.
//!
//! [`InputCollection`] merges (first ready wins) or zips (one packet from
//! every member per round) a fixed set of input ports. [`OutputCollection`]
//! load-balances or forks over a fixed set of output ports.

use crate::context::Context;
use crate::error::Result;
use crate::packet::Packet;
use crate::port::{InputHandle, OutputHandle};
use crate::scheduler::RunnerState;
use tracing::debug;

/// A fixed set of input ports received from together.
#[derive(Debug)]
pub struct InputCollection<'c> {
    ctx: &'c Context<'c>,
    members: Vec<InputHandle<'c>>,
}

impl<'c> InputCollection<'c> {
    /// Group `members` under the calling component's context.
    pub fn new(ctx: &'c Context<'c>, members: Vec<InputHandle<'c>>) -> Self {
        Self { ctx, members }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the collection has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Get a member by position.
    pub fn get(&self, index: usize) -> Option<&InputHandle<'c>> {
        self.members.get(index)
    }

    /// Iterate over the members.
    pub fn iter(&self) -> impl Iterator<Item = &InputHandle<'c>> {
        self.members.iter()
    }

    /// Check if every member has drained.
    pub fn is_drained(&self) -> bool {
        self.members.iter().all(InputHandle::is_drained)
    }

    /// Close every member.
    pub fn close(&self) {
        for member in &self.members {
            member.close();
        }
    }

    fn description(&self, pending: impl Fn(usize) -> bool) -> String {
        self.members
            .iter()
            .enumerate()
            .filter(|(i, _)| pending(*i))
            .map(|(_, m)| m.name())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn external(&self) -> bool {
        self.members.iter().any(InputHandle::is_external)
    }

    /// Wait until some member has a packet ready and return its position.
    ///
    /// Returns `None` once every member has drained.
    pub async fn next_port(&self) -> Result<Option<usize>> {
        let runner = self.ctx.runner();
        'wait: loop {
            if let Some(ready) = self.members.iter().position(InputHandle::has_data) {
                return Ok(Some(ready));
            }
            if self.is_drained() {
                return Ok(None);
            }

            let waiting_on = self.description(|i| !self.members[i].is_drained());
            let waiter = runner.suspend(RunnerState::SuspFipe, waiting_on, self.external())?;
            for member in self.members.iter().filter(|m| !m.is_drained()) {
                if !member.register_receiver(&waiter) {
                    runner.resume();
                    continue 'wait;
                }
            }
            waiter.wait().await?;
        }
    }

    /// Receive from whichever member is ready first.
    ///
    /// Returns the member's position with the packet, or `None` once every
    /// member has drained.
    pub async fn receive_any(&self) -> Result<Option<(usize, Packet)>> {
        loop {
            let Some(index) = self.next_port().await? else {
                return Ok(None);
            };
            if let Some(packet) = self.members[index].try_receive() {
                return Ok(Some((index, packet)));
            }
        }
    }

    /// Receive one packet from every member.
    ///
    /// As soon as a member that has not yet delivered this round is drained,
    /// every member is closed, packets already pulled this round are
    /// dropped, and `None` is returned. After a full round, static members
    /// are re-armed as long as some data member is still open.
    pub async fn zip(&self) -> Result<Option<Vec<Packet>>> {
        let runner = self.ctx.runner();
        let mut pulled: Vec<Option<Packet>> = self.members.iter().map(|_| None).collect();

        'round: loop {
            for (slot, member) in pulled.iter_mut().zip(&self.members) {
                if slot.is_none() {
                    *slot = member.try_receive();
                }
            }
            if pulled.iter().all(Option::is_some) {
                break;
            }

            let exhausted = pulled
                .iter()
                .zip(&self.members)
                .any(|(slot, member)| slot.is_none() && member.is_drained());
            if exhausted {
                let partial = pulled.into_iter().flatten().collect::<Vec<_>>();
                debug!(
                    component = %self.ctx.name(),
                    discarded = partial.len(),
                    "zip member drained, abandoning round"
                );
                for packet in partial {
                    self.ctx.drop(packet)?;
                }
                self.close();
                return Ok(None);
            }

            let waiting_on = self.description(|i| pulled[i].is_none());
            let waiter = runner.suspend(RunnerState::SuspFipe, waiting_on, self.external())?;
            for (slot, member) in pulled.iter().zip(&self.members) {
                if slot.is_none() && !member.register_receiver(&waiter) {
                    runner.resume();
                    continue 'round;
                }
            }
            if let Err(e) = waiter.wait().await {
                for packet in pulled.into_iter().flatten() {
                    self.ctx.drop(packet)?;
                }
                return Err(e);
            }
        }

        let round: Vec<Packet> = pulled.into_iter().flatten().collect();
        let data_open = self
            .members
            .iter()
            .any(|m| !m.is_static() && !m.is_drained());
        if data_open {
            for member in self.members.iter().filter(|m| m.is_static()) {
                member.reopen();
            }
        }
        Ok(Some(round))
    }
}

/// A fixed set of output ports sent to together.
#[derive(Debug)]
pub struct OutputCollection<'c> {
    ctx: &'c Context<'c>,
    members: Vec<OutputHandle<'c>>,
}

impl<'c> OutputCollection<'c> {
    /// Group `members` under the calling component's context.
    pub fn new(ctx: &'c Context<'c>, members: Vec<OutputHandle<'c>>) -> Self {
        Self { ctx, members }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the collection has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Get a member by position.
    pub fn get(&self, index: usize) -> Option<&OutputHandle<'c>> {
        self.members.get(index)
    }

    /// Close every member.
    pub fn close(&self) {
        for member in &self.members {
            member.close();
        }
    }

    /// Position of the member with the smallest backlog; ties go to the
    /// first one.
    pub fn least_loaded(&self) -> Option<usize> {
        self.members
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| m.backlog())
            .map(|(i, _)| i)
    }

    /// Send to the member with the smallest backlog.
    pub async fn send_balanced(&self, packet: Packet) -> Result<bool> {
        match self.least_loaded() {
            Some(index) => self.members[index].send(packet).await,
            None => {
                self.ctx.drop(packet)?;
                Ok(false)
            }
        }
    }

    /// Send a copy to every member.
    ///
    /// Returns false if any delivery failed.
    pub async fn send_forked(&self, packet: Packet) -> Result<bool> {
        let Some((last, rest)) = self.members.split_last() else {
            self.ctx.drop(packet)?;
            return Ok(false);
        };

        let mut all_delivered = true;
        for member in rest {
            let copy = self.ctx.duplicate(&packet)?;
            all_delivered &= member.send(copy).await?;
        }
        all_delivered &= last.send(packet).await?;
        Ok(all_delivered)
    }
}
