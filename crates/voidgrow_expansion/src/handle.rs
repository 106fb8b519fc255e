//! # Expansion Handle
//!
//! The only way into the manager from outside the world thread. Commands go
//! through a bounded crossbeam channel and are applied at the start of the
//! next tick. Sending never blocks.

use crossbeam_channel::{Sender, TrySendError};
use voidgrow_rules::RuleSet;

use crate::request::{EnqueueResult, ExpansionRequest, RejectReason};

/// Work handed to the world thread.
#[derive(Debug)]
pub enum ManagerCommand {
    /// Admit a request. Rejection is reported through the hooks.
    Enqueue(ExpansionRequest),
    /// Swap the biome rule set.
    InstallRules(RuleSet),
    /// Change the copy budget.
    SetLayersPerTick(u32),
}

/// Cloneable, `Send` handle to an `ExpansionManager`.
#[derive(Clone, Debug)]
pub struct ExpansionHandle {
    sender: Sender<ManagerCommand>,
}

impl ExpansionHandle {
    pub(crate) fn new(sender: Sender<ManagerCommand>) -> Self {
        Self { sender }
    }

    /// Hands a request to the world thread.
    ///
    /// `Accepted` only means the request was delivered; admission happens
    /// on the world thread and a rejection there reaches the requester via
    /// `ExpansionHooks::notify_requester`.
    pub fn enqueue(&self, request: ExpansionRequest) -> EnqueueResult {
        match self.send(ManagerCommand::Enqueue(request)) {
            Ok(()) => EnqueueResult::Accepted,
            Err(reason) => {
                tracing::debug!("Expansion request dropped at the inbox: {reason}");
                EnqueueResult::Rejected(reason)
            }
        }
    }

    /// Installs a new rule set before the next tick's work.
    ///
    /// # Errors
    ///
    /// Returns `InboxFull` or `Shutdown` if the command was not delivered.
    pub fn install_rules(&self, rules: RuleSet) -> Result<(), RejectReason> {
        self.send(ManagerCommand::InstallRules(rules))
    }

    /// Changes the number of layers copied per tick (clamped to at least 1).
    ///
    /// # Errors
    ///
    /// Returns `InboxFull` or `Shutdown` if the command was not delivered.
    pub fn set_layers_per_tick(&self, layers: u32) -> Result<(), RejectReason> {
        self.send(ManagerCommand::SetLayersPerTick(layers))
    }

    fn send(&self, command: ManagerCommand) -> Result<(), RejectReason> {
        self.sender.try_send(command).map_err(|err| match err {
            TrySendError::Full(_) => RejectReason::InboxFull,
            TrySendError::Disconnected(_) => RejectReason::Shutdown,
        })
    }
}
