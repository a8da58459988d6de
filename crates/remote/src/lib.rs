// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wf-remote: message-queue adapters for launching processes and
//! broadcasting their status.
//!
//! The [`Broker`] trait is the seam for a real message broker binding; only
//! the in-memory implementation ships here.

pub mod broker;
pub mod launch;
pub mod status;

pub use broker::{Broker, InMemoryBroker, Message, RemoteError, Subscription};
pub use launch::{LaunchPublisher, LaunchRequest, LaunchSubscriber, LAUNCH_KEY};
pub use status::{
    gather_status, ProcStatus, StatusPublisher, StatusReport, StatusRequester, StatusResponder,
    STATUS_REQUEST_KEY,
};
