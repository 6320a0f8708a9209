// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Level-triggered cancellation flag.
//!
//! Cancellation is cooperative: the runner sets a reason once, and every
//! suspension point re-checks it on resume. There is no forced kill.

use parking_lot::RwLock;

use crate::errors::ScanInterrupted;
use crate::types::InterruptReason;

#[derive(Debug, Default)]
pub struct InterruptSignal {
    reason: RwLock<Option<InterruptReason>>,
}

impl InterruptSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reason if unset. Returns true when this call installed it;
    /// the first reason wins and later calls are no-ops.
    pub fn trigger(&self, reason: InterruptReason) -> bool {
        let mut slot = self.reason.write();
        if slot.is_none() {
            *slot = Some(reason);
            true
        } else {
            false
        }
    }

    pub fn reason(&self) -> Option<InterruptReason> {
        *self.reason.read()
    }

    pub fn is_set(&self) -> bool {
        self.reason.read().is_some()
    }

    /// Suspension-point check: fails with `ScanInterrupted` once a reason
    /// has been installed.
    pub fn check(&self) -> Result<(), ScanInterrupted> {
        match *self.reason.read() {
            Some(reason) => Err(ScanInterrupted::new(reason)),
            None => Ok(()),
        }
    }
}
