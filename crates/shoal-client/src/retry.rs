/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The shared retry budget.
//!
//! One budget is created per transfer and cloned into every worker, so the
//! number of retries is bounded globally rather than per part.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A monotonic retry counter with a fixed ceiling, shared across the workers
/// of a single transfer.
#[derive(Debug, Clone, Default)]
pub struct RetryBudget {
    used: Arc<AtomicU32>,
    limit: u32,
}

impl RetryBudget {
    /// Creates a budget allowing at most `limit` retries in total.
    pub fn new(limit: u32) -> Self {
        Self {
            used: Arc::new(AtomicU32::new(0)),
            limit,
        }
    }

    /// Consumes one retry. Returns `false` when the budget is exhausted; the
    /// failed attempt must then surface its error.
    pub fn try_consume(&self) -> bool {
        self.used.fetch_add(1, Ordering::SeqCst) + 1 <= self.limit
    }

    /// Number of retries consumed so far.
    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst).min(self.limit)
    }

    /// The configured ceiling.
    pub fn limit(&self) -> u32 {
        self.limit
    }
}
