// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Registry Module
 * Check registration and dependency-ordered planning
 * © 2026 Bountyy Oy
 */

pub mod check_registry;

pub use check_registry::{CheckRegistry, ScanPlan};
