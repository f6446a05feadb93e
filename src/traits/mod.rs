// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod action;
pub mod compute;

pub use action::{Action, ActionFactory, Dependencies};
pub use compute::ComputeInstance;
