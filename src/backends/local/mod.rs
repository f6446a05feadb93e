// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod actions;
pub mod factory;

pub use actions::*;
pub use factory::LocalActionFactory;
