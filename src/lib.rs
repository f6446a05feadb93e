// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // built-in actions
pub mod config;     // config documents + runtime builder
pub mod engine;     // pipeline executor
pub mod errors;     // error handling
pub mod mesh;       // operation mesh between compute instances
pub mod observability;
pub mod resilience; // timeouts, retries, circuit breakers
pub mod traits;     // unified abstractions
