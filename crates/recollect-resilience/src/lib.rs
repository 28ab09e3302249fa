// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for calls to external providers.

pub mod circuit_breaker;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
