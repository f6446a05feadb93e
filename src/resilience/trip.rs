// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trip predicates: pure functions from breaker counters to "open the circuit now".
//!
//! Configuration uses a small expression language:
//!
//! ```text
//! consecutiveFailures > 5
//! totalFailures >= 10 && requests >= 20 || consecutiveFailures > 3
//! ```
//!
//! A clause is `<counter> <op> <integer>`. `&&` binds tighter than `||`.

use super::circuit_breaker::Counts;
use crate::errors::ConfigError;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub const DEFAULT_TRIP_EXPRESSION: &str = "consecutiveFailures > 5";

type Evaluator = Arc<dyn Fn(&Counts) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct TripPredicate {
    source: String,
    eval: Evaluator,
}

impl TripPredicate {
    /// Build a predicate from an arbitrary function of the counters.
    pub fn new<F>(description: impl Into<String>, eval: F) -> Self
    where
        F: Fn(&Counts) -> bool + Send + Sync + 'static,
    {
        Self {
            source: description.into(),
            eval: Arc::new(eval),
        }
    }

    /// Compile a trip expression.
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTripExpression {
            expression: expression.to_string(),
            reason,
        };

        let mut alternatives = Vec::new();
        for alternative in expression.split("||") {
            let mut clauses = Vec::new();
            for clause in alternative.split("&&") {
                clauses.push(Clause::parse(clause).map_err(&invalid)?);
            }
            alternatives.push(clauses);
        }

        Ok(Self {
            source: expression.trim().to_string(),
            eval: Arc::new(move |counts| {
                alternatives
                    .iter()
                    .any(|clauses| clauses.iter().all(|clause| clause.holds(counts)))
            }),
        })
    }

    pub fn evaluate(&self, counts: &Counts) -> bool {
        (self.eval)(counts)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for TripPredicate {
    fn default() -> Self {
        let clause = Clause {
            counter: Counter::ConsecutiveFailures,
            op: Comparison::Gt,
            value: 5,
        };
        Self {
            source: DEFAULT_TRIP_EXPRESSION.to_string(),
            eval: Arc::new(move |counts| clause.holds(counts)),
        }
    }
}

impl Debug for TripPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TripPredicate").field(&self.source).finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Counter {
    Requests,
    TotalSuccesses,
    TotalFailures,
    ConsecutiveSuccesses,
    ConsecutiveFailures,
}

impl Counter {
    fn read(self, counts: &Counts) -> u32 {
        match self {
            Counter::Requests => counts.requests,
            Counter::TotalSuccesses => counts.total_successes,
            Counter::TotalFailures => counts.total_failures,
            Counter::ConsecutiveSuccesses => counts.consecutive_successes,
            Counter::ConsecutiveFailures => counts.consecutive_failures,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

// Two-character operators first so ">=" is not read as ">".
const OPERATORS: [(&str, Comparison); 6] = [
    (">=", Comparison::Ge),
    ("<=", Comparison::Le),
    ("==", Comparison::Eq),
    ("!=", Comparison::Ne),
    (">", Comparison::Gt),
    ("<", Comparison::Lt),
];

#[derive(Debug, Clone, Copy)]
struct Clause {
    counter: Counter,
    op: Comparison,
    value: u32,
}

impl Clause {
    fn parse(text: &str) -> Result<Self, String> {
        let (position, token, op) = OPERATORS
            .iter()
            .find_map(|(token, op)| text.find(token).map(|position| (position, *token, *op)))
            .ok_or_else(|| format!("clause {:?} has no comparison operator", text.trim()))?;

        let name = text[..position].trim();
        let literal = text[position + token.len()..].trim();

        let counter = match name {
            "requests" => Counter::Requests,
            "totalSuccesses" => Counter::TotalSuccesses,
            "totalFailures" => Counter::TotalFailures,
            "consecutiveSuccesses" => Counter::ConsecutiveSuccesses,
            "consecutiveFailures" => Counter::ConsecutiveFailures,
            other => return Err(format!("unknown counter {other:?}")),
        };
        let value = literal
            .parse()
            .map_err(|_| format!("expected an integer, found {literal:?}"))?;

        Ok(Self { counter, op, value })
    }

    fn holds(&self, counts: &Counts) -> bool {
        let actual = self.counter.read(counts);
        match self.op {
            Comparison::Gt => actual > self.value,
            Comparison::Ge => actual >= self.value,
            Comparison::Lt => actual < self.value,
            Comparison::Le => actual <= self.value,
            Comparison::Eq => actual == self.value,
            Comparison::Ne => actual != self.value,
        }
    }
}
