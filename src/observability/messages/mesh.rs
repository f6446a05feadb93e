// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the operation mesh.
//!
//! * Linking of compute instances and their exports
//! * Pending imports and their later resolution
//! * Failures of calls that have no caller to report to
//! * Shutdown

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A compute instance was linked into the mesh.
///
/// # Log Level
/// `info!` - Topology change
///
/// # Example
/// ```
/// use the_conduit::observability::messages::mesh::InstanceLinked;
///
/// let msg = InstanceLinked {
///     instance: "billing",
///     exports: 2,
///     imports: 1,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Linked instance 'billing': 2 exports, 1 imports"
/// );
/// ```
pub struct InstanceLinked<'a> {
    pub instance: &'a str,
    pub exports: usize,
    pub imports: usize,
}

impl Display for InstanceLinked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Linked instance '{}': {} exports, {} imports",
            self.instance, self.exports, self.imports
        )
    }
}

impl StructuredLog for InstanceLinked<'_> {
    fn log(&self) {
        tracing::info!(
            instance = self.instance,
            exports = self.exports,
            imports = self.imports,
            "{}", self
        );
    }
}

/// An import could not be resolved yet and was parked.
///
/// # Log Level
/// `debug!` - Expected during staged startup
pub struct ImportPending<'a> {
    pub instance: &'a str,
    pub namespace: &'a str,
    pub operation: &'a str,
}

impl Display for ImportPending<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Import {}::{} of instance '{}' is pending",
            self.namespace, self.operation, self.instance
        )
    }
}

impl StructuredLog for ImportPending<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = self.instance,
            namespace = self.namespace,
            operation = self.operation,
            "{}", self
        );
    }
}

/// A previously pending import was bound to an export.
///
/// # Log Level
/// `debug!`
pub struct ImportResolved<'a> {
    pub instance: &'a str,
    pub namespace: &'a str,
    pub operation: &'a str,
}

impl Display for ImportResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Import {}::{} of instance '{}' resolved",
            self.namespace, self.operation, self.instance
        )
    }
}

impl StructuredLog for ImportResolved<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = self.instance,
            namespace = self.namespace,
            operation = self.operation,
            "{}", self
        );
    }
}

/// A fire-and-forget call failed after the caller had moved on.
///
/// # Log Level
/// `warn!`
pub struct FireAndForgetFailed<'a> {
    pub namespace: &'a str,
    pub operation: &'a str,
    pub error: &'a str,
}

impl Display for FireAndForgetFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Fire-and-forget call to {}::{} failed: {}",
            self.namespace, self.operation, self.error
        )
    }
}

impl StructuredLog for FireAndForgetFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            namespace = self.namespace,
            operation = self.operation,
            error = self.error,
            "{}", self
        );
    }
}

/// An instance reported an error while closing.
///
/// # Log Level
/// `error!`
pub struct InstanceCloseFailed<'a> {
    pub instance: &'a str,
    pub error: &'a str,
}

impl Display for InstanceCloseFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Instance '{}' failed to close: {}", self.instance, self.error)
    }
}

impl StructuredLog for InstanceCloseFailed<'_> {
    fn log(&self) {
        tracing::error!(instance = self.instance, error = self.error, "{}", self);
    }
}

/// The mesh finished closing every linked instance.
///
/// # Log Level
/// `info!`
pub struct MeshClosed {
    pub instances: usize,
    pub failures: usize,
}

impl Display for MeshClosed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Mesh closed {} instances ({} failures)",
            self.instances, self.failures
        )
    }
}

impl StructuredLog for MeshClosed {
    fn log(&self) {
        tracing::info!(
            instances = self.instances,
            failures = self.failures,
            "{}", self
        );
    }
}
