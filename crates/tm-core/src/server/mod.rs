//! Process-data server abstraction.
//!
//! The replay engine only needs a small capability surface from the server:
//! bind an endpoint, register a namespace, create one object holding
//! writable variables, start/stop serving, and set variable values. Any
//! conforming implementation (the in-memory [`AddressSpaceServer`], a
//! network-backed server, or a test double) can be plugged in.

pub mod memory;

pub use memory::{AddressSpaceReader, AddressSpaceServer, NodeSnapshot};

use std::fmt;

use thiserror::Error;
use tm_common::{Value, ValueKind};
use tm_config::Endpoint;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

handle!(
    /// Opaque reference to a created server instance.
    ServerHandle,
    "server#"
);
handle!(
    /// Index of a registered namespace.
    NamespaceId,
    "ns="
);
handle!(
    /// Opaque reference to an object node.
    ObjectHandle,
    "object#"
);
handle!(
    /// Opaque reference to a single addressable variable node.
    VariableHandle,
    "variable#"
);

/// Errors reported by a server implementation.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown server handle {0}")]
    UnknownServer(ServerHandle),

    #[error("unknown namespace {0}")]
    UnknownNamespace(NamespaceId),

    #[error("unknown object handle {0}")]
    UnknownObject(ObjectHandle),

    #[error("variable '{name}' already exists under {object}")]
    DuplicateVariable { object: ObjectHandle, name: String },

    #[error("stale variable handle {0}")]
    StaleHandle(VariableHandle),

    #[error("variable {handle} is read-only")]
    NotWritable { handle: VariableHandle },

    #[error("type mismatch on {handle}: node is {expected}, value is {actual}")]
    TypeMismatch {
        handle: VariableHandle,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("server failure: {0}")]
    Other(String),
}

impl ServerError {
    /// Whether this is a per-variable write failure that a replay tolerates.
    pub fn is_write_error(&self) -> bool {
        matches!(
            self,
            ServerError::StaleHandle(_)
                | ServerError::NotWritable { .. }
                | ServerError::TypeMismatch { .. }
        )
    }
}

/// Capability surface the replay engine drives.
///
/// Methods take `&self`; implementations that mutate shared state use
/// interior mutability so clients can keep reading while the engine writes.
pub trait ProtocolServer {
    /// Create a server bound to `endpoint`.
    fn create_server(&self, endpoint: &Endpoint, name: &str) -> Result<ServerHandle, ServerError>;

    /// Register (or look up) a namespace URI.
    fn register_namespace(&self, server: ServerHandle, uri: &str)
        -> Result<NamespaceId, ServerError>;

    /// Create an object node under the server's objects folder.
    fn create_object(
        &self,
        server: ServerHandle,
        namespace: NamespaceId,
        name: &str,
    ) -> Result<ObjectHandle, ServerError>;

    /// Create a variable under `object`. The node is writable afterwards and
    /// its declared type is the kind of `initial`.
    fn create_variable(
        &self,
        object: ObjectHandle,
        namespace: NamespaceId,
        name: &str,
        initial: Value,
    ) -> Result<VariableHandle, ServerError>;

    /// Start serving. No-op when already running.
    fn start(&self, server: ServerHandle) -> Result<(), ServerError>;

    /// Stop serving. No-op when not running.
    fn stop(&self, server: ServerHandle) -> Result<(), ServerError>;

    /// Write a variable's current value.
    fn set_value(&self, variable: VariableHandle, value: Value) -> Result<(), ServerError>;
}

impl<T: ProtocolServer + ?Sized> ProtocolServer for &T {
    fn create_server(&self, endpoint: &Endpoint, name: &str) -> Result<ServerHandle, ServerError> {
        (**self).create_server(endpoint, name)
    }

    fn register_namespace(
        &self,
        server: ServerHandle,
        uri: &str,
    ) -> Result<NamespaceId, ServerError> {
        (**self).register_namespace(server, uri)
    }

    fn create_object(
        &self,
        server: ServerHandle,
        namespace: NamespaceId,
        name: &str,
    ) -> Result<ObjectHandle, ServerError> {
        (**self).create_object(server, namespace, name)
    }

    fn create_variable(
        &self,
        object: ObjectHandle,
        namespace: NamespaceId,
        name: &str,
        initial: Value,
    ) -> Result<VariableHandle, ServerError> {
        (**self).create_variable(object, namespace, name, initial)
    }

    fn start(&self, server: ServerHandle) -> Result<(), ServerError> {
        (**self).start(server)
    }

    fn stop(&self, server: ServerHandle) -> Result<(), ServerError> {
        (**self).stop(server)
    }

    fn set_value(&self, variable: VariableHandle, value: Value) -> Result<(), ServerError> {
        (**self).set_value(variable, value)
    }
}
