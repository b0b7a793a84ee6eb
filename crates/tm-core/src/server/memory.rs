//! In-memory address space implementing [`ProtocolServer`].
//!
//! `create_server` reserves the endpoint by binding a TCP listener so that
//! two replays cannot claim the same address; the listener is released on
//! `stop`. Node values live in a shared address space that
//! [`AddressSpaceReader`] handles can browse while the engine writes.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tm_common::{Value, ValueKind};
use tm_config::Endpoint;
use tracing::{debug, info};

use super::{
    NamespaceId, ObjectHandle, ProtocolServer, ServerError, ServerHandle, VariableHandle,
};

/// Namespace 0 is reserved for the protocol's base nodes.
pub const BASE_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

#[derive(Debug)]
struct ServerNode {
    name: String,
    endpoint_url: String,
    listener: Option<TcpListener>,
    running: bool,
    namespaces: Vec<String>,
}

#[derive(Debug)]
struct ObjectNode {
    server: ServerHandle,
    namespace: NamespaceId,
    name: String,
    variables: Vec<VariableHandle>,
}

#[derive(Debug)]
struct VariableNode {
    namespace: NamespaceId,
    name: String,
    kind: ValueKind,
    writable: bool,
    value: Value,
    writes: u64,
}

#[derive(Debug, Default)]
struct AddressSpace {
    servers: Vec<ServerNode>,
    objects: Vec<ObjectNode>,
    variables: HashMap<VariableHandle, VariableNode>,
    next_variable: u32,
}

impl AddressSpace {
    fn server(&self, handle: ServerHandle) -> Result<&ServerNode, ServerError> {
        self.servers
            .get(handle.0 as usize)
            .ok_or(ServerError::UnknownServer(handle))
    }

    fn server_mut(&mut self, handle: ServerHandle) -> Result<&mut ServerNode, ServerError> {
        self.servers
            .get_mut(handle.0 as usize)
            .ok_or(ServerError::UnknownServer(handle))
    }

    fn snapshot(&self, object: &ObjectNode) -> Vec<NodeSnapshot> {
        object
            .variables
            .iter()
            .filter_map(|handle| {
                self.variables.get(handle).map(|node| NodeSnapshot {
                    handle: *handle,
                    name: node.name.clone(),
                    namespace: node.namespace,
                    kind: node.kind,
                    writable: node.writable,
                    value: node.value.clone(),
                    writes: node.writes,
                })
            })
            .collect()
    }
}

/// A point-in-time copy of one variable node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    #[serde(skip)]
    pub handle: VariableHandle,
    pub name: String,
    #[serde(skip)]
    pub namespace: NamespaceId,
    pub kind: ValueKind,
    pub writable: bool,
    pub value: Value,
    pub writes: u64,
}

/// Shared, in-process address space.
#[derive(Debug, Clone, Default)]
pub struct AddressSpaceServer {
    space: Arc<Mutex<AddressSpace>>,
}

fn lock(space: &Mutex<AddressSpace>) -> MutexGuard<'_, AddressSpace> {
    // Poison is ignored: every mutation replaces whole node values.
    space.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AddressSpaceServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view for clients.
    pub fn reader(&self) -> AddressSpaceReader {
        AddressSpaceReader {
            space: Arc::clone(&self.space),
        }
    }

    /// Toggle whether clients and the engine may write a variable.
    pub fn set_writable(&self, variable: VariableHandle, writable: bool) -> Result<(), ServerError> {
        let mut space = lock(&self.space);
        let node = space
            .variables
            .get_mut(&variable)
            .ok_or(ServerError::StaleHandle(variable))?;
        node.writable = writable;
        Ok(())
    }

    /// Delete a variable node. Existing handles to it become stale.
    pub fn remove_variable(&self, variable: VariableHandle) -> bool {
        let mut space = lock(&self.space);
        let removed = space.variables.remove(&variable).is_some();
        if removed {
            for object in &mut space.objects {
                object.variables.retain(|h| *h != variable);
            }
        }
        removed
    }
}

impl ProtocolServer for AddressSpaceServer {
    fn create_server(&self, endpoint: &Endpoint, name: &str) -> Result<ServerHandle, ServerError> {
        let address = endpoint.to_string();
        let listener =
            TcpListener::bind(address.as_str()).map_err(|source| ServerError::Bind {
                endpoint: address.clone(),
                source,
            })?;
        let port = listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or_else(|_| endpoint.port());
        let endpoint_url = format!("opc.tcp://{}:{}", endpoint.host(), port);

        let mut space = lock(&self.space);
        let handle = ServerHandle(space.servers.len() as u32);
        space.servers.push(ServerNode {
            name: name.to_string(),
            endpoint_url: endpoint_url.clone(),
            listener: Some(listener),
            running: false,
            namespaces: vec![BASE_NAMESPACE_URI.to_string()],
        });
        info!(%handle, %endpoint_url, name, "server created");
        Ok(handle)
    }

    fn register_namespace(
        &self,
        server: ServerHandle,
        uri: &str,
    ) -> Result<NamespaceId, ServerError> {
        let mut space = lock(&self.space);
        let node = space.server_mut(server)?;
        if let Some(index) = node.namespaces.iter().position(|u| u == uri) {
            return Ok(NamespaceId(index as u32));
        }
        node.namespaces.push(uri.to_string());
        let id = NamespaceId((node.namespaces.len() - 1) as u32);
        debug!(%server, %id, uri, "namespace registered");
        Ok(id)
    }

    fn create_object(
        &self,
        server: ServerHandle,
        namespace: NamespaceId,
        name: &str,
    ) -> Result<ObjectHandle, ServerError> {
        let mut space = lock(&self.space);
        if space.server(server)?.namespaces.len() <= namespace.0 as usize {
            return Err(ServerError::UnknownNamespace(namespace));
        }
        let handle = ObjectHandle(space.objects.len() as u32);
        space.objects.push(ObjectNode {
            server,
            namespace,
            name: name.to_string(),
            variables: Vec::new(),
        });
        debug!(%handle, %namespace, name, "object created");
        Ok(handle)
    }

    fn create_variable(
        &self,
        object: ObjectHandle,
        namespace: NamespaceId,
        name: &str,
        initial: Value,
    ) -> Result<VariableHandle, ServerError> {
        let mut space = lock(&self.space);
        let server = space
            .objects
            .get(object.0 as usize)
            .ok_or(ServerError::UnknownObject(object))?
            .server;
        if space.server(server)?.namespaces.len() <= namespace.0 as usize {
            return Err(ServerError::UnknownNamespace(namespace));
        }
        let duplicate = space.objects[object.0 as usize]
            .variables
            .iter()
            .any(|h| space.variables.get(h).is_some_and(|n| n.name == name));
        if duplicate {
            return Err(ServerError::DuplicateVariable {
                object,
                name: name.to_string(),
            });
        }
        let kind = initial.kind().ok_or_else(|| {
            ServerError::Other(format!("variable '{name}' needs a typed initial value"))
        })?;

        let handle = VariableHandle(space.next_variable);
        space.next_variable += 1;
        space.variables.insert(
            handle,
            VariableNode {
                namespace,
                name: name.to_string(),
                kind,
                writable: true,
                value: initial,
                writes: 0,
            },
        );
        space.objects[object.0 as usize].variables.push(handle);
        debug!(%handle, %object, name, %kind, "variable created");
        Ok(handle)
    }

    fn start(&self, server: ServerHandle) -> Result<(), ServerError> {
        let mut space = lock(&self.space);
        let node = space.server_mut(server)?;
        if !node.running {
            node.running = true;
            info!(%server, endpoint_url = %node.endpoint_url, "server started");
        }
        Ok(())
    }

    fn stop(&self, server: ServerHandle) -> Result<(), ServerError> {
        let mut space = lock(&self.space);
        let node = space.server_mut(server)?;
        if node.running {
            node.running = false;
            node.listener = None;
            info!(%server, "server stopped");
        }
        Ok(())
    }

    fn set_value(&self, variable: VariableHandle, value: Value) -> Result<(), ServerError> {
        let mut space = lock(&self.space);
        let node = space
            .variables
            .get_mut(&variable)
            .ok_or(ServerError::StaleHandle(variable))?;
        if !node.writable {
            return Err(ServerError::NotWritable { handle: variable });
        }
        if let Some(actual) = value.kind() {
            if !node.kind.accepts(&value) {
                return Err(ServerError::TypeMismatch {
                    handle: variable,
                    expected: node.kind,
                    actual,
                });
            }
        }
        node.value = value.coerce(node.kind);
        node.writes += 1;
        Ok(())
    }
}

/// Client-side view of an [`AddressSpaceServer`].
#[derive(Debug, Clone)]
pub struct AddressSpaceReader {
    space: Arc<Mutex<AddressSpace>>,
}

impl AddressSpaceReader {
    pub fn is_running(&self, server: ServerHandle) -> bool {
        lock(&self.space)
            .server(server)
            .map(|s| s.running)
            .unwrap_or(false)
    }

    /// `opc.tcp://host:port` the server advertises.
    pub fn endpoint_url(&self, server: ServerHandle) -> Option<String> {
        lock(&self.space)
            .server(server)
            .ok()
            .map(|s| s.endpoint_url.clone())
    }

    pub fn server_name(&self, server: ServerHandle) -> Option<String> {
        lock(&self.space).server(server).ok().map(|s| s.name.clone())
    }

    pub fn namespace_index(&self, server: ServerHandle, uri: &str) -> Option<NamespaceId> {
        lock(&self.space).server(server).ok().and_then(|s| {
            s.namespaces
                .iter()
                .position(|u| u == uri)
                .map(|i| NamespaceId(i as u32))
        })
    }

    /// Names of all objects, in creation order.
    pub fn objects(&self) -> Vec<String> {
        lock(&self.space)
            .objects
            .iter()
            .map(|o| o.name.clone())
            .collect()
    }

    /// Variables of the first object named `object`, in creation order.
    pub fn browse(&self, object: &str) -> Option<Vec<NodeSnapshot>> {
        let space = lock(&self.space);
        space
            .objects
            .iter()
            .find(|o| o.name == object)
            .map(|o| space.snapshot(o))
    }

    /// Current value of `object.variable`.
    pub fn read(&self, object: &str, variable: &str) -> Option<Value> {
        self.browse(object)?
            .into_iter()
            .find(|n| n.name == variable)
            .map(|n| n.value)
    }

    /// Namespace of the first object named `object`.
    pub fn object_namespace(&self, object: &str) -> Option<NamespaceId> {
        lock(&self.space)
            .objects
            .iter()
            .find(|o| o.name == object)
            .map(|o| o.namespace)
    }
}
