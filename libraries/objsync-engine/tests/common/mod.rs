//! In-memory storage cluster and resolver shared by the engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, StreamExt};
use objsync_core::{
    AccountInfo, ClusterSide, ContainerInfo, ContainerPage, ContainerRecord, EndpointResolver,
    ErrorKind, Metadata, MetadataUpdate, ObjectPage, ObjectRecord, Result, StorageClient,
    StorageEndpoint, StoredObject, SyncError, Tenant, TenantSession,
};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const ORIGIN_PREFIX: &str = "http://origin:8080/v1/AUTH_";
pub const DESTINATION_PREFIX: &str = "http://dest:8080/v1/AUTH_";

pub fn origin(tenant_id: &str) -> StorageEndpoint {
    StorageEndpoint::new(ClusterSide::Origin, format!("{ORIGIN_PREFIX}{tenant_id}"), "otoken")
}

pub fn destination(tenant_id: &str) -> StorageEndpoint {
    StorageEndpoint::new(
        ClusterSide::Destination,
        format!("{DESTINATION_PREFIX}{tenant_id}"),
        "dtoken",
    )
}

pub fn session(tenant_id: &str) -> TenantSession {
    TenantSession::new(
        Tenant::new(tenant_id, format!("name-{tenant_id}")),
        origin(tenant_id),
        destination(tenant_id),
    )
}

// =============================================================================
// Calls
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    HeadAccount,
    PostAccount,
    ListContainers,
    HeadContainer,
    PutContainer,
    PostContainer,
    DeleteContainer,
    ListObjects,
    GetObject,
    PutObject,
    DeleteObject,
}

impl Op {
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::PostAccount
                | Self::PutContainer
                | Self::PostContainer
                | Self::DeleteContainer
                | Self::PutObject
                | Self::DeleteObject
        )
    }
}

/// One storage call as received by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub side: ClusterSide,
    pub account: String,
    /// `""` for the account, `container` or `container/object`
    pub path: String,
}

#[derive(Debug, Clone)]
struct Injection {
    op: Op,
    side: ClusterSide,
    path: String,
    kind: ErrorKind,
}

#[derive(Debug, Clone)]
struct Delay {
    op: Op,
    path: Option<String>,
    duration: Duration,
}

// =============================================================================
// Cluster state
// =============================================================================

/// Chunk size of bodies served by `get_object`
pub const BODY_CHUNK: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct FakeObject {
    pub content: Bytes,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub metadata: Metadata,
}

impl FakeObject {
    pub fn len(&self) -> usize {
        self.content.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeContainer {
    pub info: ContainerInfo,
    pub objects: BTreeMap<String, FakeObject>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeAccount {
    pub metadata: Metadata,
    pub containers: BTreeMap<String, FakeContainer>,
}

/// Both clusters in one map keyed by account URL.
pub struct FakeCluster {
    accounts: Mutex<BTreeMap<String, FakeAccount>>,
    calls: Mutex<Vec<Call>>,
    injections: Mutex<Vec<Injection>>,
    delays: Mutex<Vec<Delay>>,
    received_chunks: Mutex<Vec<(String, usize)>>,
    page_size: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn etag_of(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl FakeCluster {
    /// Listings come back two entries per page so every test pages.
    pub fn new() -> Self {
        Self::with_page_size(2)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            accounts: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            injections: Mutex::new(Vec::new()),
            delays: Mutex::new(Vec::new()),
            received_chunks: Mutex::new(Vec::new()),
            page_size,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    // ---- seeding -----------------------------------------------------------

    pub fn add_container(&self, endpoint: &StorageEndpoint, container: &str) {
        self.accounts
            .lock()
            .unwrap()
            .entry(endpoint.base_url.clone())
            .or_default()
            .containers
            .entry(container.to_string())
            .or_default();
    }

    pub fn add_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
        body: &str,
    ) {
        let data = FakeObject {
            content: Bytes::from(body.to_string()),
            content_type: Some("text/plain".to_string()),
            etag: Some(etag_of(body.as_bytes())),
            metadata: Metadata::new(),
        };
        self.accounts
            .lock()
            .unwrap()
            .entry(endpoint.base_url.clone())
            .or_default()
            .containers
            .entry(container.to_string())
            .or_default()
            .objects
            .insert(object.to_string(), data);
    }

    pub fn set_container_meta(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        key: &str,
        value: &str,
    ) {
        self.accounts
            .lock()
            .unwrap()
            .entry(endpoint.base_url.clone())
            .or_default()
            .containers
            .entry(container.to_string())
            .or_default()
            .info
            .metadata
            .insert(key.to_lowercase(), value.to_string());
    }

    pub fn set_read_acl(&self, endpoint: &StorageEndpoint, container: &str, acl: &str) {
        self.accounts
            .lock()
            .unwrap()
            .entry(endpoint.base_url.clone())
            .or_default()
            .containers
            .entry(container.to_string())
            .or_default()
            .info
            .read_acl = Some(acl.to_string());
    }

    pub fn set_account_meta(&self, endpoint: &StorageEndpoint, key: &str, value: &str) {
        self.accounts
            .lock()
            .unwrap()
            .entry(endpoint.base_url.clone())
            .or_default()
            .metadata
            .insert(key.to_lowercase(), value.to_string());
    }

    /// Remove a container and its objects without going through the client.
    pub fn drop_container(&self, endpoint: &StorageEndpoint, container: &str) {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&endpoint.base_url) {
            account.containers.remove(container);
        }
    }

    // ---- fault injection ---------------------------------------------------

    /// Every `op` on `side` addressed to `path` fails with `kind`.
    pub fn fail(&self, op: Op, side: ClusterSide, path: &str, kind: ErrorKind) {
        self.injections.lock().unwrap().push(Injection {
            op,
            side,
            path: path.to_string(),
            kind,
        });
    }

    pub fn clear_failures(&self) {
        self.injections.lock().unwrap().clear();
    }

    /// Every `op` (optionally only on `path`) takes `duration` to answer.
    pub fn delay(&self, op: Op, path: Option<&str>, duration: Duration) {
        self.delays.lock().unwrap().push(Delay {
            op,
            path: path.map(str::to_string),
            duration,
        });
    }

    // ---- inspection --------------------------------------------------------

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, op: Op) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op.is_write()).collect()
    }

    pub fn writes_to(&self, side: ClusterSide) -> Vec<Call> {
        self.writes().into_iter().filter(|c| c.side == side).collect()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// `container/object` of every PUT with the number of body chunks it read
    pub fn received_chunks(&self) -> Vec<(String, usize)> {
        self.received_chunks.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn account(&self, endpoint: &StorageEndpoint) -> FakeAccount {
        self.accounts
            .lock()
            .unwrap()
            .get(&endpoint.base_url)
            .cloned()
            .unwrap_or_default()
    }

    pub fn container_names(&self, endpoint: &StorageEndpoint) -> Vec<String> {
        self.account(endpoint).containers.keys().cloned().collect()
    }

    pub fn container(&self, endpoint: &StorageEndpoint, container: &str) -> Option<FakeContainer> {
        self.account(endpoint).containers.get(container).cloned()
    }

    /// Object names with their etags
    pub fn objects(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
    ) -> Vec<(String, Option<String>)> {
        self.container(endpoint, container)
            .map(|c| {
                c.objects
                    .iter()
                    .map(|(name, data)| (name.clone(), data.etag.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ---- call plumbing -----------------------------------------------------

    async fn enter(&self, op: Op, endpoint: &StorageEndpoint, path: &str) -> Result<InFlight<'_>> {
        self.calls.lock().unwrap().push(Call {
            op,
            side: endpoint.side,
            account: endpoint.base_url.clone(),
            path: path.to_string(),
        });
        let guard = InFlight::enter(&self.in_flight, &self.peak_in_flight);

        let delay = self
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.op == op && d.path.as_deref().map_or(true, |p| p == path))
            .map(|d| d.duration);
        if let Some(duration) = delay {
            tokio::time::sleep(duration).await;
        }

        let injected = self
            .injections
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.op == op && i.side == endpoint.side && i.path == path)
            .map(|i| i.kind);
        if let Some(kind) = injected {
            return Err(injected_error(kind, path));
        }

        Ok(guard)
    }
}

fn injected_error(kind: ErrorKind, path: &str) -> SyncError {
    match kind {
        ErrorKind::Auth => SyncError::auth(format!("{path}: token rejected")),
        ErrorKind::NotFound => SyncError::not_found("Item", path),
        ErrorKind::Conflict => SyncError::conflict(format!("{path}: 409")),
        _ => SyncError::transport(format!("{path}: connection reset")),
    }
}

struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

fn object_path(container: &str, object: &str) -> String {
    format!("{container}/{object}")
}

#[async_trait]
impl StorageClient for FakeCluster {
    async fn head_account(&self, endpoint: &StorageEndpoint) -> Result<AccountInfo> {
        let _call = self.enter(Op::HeadAccount, endpoint, "").await?;
        let account = self.account(endpoint);
        Ok(AccountInfo {
            container_count: account.containers.len() as u64,
            object_count: account
                .containers
                .values()
                .map(|c| c.objects.len() as u64)
                .sum(),
            bytes_used: account
                .containers
                .values()
                .flat_map(|c| c.objects.values())
                .map(|o| o.len() as u64)
                .sum(),
            metadata: account.metadata,
        })
    }

    async fn post_account(
        &self,
        endpoint: &StorageEndpoint,
        update: &MetadataUpdate,
    ) -> Result<()> {
        let _call = self.enter(Op::PostAccount, endpoint, "").await?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.entry(endpoint.base_url.clone()).or_default();
        apply_update(&mut account.metadata, update);
        Ok(())
    }

    async fn list_containers(
        &self,
        endpoint: &StorageEndpoint,
        marker: Option<&str>,
    ) -> Result<ContainerPage> {
        let _call = self.enter(Op::ListContainers, endpoint, "").await?;
        let account = self.account(endpoint);
        let containers = account
            .containers
            .iter()
            .filter(|(name, _)| marker.map_or(true, |m| name.as_str() > m))
            .take(self.page_size)
            .map(|(name, c)| ContainerRecord {
                name: name.clone(),
                object_count: c.objects.len() as u64,
                bytes_used: c.objects.values().map(|o| o.len() as u64).sum(),
            })
            .collect();
        Ok(ContainerPage {
            account: AccountInfo {
                container_count: account.containers.len() as u64,
                metadata: account.metadata.clone(),
                ..AccountInfo::default()
            },
            containers,
        })
    }

    async fn head_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
    ) -> Result<ContainerInfo> {
        let _call = self.enter(Op::HeadContainer, endpoint, container).await?;
        let found = self
            .container(endpoint, container)
            .ok_or_else(|| SyncError::not_found("Container", container))?;
        Ok(ContainerInfo {
            object_count: found.objects.len() as u64,
            bytes_used: found.objects.values().map(|o| o.len() as u64).sum(),
            ..found.info
        })
    }

    async fn put_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        info: &ContainerInfo,
    ) -> Result<()> {
        let _call = self.enter(Op::PutContainer, endpoint, container).await?;
        let mut accounts = self.accounts.lock().unwrap();
        let entry = accounts
            .entry(endpoint.base_url.clone())
            .or_default()
            .containers
            .entry(container.to_string())
            .or_default();
        entry.info.metadata.extend(info.metadata.clone());
        entry.info.read_acl = info.read_acl.clone();
        entry.info.write_acl = info.write_acl.clone();
        Ok(())
    }

    async fn post_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        update: &MetadataUpdate,
    ) -> Result<()> {
        let _call = self.enter(Op::PostContainer, endpoint, container).await?;
        let mut accounts = self.accounts.lock().unwrap();
        let entry = accounts
            .get_mut(&endpoint.base_url)
            .and_then(|a| a.containers.get_mut(container))
            .ok_or_else(|| SyncError::not_found("Container", container))?;
        apply_update(&mut entry.info.metadata, update);
        if let Some(acl) = &update.read_acl {
            entry.info.read_acl = Some(acl.clone()).filter(|a| !a.is_empty());
        }
        if let Some(acl) = &update.write_acl {
            entry.info.write_acl = Some(acl.clone()).filter(|a| !a.is_empty());
        }
        Ok(())
    }

    async fn delete_container(&self, endpoint: &StorageEndpoint, container: &str) -> Result<()> {
        let _call = self.enter(Op::DeleteContainer, endpoint, container).await?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(&endpoint.base_url)
            .ok_or_else(|| SyncError::not_found("Container", container))?;
        match account.containers.get(container) {
            None => Err(SyncError::not_found("Container", container)),
            Some(c) if !c.objects.is_empty() => {
                Err(SyncError::conflict(format!("{container}: 409 container not empty")))
            }
            Some(_) => {
                account.containers.remove(container);
                Ok(())
            }
        }
    }

    async fn list_objects(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        marker: Option<&str>,
    ) -> Result<ObjectPage> {
        let _call = self.enter(Op::ListObjects, endpoint, container).await?;
        let found = self
            .container(endpoint, container)
            .ok_or_else(|| SyncError::not_found("Container", container))?;
        let objects = found
            .objects
            .iter()
            .filter(|(name, _)| marker.map_or(true, |m| name.as_str() > m))
            .take(self.page_size)
            .map(|(name, data)| ObjectRecord {
                name: name.clone(),
                bytes: data.len() as u64,
                etag: data.etag.clone(),
                last_modified: None,
                content_type: data.content_type.clone(),
            })
            .collect();
        Ok(ObjectPage {
            container: found.info,
            objects,
        })
    }

    async fn get_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> Result<StoredObject> {
        let path = object_path(container, object);
        let _call = self.enter(Op::GetObject, endpoint, &path).await?;
        let found = self
            .container(endpoint, container)
            .and_then(|c| c.objects.get(object).cloned())
            .ok_or_else(|| SyncError::not_found("Object", path))?;

        let chunks: Vec<Result<Bytes>> = found
            .content
            .chunks(BODY_CHUNK)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(StoredObject {
            content_type: found.content_type,
            etag: found.etag,
            metadata: found.metadata,
            ..StoredObject::streaming(stream::iter(chunks), Some(found.content.len() as u64))
        })
    }

    async fn put_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
        data: StoredObject,
    ) -> Result<()> {
        let path = object_path(container, object);
        let _call = self.enter(Op::PutObject, endpoint, &path).await?;

        let mut body = data.body.into_stream();
        let mut content = BytesMut::new();
        let mut chunks = 0;
        while let Some(chunk) = body.next().await {
            content.extend_from_slice(&chunk?);
            chunks += 1;
        }
        let content = content.freeze();
        self.received_chunks.lock().unwrap().push((path, chunks));

        let mut accounts = self.accounts.lock().unwrap();
        let entry = accounts
            .get_mut(&endpoint.base_url)
            .and_then(|a| a.containers.get_mut(container))
            .ok_or_else(|| SyncError::not_found("Container", container))?;
        let stored = FakeObject {
            etag: Some(etag_of(&content)),
            content,
            content_type: data.content_type,
            metadata: data.metadata,
        };
        entry.objects.insert(object.to_string(), stored);
        Ok(())
    }

    async fn delete_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> Result<()> {
        let path = object_path(container, object);
        let _call = self.enter(Op::DeleteObject, endpoint, &path).await?;
        let mut accounts = self.accounts.lock().unwrap();
        accounts
            .get_mut(&endpoint.base_url)
            .and_then(|a| a.containers.get_mut(container))
            .and_then(|c| c.objects.remove(object))
            .map(|_| ())
            .ok_or_else(|| SyncError::not_found("Object", path))
    }
}

fn apply_update(metadata: &mut Metadata, update: &MetadataUpdate) {
    for key in &update.remove {
        metadata.remove(key);
    }
    metadata.extend(update.set.clone());
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolver handing out fake-cluster endpoints for a fixed tenant list.
pub struct FakeResolver {
    tenants: Vec<Tenant>,
    denied: Mutex<Vec<(String, ClusterSide)>>,
}

impl FakeResolver {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            tenants: ids
                .iter()
                .map(|id| Tenant::new(*id, format!("name-{id}")))
                .collect(),
            denied: Mutex::new(Vec::new()),
        }
    }

    /// Credentials for `tenant_id` on `side` cannot be issued.
    pub fn deny(&self, tenant_id: &str, side: ClusterSide) {
        self.denied.lock().unwrap().push((tenant_id.to_string(), side));
    }
}

#[async_trait]
impl EndpointResolver for FakeResolver {
    async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        Ok(self.tenants.clone())
    }

    async fn endpoint(&self, tenant: &Tenant, side: ClusterSide) -> Result<StorageEndpoint> {
        let denied = self
            .denied
            .lock()
            .unwrap()
            .iter()
            .any(|(id, s)| id == &tenant.id && *s == side);
        if denied {
            return Err(SyncError::auth(format!("no {side} credentials for {}", tenant.id)));
        }
        Ok(match side {
            ClusterSide::Origin => origin(&tenant.id),
            ClusterSide::Destination => destination(&tenant.id),
        })
    }
}
