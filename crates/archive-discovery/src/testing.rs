//! # Test Utilities
//!
//! Scripted implementations of the outbound ports. Each mock records what
//! the engine asked of it so tests can assert on opens, queries and closes.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{BlockSummary, DiscoveryError, NodeEndpoint, ServerInfo};
use crate::ports::{
    ChainClient, ChainClientFactory, ClientCapabilities, ClientModuleLoader, NodeSource,
    NodeSourceFactory, TimeSource,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Node source
// =============================================================================

/// Shared state behind [`MockNodeSource`] handles.
#[derive(Debug, Default)]
struct DirectoryState {
    endpoints: Vec<NodeEndpoint>,
    fail_open: usize,
    fail_lookups: usize,
    opened_urls: Vec<String>,
    lookups: Vec<u64>,
}

/// Scripted directory service.
///
/// Cloning shares the script, so a test can keep one copy for assertions
/// while the engine holds another.
#[derive(Clone, Debug, Default)]
pub struct MockNodeSource {
    state: Arc<Mutex<DirectoryState>>,
}

impl MockNodeSource {
    /// Directory listing `urls` in order.
    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = Self::default();
        lock(&source.state).endpoints = urls.into_iter().map(NodeEndpoint::new).collect();
        source
    }

    /// Append a candidate.
    pub fn push(&self, endpoint: NodeEndpoint) {
        lock(&self.state).endpoints.push(endpoint);
    }

    /// Fail the next `count` opens.
    pub fn fail_next_opens(&self, count: usize) {
        lock(&self.state).fail_open = count;
    }

    /// Fail the next `count` lookups.
    pub fn fail_next_lookups(&self, count: usize) {
        lock(&self.state).fail_lookups = count;
    }

    /// URLs handles were opened against.
    pub fn opened_urls(&self) -> Vec<String> {
        lock(&self.state).opened_urls.clone()
    }

    /// Indices looked up, in order.
    pub fn lookups(&self) -> Vec<u64> {
        lock(&self.state).lookups.clone()
    }
}

struct MockNodeSourceHandle {
    state: Arc<Mutex<DirectoryState>>,
}

#[async_trait]
impl NodeSource for MockNodeSourceHandle {
    async fn endpoint_at(&mut self, index: u64) -> Result<Option<NodeEndpoint>, DiscoveryError> {
        let mut state = lock(&self.state);
        state.lookups.push(index);
        if state.fail_lookups > 0 {
            state.fail_lookups -= 1;
            return Err(DiscoveryError::NodeSource(format!(
                "scripted lookup failure at {index}"
            )));
        }
        let endpoint = usize::try_from(index)
            .ok()
            .and_then(|i| state.endpoints.get(i).cloned());
        Ok(endpoint)
    }
}

#[async_trait]
impl NodeSourceFactory for MockNodeSource {
    async fn open(&self, url: &str) -> Result<Box<dyn NodeSource>, DiscoveryError> {
        let mut state = lock(&self.state);
        state.opened_urls.push(url.to_string());
        if state.fail_open > 0 {
            state.fail_open -= 1;
            return Err(DiscoveryError::NodeSource(format!(
                "scripted open failure for {url}"
            )));
        }
        Ok(Box::new(MockNodeSourceHandle {
            state: Arc::clone(&self.state),
        }))
    }
}

// =============================================================================
// Chain client
// =============================================================================

/// How a scripted connect behaves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Connect succeeds.
    #[default]
    Succeed,
    /// Connect fails with a connection error.
    Fail(String),
    /// Connect never completes.
    Hang,
}

/// Scripted behavior of one node.
#[derive(Clone, Debug)]
pub struct NodeScript {
    /// Connect behavior.
    pub connect: ConnectBehavior,
    /// Server info reply.
    pub server_info: ServerInfo,
    /// Chain height reply; `None` makes the query a protocol error.
    pub height: Option<u64>,
    /// Heights the node reports as missing.
    pub missing_blocks: HashSet<u64>,
    /// Heights whose query errors.
    pub failing_blocks: HashSet<u64>,
    /// Make `close` return an error.
    pub fail_close: bool,
}

impl NodeScript {
    /// Healthy node at `height` that has every block.
    pub fn at_height(height: u64) -> Self {
        Self {
            connect: ConnectBehavior::Succeed,
            server_info: ServerInfo {
                server_version: Some("mock-1.0".into()),
                network_id: Some("mainnet".into()),
            },
            height: Some(height),
            missing_blocks: HashSet::new(),
            failing_blocks: HashSet::new(),
            fail_close: false,
        }
    }

    /// Node whose connect fails.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            connect: ConnectBehavior::Fail(reason.into()),
            ..Self::at_height(0)
        }
    }

    /// Node whose connect never completes.
    pub fn hanging() -> Self {
        Self {
            connect: ConnectBehavior::Hang,
            ..Self::at_height(0)
        }
    }

    /// Mark a block missing.
    pub fn missing(mut self, height: u64) -> Self {
        self.missing_blocks.insert(height);
        self
    }

    /// Make a block query error.
    pub fn failing(mut self, height: u64) -> Self {
        self.failing_blocks.insert(height);
        self
    }

    /// Make close fail.
    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[derive(Debug, Default)]
struct ClientLog {
    created: Vec<String>,
    closed: Vec<String>,
    block_queries: Vec<(String, u64)>,
}

/// Scripted client library: one [`NodeScript`] per endpoint URL.
#[derive(Clone, Debug, Default)]
pub struct MockChainClient {
    scripts: Arc<Mutex<HashMap<String, NodeScript>>>,
    log: Arc<Mutex<ClientLog>>,
}

impl MockChainClient {
    /// Empty script; unknown endpoints are unreachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the node at `url`.
    pub fn script(&self, url: impl Into<String>, script: NodeScript) {
        lock(&self.scripts).insert(url.into(), script);
    }

    /// Builder form of [`MockChainClient::script`].
    pub fn with_node(self, url: impl Into<String>, script: NodeScript) -> Self {
        self.script(url, script);
        self
    }

    /// URLs sessions were created for.
    pub fn created(&self) -> Vec<String> {
        lock(&self.log).created.clone()
    }

    /// URLs sessions were closed for.
    pub fn closed(&self) -> Vec<String> {
        lock(&self.log).closed.clone()
    }

    /// Block heights queried, per URL, in order.
    pub fn block_queries(&self) -> Vec<(String, u64)> {
        lock(&self.log).block_queries.clone()
    }
}

impl ChainClientFactory for MockChainClient {
    fn create(&self, endpoint: &NodeEndpoint) -> Result<Box<dyn ChainClient>, DiscoveryError> {
        let script = lock(&self.scripts)
            .get(&endpoint.url)
            .cloned()
            .unwrap_or_else(|| NodeScript::unreachable("no such node"));
        lock(&self.log).created.push(endpoint.url.clone());
        Ok(Box::new(MockSession {
            url: endpoint.url.clone(),
            script,
            log: Arc::clone(&self.log),
        }))
    }
}

struct MockSession {
    url: String,
    script: NodeScript,
    log: Arc<Mutex<ClientLog>>,
}

#[async_trait]
impl ChainClient for MockSession {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&mut self) -> Result<(), DiscoveryError> {
        match &self.script.connect {
            ConnectBehavior::Succeed => Ok(()),
            ConnectBehavior::Fail(reason) => Err(DiscoveryError::connection(&self.url, reason)),
            ConnectBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn server_info(&mut self) -> Result<ServerInfo, DiscoveryError> {
        Ok(self.script.server_info.clone())
    }

    async fn chain_height(&mut self) -> Result<u64, DiscoveryError> {
        self.script
            .height
            .ok_or_else(|| DiscoveryError::protocol(&self.url, "missing chain height"))
    }

    async fn block_at(&mut self, height: u64) -> Result<Option<BlockSummary>, DiscoveryError> {
        lock(&self.log)
            .block_queries
            .push((self.url.clone(), height));
        if self.script.failing_blocks.contains(&height) {
            return Err(DiscoveryError::protocol(&self.url, "block query rejected"));
        }
        if self.script.missing_blocks.contains(&height) {
            return Ok(None);
        }
        Ok(Some(BlockSummary {
            height,
            hash: Some(format!("{height:064x}")),
        }))
    }

    async fn close(&mut self) -> Result<(), DiscoveryError> {
        lock(&self.log).closed.push(self.url.clone());
        if self.script.fail_close {
            return Err(DiscoveryError::connection(&self.url, "close failed"));
        }
        Ok(())
    }
}

// =============================================================================
// Client module
// =============================================================================

/// Client module loader handing out the mock factories.
#[derive(Clone, Debug)]
pub struct MockClientModule {
    directory: MockNodeSource,
    clients: MockChainClient,
    failures_left: Arc<AtomicUsize>,
    loads: Arc<Mutex<Vec<String>>>,
}

impl MockClientModule {
    /// Module backed by the given mocks.
    pub fn new(directory: MockNodeSource, clients: MockChainClient) -> Self {
        Self {
            directory,
            clients,
            failures_left: Arc::new(AtomicUsize::new(0)),
            loads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail the next `count` loads.
    pub fn fail_next_loads(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Module refs the engine asked for.
    pub fn loads(&self) -> Vec<String> {
        lock(&self.loads).clone()
    }
}

#[async_trait]
impl ClientModuleLoader for MockClientModule {
    async fn load(&self, module_ref: &str) -> Result<ClientCapabilities, DiscoveryError> {
        lock(&self.loads).push(module_ref.to_string());
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DiscoveryError::Initialization(format!(
                "module {module_ref:?} not available"
            )));
        }
        Ok(ClientCapabilities::new(
            Arc::new(self.directory.clone()),
            Arc::new(self.clients.clone()),
        ))
    }
}

// =============================================================================
// Time
// =============================================================================

/// Manually driven clock.
#[derive(Clone, Debug, Default)]
pub struct FixedTimeSource {
    now: Arc<AtomicU64>,
}

impl FixedTimeSource {
    /// Clock fixed at `millis`.
    pub fn new(millis: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(millis)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
