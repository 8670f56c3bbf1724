//! The engine/client registry: the single source of truth for which
//! engines are known to this agent and which clients are currently
//! connected to each of them.
//!
//! Both tables are fixed-capacity: `MAX_ENGINES` engine slots, each
//! with `MAX_CLIENTS_PER_ENGINE` client slots. This mirrors the
//! original daemon's static arrays — bounded memory, no allocator in
//! the hot accept path, and a predictable failure mode (a full table
//! just rejects the next allocation) instead of unbounded growth.

use crate::error::CoreError;

/// Engine table capacity.
pub const MAX_ENGINES: usize = 32;

/// Per-engine client table capacity.
pub const MAX_CLIENTS_PER_ENGINE: usize = 64;

/// A registered engine type and its connected clients.
#[derive(Debug, Clone)]
pub struct EngineEntry {
    pub name: String,
    pub dir: String,
    pub executable: String,
    pub port: u16,
    pub args: Vec<String>,
    clients: Vec<Option<ClientEntry>>,
}

impl EngineEntry {
    fn new(name: String, dir: String, executable: String, port: u16, args: Vec<String>) -> Self {
        EngineEntry {
            name,
            dir,
            executable,
            port,
            args,
            clients: (0..MAX_CLIENTS_PER_ENGINE).map(|_| None).collect(),
        }
    }

    /// Connected clients, in slot order.
    pub fn connected_clients(&self) -> impl Iterator<Item = &ClientEntry> {
        self.clients.iter().filter_map(|c| c.as_ref())
    }
}

/// One connected GUI session against one engine.
#[derive(Debug, Clone)]
pub struct ClientEntry {
    /// Arena index of the owning [`EngineEntry`] in the registry.
    ///
    /// A plain index rather than a back-pointer: the registry is the
    /// sole owner of `EngineEntry` storage, so a pointer/reference
    /// here would either fight the borrow checker or require unsafe
    /// aliasing. The index is just as cheap to follow and can't dangle.
    pub engine_index: usize,
    pub client_ip: String,
    pub server_ip: String,
    pub instance_name: String,
    pub req_pipe_path: String,
    pub rsp_pipe_path: String,
    pub data_log: bool,
}

/// A handle to a freshly allocated engine slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineHandle(pub usize);

/// A handle to a freshly allocated client slot within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientHandle(pub usize);

/// Read-only snapshot of the registry, suitable for rendering a `query` report.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub engines: Vec<EngineEntry>,
}

/// The process-wide (but not global-singleton — see module docs on
/// [`crate`]) engine/client table.
///
/// Every mutation is taken through `&mut self`; the caller (in
/// `jetson-agent`) wraps this in a `tokio::sync::Mutex` and passes an
/// explicit `Arc<Mutex<Registry>>` around rather than reaching for a
/// process-wide static.
#[derive(Debug, Default)]
pub struct Registry {
    engines: Vec<EngineEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Linear scan for an engine by name.
    pub fn find_engine(&self, name: &str) -> bool {
        self.engines.iter().any(|e| e.name == name)
    }

    pub fn engine_index_by_name(&self, name: &str) -> Option<usize> {
        self.engines.iter().position(|e| e.name == name)
    }

    pub fn engine(&self, handle: EngineHandle) -> Option<&EngineEntry> {
        self.engines.get(handle.0)
    }

    /// Register a new engine.
    ///
    /// Rejects a name already present with [`CoreError::DuplicateEngine`]
    /// — callers that re-scan a config file on every `scan` command rely
    /// on this to tell "already loaded" apart from a genuine failure.
    pub fn add_engine(
        &mut self,
        name: String,
        dir: String,
        executable: String,
        port: u16,
        args: Vec<String>,
    ) -> Result<EngineHandle, CoreError> {
        if self.find_engine(&name) {
            return Err(CoreError::DuplicateEngine(name));
        }
        if self.engines.len() >= MAX_ENGINES {
            return Err(CoreError::EngineTableFull(self.engines.len()));
        }
        self.engines.push(EngineEntry::new(name, dir, executable, port, args));
        Ok(EngineHandle(self.engines.len() - 1))
    }

    /// Allocate a client slot within `engine`.
    pub fn alloc_client(
        &mut self,
        engine: EngineHandle,
        client_ip: String,
        server_ip: String,
        instance_name: String,
        req_pipe_path: String,
        rsp_pipe_path: String,
    ) -> Result<ClientHandle, CoreError> {
        let entry = self
            .engines
            .get_mut(engine.0)
            .ok_or(CoreError::UnknownEngineIndex(engine.0))?;

        let slot = entry.clients.iter().position(|c| c.is_none()).ok_or_else(|| {
            CoreError::ClientTableFull {
                engine: entry.name.clone(),
                cap: MAX_CLIENTS_PER_ENGINE,
            }
        })?;

        entry.clients[slot] = Some(ClientEntry {
            engine_index: engine.0,
            client_ip,
            server_ip,
            instance_name,
            req_pipe_path,
            rsp_pipe_path,
            data_log: false,
        });

        Ok(ClientHandle(slot))
    }

    /// Mark a client disconnected. Does not close sockets or pipes —
    /// that is the bridge tasks' responsibility.
    pub fn mark_client_disconnected(&mut self, engine: EngineHandle, client: ClientHandle) {
        if let Some(entry) = self.engines.get_mut(engine.0) {
            if let Some(slot) = entry.clients.get_mut(client.0) {
                *slot = None;
            }
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            engines: self.engines.clone(),
        }
    }
}

/// Coarse "a scan or query is in flight" flag.
///
/// This is deliberately *not* the same lock as the registry mutex: the
/// registry mutex protects individual table mutations, while this flag
/// serializes whole scan/query operations against each other so that
/// (for example) a `query` started mid-`scan` sees a consistent
/// snapshot rather than a half-populated one.
#[derive(Debug, Default)]
pub struct GlobalLockFlag {
    inner: std::sync::atomic::AtomicBool,
}

impl GlobalLockFlag {
    pub fn new() -> Self {
        GlobalLockFlag::default()
    }

    /// Cooperatively wait until the flag is clear, then set it.
    pub async fn acquire(&self) {
        loop {
            if self
                .inner
                .compare_exchange(
                    false,
                    true,
                    std::sync::atomic::Ordering::AcqRel,
                    std::sync::atomic::Ordering::Acquire,
                )
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    pub fn release(&self) {
        self.inner.store(false, std::sync::atomic::Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(reg: &mut Registry, name: &str) -> EngineHandle {
        reg.add_engine(
            name.to_string(),
            format!("{name}/"),
            name.to_string(),
            53400,
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn find_engine_reflects_additions() {
        let mut reg = Registry::new();
        assert!(!reg.find_engine("stockfish"));
        engine(&mut reg, "stockfish");
        assert!(reg.find_engine("stockfish"));
        assert!(!reg.find_engine("rybka"));
    }

    #[test]
    fn add_engine_rejects_duplicate_name() {
        let mut reg = Registry::new();
        engine(&mut reg, "stockfish");
        let err = reg.add_engine(
            "stockfish".to_string(),
            "stockfish/".to_string(),
            "other".to_string(),
            1,
            vec![],
        );
        assert!(matches!(err, Err(CoreError::DuplicateEngine(name)) if name == "stockfish"));
    }

    #[test]
    fn add_engine_fails_when_table_full() {
        let mut reg = Registry::new();
        for i in 0..MAX_ENGINES {
            engine(&mut reg, &format!("engine{i}"));
        }
        let err = reg.add_engine("overflow".into(), "overflow/".into(), "overflow".into(), 1, vec![]);
        assert!(matches!(err, Err(CoreError::EngineTableFull(n)) if n == MAX_ENGINES));
    }

    #[test]
    fn alloc_client_fails_when_client_table_full() {
        let mut reg = Registry::new();
        let h = engine(&mut reg, "stockfish");
        for i in 0..MAX_CLIENTS_PER_ENGINE {
            reg.alloc_client(
                h,
                format!("10.0.0.{i}"),
                "10.0.0.1".into(),
                format!("jei_10.0.0.{i}_stockfish"),
                format!("req_{i}"),
                format!("rsp_{i}"),
            )
            .unwrap();
        }
        let err = reg.alloc_client(
            h,
            "10.0.0.200".into(),
            "10.0.0.1".into(),
            "jei_overflow".into(),
            "req_x".into(),
            "rsp_x".into(),
        );
        assert!(matches!(err, Err(CoreError::ClientTableFull { cap, .. }) if cap == MAX_CLIENTS_PER_ENGINE));
    }

    #[test]
    fn disconnect_frees_the_slot_for_reuse() {
        let mut reg = Registry::new();
        let h = engine(&mut reg, "stockfish");
        let c1 = reg
            .alloc_client(h, "a".into(), "s".into(), "jei_a".into(), "req_a".into(), "rsp_a".into())
            .unwrap();
        reg.mark_client_disconnected(h, c1);
        let c2 = reg
            .alloc_client(h, "b".into(), "s".into(), "jei_b".into(), "req_b".into(), "rsp_b".into())
            .unwrap();
        assert_eq!(c1, c2);
    }

    #[test]
    fn snapshot_reports_connected_clients() {
        let mut reg = Registry::new();
        let h = engine(&mut reg, "stockfish");
        reg.alloc_client(h, "a".into(), "s".into(), "jei_a".into(), "req_a".into(), "rsp_a".into())
            .unwrap();
        let snap = reg.snapshot();
        assert_eq!(snap.engines.len(), 1);
        assert_eq!(snap.engines[0].connected_clients().count(), 1);
    }

    #[tokio::test]
    async fn global_lock_flag_serializes_acquirers() {
        let flag = std::sync::Arc::new(GlobalLockFlag::new());
        flag.acquire().await;
        let flag2 = flag.clone();
        let handle = tokio::spawn(async move {
            flag2.acquire().await;
            flag2.release();
        });
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(!handle.is_finished());
        flag.release();
        handle.await.unwrap();
    }
}
