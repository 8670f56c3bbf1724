//! jetson-core
//!
//! Pure engine registry model:
//! - host OS/architecture detection and the JRE header it implies
//! - the engine/client registry and its fixed-capacity tables
//! - the global scan/query serialization flag
//!
//! No networking, no process spawning — those live in `jetson-agent`.

pub mod error;
pub mod os_arch;
pub mod registry;

pub use error::CoreError;
pub use os_arch::OsArch;
pub use registry::{
    ClientEntry,
    ClientHandle,
    EngineEntry,
    EngineHandle,
    GlobalLockFlag,
    Registry,
    RegistrySnapshot,
    MAX_CLIENTS_PER_ENGINE,
    MAX_ENGINES,
};
