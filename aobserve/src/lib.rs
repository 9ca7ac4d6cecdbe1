//! Observability hooks for the session registry and chat turns.
//!
//! ```rust
//! use aobserve::{MetricsObservabilityHooks, SafeRegistryHooks, TracingObservabilityHooks};
//!
//! let _registry_hooks = SafeRegistryHooks::new(TracingObservabilityHooks);
//! let _metrics = MetricsObservabilityHooks;
//! ```

mod combined;
mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use combined::ObservabilityHooks;
pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeChatHooks, SafeRegistryHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, ObservabilityHooks, SafeChatHooks, SafeRegistryHooks,
        TracingObservabilityHooks,
    };
}
