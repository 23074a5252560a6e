//! Build a ready-to-run engine from configuration.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::{DispatchError, Gateway, InMemoryAuditSink, Resource, Scheduler};
use crate::util::ids::ResourceId;

/// A fully wired engine: scheduler with registered roster, plus the handles a
/// caller needs to drive and observe it.
pub struct EngineParts {
    /// The scheduler, with all configured resources registered.
    pub scheduler: Arc<Scheduler>,
    /// Registered resources, in roster order.
    pub resources: Vec<Arc<Resource>>,
    /// Shared audit sink; clones read the same buffer the scheduler writes.
    pub audit: InMemoryAuditSink,
}

impl std::fmt::Debug for EngineParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineParts")
            .field("resources", &self.resources.len())
            .finish_non_exhaustive()
    }
}

/// Build an engine from configuration using the provided gateway factory.
///
/// The factory keeps gateway construction with the caller, who owns the
/// spawner/handler wiring the config cannot describe.
pub fn build_engine<F>(cfg: &EngineConfig, gateway_factory: F) -> Result<EngineParts, DispatchError>
where
    F: FnOnce(&EngineConfig) -> Result<Arc<dyn Gateway>, DispatchError>,
{
    cfg.validate().map_err(DispatchError::Config)?;

    let gateway = gateway_factory(cfg)?;
    let audit = InMemoryAuditSink::new(cfg.audit_capacity);
    let scheduler = Arc::new(Scheduler::new(gateway).with_audit(Box::new(audit.clone())));

    let mut resources = Vec::with_capacity(cfg.resources as usize);
    for i in 0..cfg.resources {
        let resource = Resource::new(ResourceId(i), &scheduler);
        scheduler.register_resource(Arc::clone(&resource));
        resources.push(resource);
    }

    Ok(EngineParts {
        scheduler,
        resources,
        audit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayBackendConfig;
    use crate::infra::gateway::ManualGateway;

    #[test]
    fn test_build_registers_configured_roster() {
        let cfg = EngineConfig {
            resources: 3,
            audit_capacity: 16,
            gateway: GatewayBackendConfig::Manual,
        };
        let parts = build_engine(&cfg, |_| Ok(Arc::new(ManualGateway::new()) as Arc<dyn Gateway>)).unwrap();
        assert_eq!(parts.resources.len(), 3);
        assert!(parts.resources.iter().all(|r| r.is_available()));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = EngineConfig {
            resources: 0,
            audit_capacity: 16,
            gateway: GatewayBackendConfig::Manual,
        };
        let err = build_engine(&cfg, |_| Ok(Arc::new(ManualGateway::new()) as Arc<dyn Gateway>)).unwrap_err();
        assert!(matches!(err, DispatchError::Config(_)));
    }
}
