//! Feature modules and remote command synchronisation.
//!
//! Features are registered from an explicit list of [`HandlerModule`]s handed
//! to the runtime builder; nothing is discovered at runtime.
//!
//! ```rust,ignore
//! let greetings = module("greetings", |registry| {
//!     registry.register::<Greeter>(HandlerOptions::message().channel("welcome"))?;
//!     Ok(())
//! });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use herald_core::BoxError;
use herald_framework::{CommandDefinition, Registry, RegistryResult};

/// A unit of features that registers its handlers at startup.
pub trait HandlerModule: Send + Sync {
    /// Name used in logs and startup errors.
    fn name(&self) -> &str;

    /// Registers this module's handlers.
    fn register(&self, registry: &mut Registry) -> RegistryResult<()>;
}

/// Shared module handle.
pub type BoxedModule = Arc<dyn HandlerModule>;

/// A module backed by a registration closure.
pub struct FnModule<F> {
    name: String,
    register: F,
}

impl<F> HandlerModule for FnModule<F>
where
    F: Fn(&mut Registry) -> RegistryResult<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, registry: &mut Registry) -> RegistryResult<()> {
        (self.register)(registry)
    }
}

/// Creates a module from a registration closure.
pub fn module<F>(name: impl Into<String>, register: F) -> FnModule<F>
where
    F: Fn(&mut Registry) -> RegistryResult<()> + Send + Sync,
{
    FnModule {
        name: name.into(),
        register,
    }
}

/// Submits command definitions to the platform.
///
/// Returns the platform id assigned to each command, keyed by command name.
#[async_trait]
pub trait CommandSync: Send + Sync {
    async fn sync(
        &self,
        definitions: &[CommandDefinition],
    ) -> Result<HashMap<String, String>, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_framework::RegistryError;
    use herald_core::EventKind;

    #[test]
    fn test_fn_module_registers_through_closure() {
        let noop = module("noop", |_registry| Ok(()));
        let mut registry = Registry::new();
        assert_eq!(noop.name(), "noop");
        assert!(noop.register(&mut registry).is_ok());

        let broken = module("broken", |_registry| {
            Err(RegistryError::MissingCommand {
                kind: EventKind::SlashCommand,
            })
        });
        assert!(matches!(
            broken.register(&mut registry),
            Err(RegistryError::MissingCommand { .. })
        ));
    }
}
