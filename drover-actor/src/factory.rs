//! Dynamic actor construction.
//!
//! The workflow language can ask for new actors at runtime (`loader`
//! actor, `createChild`). Constructible kinds are declared up front in an
//! explicit registry keyed by a stable `class_id` string; there is no
//! reflective loading.

// Layer 1: Standard library
use std::path::PathBuf;
use std::sync::Arc;

// Layer 2: Third-party
use dashmap::DashMap;

// Layer 3: Internal
use crate::actor::Actor;
use crate::error::ActorError;
use crate::system::WeakActorSystem;

/// Everything a dynamic constructor gets to work with.
#[derive(Debug, Clone)]
pub struct ActorSpawnArgs {
    /// Non-owning handle to the system the actor will live in.
    pub system: WeakActorSystem,

    /// Name the actor will be registered under.
    pub name: String,

    /// Name of the requesting actor, if any.
    pub parent: Option<String>,

    /// Overlay directory propagated from the CLI, if any.
    pub overlay_dir: Option<PathBuf>,
}

/// Constructor closure for one actor kind.
pub type ActorConstructor =
    Arc<dyn Fn(ActorSpawnArgs) -> Result<Box<dyn Actor>, ActorError> + Send + Sync>;

/// Registry of constructible actor kinds, keyed by `class_id`.
///
/// Cloning shares the registry.
///
/// # Example
/// ```rust,ignore
/// let factory = ActorFactory::new();
/// factory.register_kind("envProbe", |_args| Ok(Box::new(EnvActor::new())));
///
/// let actor = factory.construct("envProbe", spawn_args)?;
/// ```
#[derive(Clone, Default)]
pub struct ActorFactory {
    constructors: Arc<DashMap<String, ActorConstructor>>,
}

impl ActorFactory {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `class_id`, replacing any previous one.
    pub fn register_kind<F>(&self, class_id: impl Into<String>, constructor: F)
    where
        F: Fn(ActorSpawnArgs) -> Result<Box<dyn Actor>, ActorError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(class_id.into(), Arc::new(constructor));
    }

    /// Whether a constructor is registered for `class_id`.
    pub fn knows(&self, class_id: &str) -> bool {
        self.constructors.contains_key(class_id)
    }

    /// Registered class ids, sorted for stable listings.
    pub fn class_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.constructors.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Construct an actor of the given kind.
    ///
    /// # Errors
    ///
    /// [`ActorError::UnknownClass`] when no constructor is registered;
    /// [`ActorError::ConstructionFailed`] when the constructor itself fails.
    pub fn construct(
        &self,
        class_id: &str,
        args: ActorSpawnArgs,
    ) -> Result<Box<dyn Actor>, ActorError> {
        let constructor = self
            .constructors
            .get(class_id)
            .ok_or_else(|| ActorError::UnknownClass(class_id.to_string()))?;
        constructor(args).map_err(|error| match error {
            passthrough @ (ActorError::UnknownClass(_) | ActorError::ConstructionFailed { .. }) => {
                passthrough
            }
            other => ActorError::construction_failed(class_id, other.to_string()),
        })
    }
}

impl std::fmt::Debug for ActorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorFactory")
            .field("class_ids", &self.class_ids())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::actor::ActorContext;
    use crate::message::ActionResult;
    use crate::system::{ActorSystem, SystemConfig};
    use async_trait::async_trait;

    struct Probe;

    #[async_trait]
    impl Actor for Probe {
        async fn handle(&mut self, action: &str, _args: &str, _ctx: &ActorContext) -> ActionResult {
            match action {
                "ping" => ActionResult::ok("pong"),
                other => ActionResult::unknown_action(other),
            }
        }
    }

    fn spawn_args(name: &str) -> ActorSpawnArgs {
        let system = ActorSystem::new(SystemConfig::default());
        ActorSpawnArgs {
            system: system.downgrade(),
            name: name.to_string(),
            parent: None,
            overlay_dir: None,
        }
    }

    #[test]
    fn test_register_and_construct() {
        let factory = ActorFactory::new();
        factory.register_kind("probe", |_args| Ok(Box::new(Probe)));

        assert!(factory.knows("probe"));
        assert!(factory.construct("probe", spawn_args("p1")).is_ok());
    }

    #[test]
    fn test_unknown_class() {
        let factory = ActorFactory::new();
        let result = factory.construct("missing", spawn_args("x"));
        assert!(matches!(result, Err(ActorError::UnknownClass(_))));
    }

    #[test]
    fn test_constructor_failure_is_wrapped() {
        let factory = ActorFactory::new();
        factory.register_kind("broken", |_args| {
            Err(ActorError::construction_failed("broken", "no disk"))
        });

        let result = factory.construct("broken", spawn_args("x"));
        assert!(matches!(
            result,
            Err(ActorError::ConstructionFailed { .. })
        ));
    }

    #[test]
    fn test_class_ids_sorted() {
        let factory = ActorFactory::new();
        factory.register_kind("zeta", |_args| Ok(Box::new(Probe)));
        factory.register_kind("alpha", |_args| Ok(Box::new(Probe)));
        assert_eq!(factory.class_ids(), vec!["alpha", "zeta"]);
    }
}
