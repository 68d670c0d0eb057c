use super::{Capabilities, ModuleKind, OscillatorModule, SequencerModule};
use crate::config::EngineConfig;
use crate::routing::RoutingError;

type Constructor = fn(&EngineConfig) -> Result<ModuleKind, RoutingError>;

/// How to build one module kind by name.
#[derive(Clone, Copy)]
pub struct ModuleDescriptor {
    pub type_name: &'static str,
    pub capabilities: Capabilities,
    construct: Constructor,
}

impl ModuleDescriptor {
    pub const fn new(
        type_name: &'static str,
        capabilities: Capabilities,
        construct: Constructor,
    ) -> Self {
        Self {
            type_name,
            capabilities,
            construct,
        }
    }

    pub fn construct(&self, config: &EngineConfig) -> Result<ModuleKind, RoutingError> {
        (self.construct)(config)
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("type_name", &self.type_name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Name → constructor table, owned by whoever builds racks.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    descriptors: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ModuleDescriptor::new(
            SequencerModule::TYPE_NAME,
            SequencerModule::CAPABILITIES,
            |config| {
                SequencerModule::new(config, super::sequencer::DEFAULT_MAX_STEPS).map(Into::into)
            },
        ));
        registry.register(ModuleDescriptor::new(
            OscillatorModule::TYPE_NAME,
            OscillatorModule::CAPABILITIES,
            |config| OscillatorModule::new(config).map(Into::into),
        ));
        registry
    }

    /// Add a kind, replacing any earlier one with the same name.
    pub fn register(&mut self, descriptor: ModuleDescriptor) {
        match self
            .descriptors
            .iter_mut()
            .find(|d| d.type_name == descriptor.type_name)
        {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.iter().find(|d| d.type_name == type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.descriptors.iter()
    }
}
