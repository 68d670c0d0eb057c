use std::sync::Arc;

use super::handle::{ModuleAccess, ModuleEntry};
use super::{Cable, Rack, RackError, RackHandle, RackSlot};
use crate::config::EngineConfig;
use crate::module::{ModuleKind, ModuleRegistry};
use crate::routing::InputBank;
use crate::telemetry::Telemetry;

enum ModuleSpec {
    Named(String),
    Built(ModuleKind),
}

struct CableSpec {
    from: String,
    output: String,
    to: String,
    param: String,
}

/// Composition root for a [`Rack`].
///
/// Modules render in the order they are added, and cables may only run
/// from an earlier module to a later one.
///
/// ```ignore
/// let registry = ModuleRegistry::builtin();
/// let (rack, handle) = Rack::builder(&registry)
///     .module("seq", "step_sequencer")
///     .module("osc", "oscillator")
///     .connect("seq", "value", "osc", "pitch")
///     .connect("seq", "gate", "osc", "level")
///     .output("osc", "out")
///     .build()?;
/// ```
pub struct RackBuilder<'r> {
    registry: &'r ModuleRegistry,
    config: EngineConfig,
    modules: Vec<(String, ModuleSpec)>,
    cables: Vec<CableSpec>,
    output: Option<(String, String)>,
}

impl<'r> RackBuilder<'r> {
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            modules: Vec::new(),
            cables: Vec::new(),
            output: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a module of a registered kind.
    pub fn module(mut self, id: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.modules
            .push((id.into(), ModuleSpec::Named(type_name.into())));
        self
    }

    /// Add a module constructed by the caller. It is re-prepared with the
    /// rack's config.
    pub fn add(mut self, id: impl Into<String>, module: impl Into<ModuleKind>) -> Self {
        self.modules
            .push((id.into(), ModuleSpec::Built(module.into())));
        self
    }

    /// Patch output `output` of `from` into parameter `param` of `to`.
    pub fn connect(
        mut self,
        from: impl Into<String>,
        output: impl Into<String>,
        to: impl Into<String>,
        param: impl Into<String>,
    ) -> Self {
        self.cables.push(CableSpec {
            from: from.into(),
            output: output.into(),
            to: to.into(),
            param: param.into(),
        });
        self
    }

    /// Which module output `Rack::process` writes to its buffer.
    pub fn output(mut self, module: impl Into<String>, output: impl Into<String>) -> Self {
        self.output = Some((module.into(), output.into()));
        self
    }

    pub fn build(self) -> Result<(Rack, RackHandle), RackError> {
        let config = self.config;
        config.validate()?;

        let mut ids: Vec<String> = Vec::with_capacity(self.modules.len());
        let mut modules: Vec<ModuleKind> = Vec::with_capacity(self.modules.len());
        for (id, spec) in self.modules {
            if ids.contains(&id) {
                return Err(RackError::DuplicateId(id));
            }
            let module = match spec {
                ModuleSpec::Named(type_name) => match self.registry.get(&type_name) {
                    Some(descriptor) => descriptor.construct(&config)?,
                    None => return Err(RackError::UnknownType(type_name)),
                },
                ModuleSpec::Built(mut module) => {
                    module.prepare(&config);
                    module
                }
            };
            ids.push(id);
            modules.push(module);
        }

        let index_of = |id: &str| {
            ids.iter()
                .position(|i| i == id)
                .ok_or_else(|| RackError::UnknownModule(id.to_owned()))
        };

        let mut cables: Vec<Cable> = Vec::with_capacity(self.cables.len());
        for spec in &self.cables {
            let from = index_of(&spec.from)?;
            let to = index_of(&spec.to)?;
            if from >= to {
                return Err(RackError::Feedback {
                    from: spec.from.clone(),
                    to: spec.to.clone(),
                });
            }
            let output = modules[from]
                .output_index(&spec.output)
                .ok_or_else(|| RackError::UnknownOutput {
                    module: spec.from.clone(),
                    output: spec.output.clone(),
                })?;
            let routes = modules[to].routes();
            let (bus, channel) = routes.route(&spec.param).ok_or_else(|| RackError::UnknownParam {
                module: spec.to.clone(),
                param: spec.param.clone(),
            })?;
            if cables
                .iter()
                .any(|c| c.to == to && c.bus == bus && c.channel == channel)
            {
                return Err(RackError::InputTaken {
                    module: spec.to.clone(),
                    param: spec.param.clone(),
                });
            }
            cables.push(Cable {
                from,
                output,
                to,
                bus,
                channel,
            });
        }

        let audio_out = match &self.output {
            Some((module, output)) => {
                let index = index_of(module)?;
                let channel = modules[index].output_index(output).ok_or_else(|| {
                    RackError::UnknownOutput {
                        module: module.clone(),
                        output: output.clone(),
                    }
                })?;
                Some((index, channel))
            }
            None => None,
        };

        // Everything validated; only now touch the shared connection flags
        for (cable, spec) in cables.iter().zip(&self.cables) {
            modules[cable.to].routes().set_connected(&spec.param, true);
        }

        let mut telemetry = Telemetry::builder();
        for (id, module) in ids.iter().zip(modules.iter_mut()) {
            module.register_telemetry(id, &mut telemetry);
        }
        let reclaimed_key = telemetry.register("rack.reclaimed");
        let telemetry = Arc::new(telemetry.build());

        let entries = ids
            .iter()
            .zip(&modules)
            .map(|(id, module)| ModuleEntry {
                id: id.clone(),
                type_name: module.type_name(),
                routes: Arc::clone(module.routes()),
                access: ModuleAccess::of(module),
            })
            .collect();
        let handle = RackHandle::new(entries, Arc::clone(&telemetry));

        let slots = modules
            .into_iter()
            .map(|module| RackSlot {
                inputs: InputBank::for_table(module.routes(), config.max_block_size),
                outputs: vec![vec![0.0; config.max_block_size]; module.capabilities().outputs],
                module,
            })
            .collect::<Vec<_>>();

        log::info!(
            "rack built: {} modules, {} cables, {} Hz, blocks of up to {}",
            slots.len(),
            cables.len(),
            config.sample_rate,
            config.max_block_size
        );

        let rack = Rack {
            config,
            slots,
            cables: cables.into_boxed_slice(),
            audio_out,
            telemetry,
            reclaimed_key,
            reclaimed: 0,
        };
        Ok((rack, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::SequencerModule;

    fn registry() -> ModuleRegistry {
        ModuleRegistry::builtin()
    }

    #[test]
    fn test_unknown_type() {
        let registry = registry();
        let result = Rack::builder(&registry).module("x", "reverb").build();
        assert_eq!(result.err(), Some(RackError::UnknownType("reverb".into())));
    }

    #[test]
    fn test_duplicate_id() {
        let registry = registry();
        let result = Rack::builder(&registry)
            .module("a", "oscillator")
            .module("a", "oscillator")
            .build();
        assert_eq!(result.err(), Some(RackError::DuplicateId("a".into())));
    }

    #[test]
    fn test_backwards_cable_rejected() {
        let registry = registry();
        let result = Rack::builder(&registry)
            .module("osc", "oscillator")
            .module("seq", "step_sequencer")
            .connect("seq", "gate", "osc", "level")
            .build();
        assert!(matches!(result, Err(RackError::Feedback { .. })));
    }

    #[test]
    fn test_bad_cable_endpoints() {
        let registry = registry();
        let base = || {
            Rack::builder(&registry)
                .module("seq", "step_sequencer")
                .module("osc", "oscillator")
        };

        assert!(matches!(
            base().connect("seq", "cv", "osc", "level").build(),
            Err(RackError::UnknownOutput { .. })
        ));
        assert!(matches!(
            base().connect("seq", "gate", "osc", "cutoff").build(),
            Err(RackError::UnknownParam { .. })
        ));
        assert!(matches!(
            base().connect("seq", "gate", "lfo", "rate").build(),
            Err(RackError::UnknownModule(_))
        ));
        assert!(matches!(
            base()
                .connect("seq", "gate", "osc", "level")
                .connect("seq", "trigger", "osc", "level")
                .build(),
            Err(RackError::InputTaken { .. })
        ));
    }

    #[test]
    fn test_invalid_config() {
        let registry = registry();
        let result = Rack::builder(&registry)
            .config(EngineConfig::default().sample_rate(-1.0))
            .build();
        assert!(matches!(result, Err(RackError::Config(_))));
    }

    #[test]
    fn test_prebuilt_module() {
        let registry = ModuleRegistry::new();
        let seq = SequencerModule::new(&EngineConfig::default(), 4).unwrap();
        let (rack, handle) = Rack::builder(&registry).add("seq", seq).build().unwrap();
        assert_eq!(rack.len(), 1);
        assert_eq!(handle.step_table("seq").unwrap().load_full().unwrap().max_steps(), 4);
    }
}
