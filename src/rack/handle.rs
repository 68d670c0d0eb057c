use std::sync::Arc;

use super::RackError;
use crate::dsp::Wavetable;
use crate::module::{ModuleKind, OscillatorModule, OscillatorParams, SequencerModule};
use crate::persist::StateTree;
use crate::routing::{ModMode, RoutingTable};
use crate::sequencing::StepTable;
use crate::state::StateSlot;
use crate::telemetry::Telemetry;

/// The shared pieces of one module the control side may touch.
#[derive(Clone)]
pub enum ModuleAccess {
    StepSequencer {
        steps: Arc<StateSlot<StepTable>>,
    },
    Oscillator {
        wavetable: Arc<StateSlot<Wavetable>>,
        params: Arc<OscillatorParams>,
    },
}

impl ModuleAccess {
    pub(crate) fn of(module: &ModuleKind) -> Self {
        match module {
            ModuleKind::StepSequencer(m) => ModuleAccess::StepSequencer {
                steps: Arc::clone(m.steps()),
            },
            ModuleKind::Oscillator(m) => ModuleAccess::Oscillator {
                wavetable: Arc::clone(m.wavetable()),
                params: Arc::clone(m.params()),
            },
        }
    }
}

#[derive(Clone)]
pub(crate) struct ModuleEntry {
    pub(crate) id: String,
    pub(crate) type_name: &'static str,
    pub(crate) routes: Arc<RoutingTable>,
    pub(crate) access: ModuleAccess,
}

/// Control-thread side of a [`Rack`](super::Rack). Cheap to clone.
///
/// Nothing here blocks the audio thread: routing changes are atomic flag
/// stores, and step tables and wavetables are replaced through their
/// [`StateSlot`]s.
#[derive(Clone)]
pub struct RackHandle {
    modules: Arc<[ModuleEntry]>,
    telemetry: Arc<Telemetry>,
}

impl RackHandle {
    pub(crate) fn new(modules: Vec<ModuleEntry>, telemetry: Arc<Telemetry>) -> Self {
        Self {
            modules: modules.into(),
            telemetry,
        }
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    /// Module ids with their kind names, in render order.
    pub fn modules(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.modules.iter().map(|m| (m.id.as_str(), m.type_name))
    }

    fn entry(&self, id: &str) -> Result<&ModuleEntry, RackError> {
        self.modules
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| RackError::UnknownModule(id.to_owned()))
    }

    pub fn access(&self, id: &str) -> Result<&ModuleAccess, RackError> {
        self.entry(id).map(|m| &m.access)
    }

    pub fn routes(&self, id: &str) -> Result<&Arc<RoutingTable>, RackError> {
        self.entry(id).map(|m| &m.routes)
    }

    pub fn set_connected(&self, id: &str, param: &str, connected: bool) -> Result<(), RackError> {
        if self.routes(id)?.set_connected(param, connected) {
            Ok(())
        } else {
            Err(unknown_param(id, param))
        }
    }

    pub fn set_mode(&self, id: &str, param: &str, mode: ModMode) -> Result<(), RackError> {
        if self.routes(id)?.set_mode(param, mode) {
            Ok(())
        } else {
            Err(unknown_param(id, param))
        }
    }

    pub fn step_table(&self, id: &str) -> Result<&Arc<StateSlot<StepTable>>, RackError> {
        let entry = self.entry(id)?;
        match &entry.access {
            ModuleAccess::StepSequencer { steps } => Ok(steps),
            _ => Err(wrong_kind(entry, SequencerModule::TYPE_NAME)),
        }
    }

    /// Copy the current step table, edit the copy, publish it.
    pub fn edit_steps(&self, id: &str, edit: impl FnOnce(&mut StepTable)) -> Result<(), RackError> {
        let slot = self.step_table(id)?;
        let mut table = match slot.load_full() {
            Some(current) => StepTable::clone(&current),
            None => return Ok(()),
        };
        edit(&mut table);
        slot.publish(table);
        Ok(())
    }

    pub fn wavetable(&self, id: &str) -> Result<&Arc<StateSlot<Wavetable>>, RackError> {
        let entry = self.entry(id)?;
        match &entry.access {
            ModuleAccess::Oscillator { wavetable, .. } => Ok(wavetable),
            _ => Err(wrong_kind(entry, OscillatorModule::TYPE_NAME)),
        }
    }

    pub fn oscillator(&self, id: &str) -> Result<&Arc<OscillatorParams>, RackError> {
        let entry = self.entry(id)?;
        match &entry.access {
            ModuleAccess::Oscillator { params, .. } => Ok(params),
            _ => Err(wrong_kind(entry, OscillatorModule::TYPE_NAME)),
        }
    }

    /// Release every retired snapshot in the rack. Blocking; non-RT.
    pub fn force_reclaim(&self) -> usize {
        self.modules
            .iter()
            .map(|m| match &m.access {
                ModuleAccess::StepSequencer { steps } => steps.force_reclaim(),
                ModuleAccess::Oscillator { wavetable, .. } => wavetable.force_reclaim(),
            })
            .sum()
    }

    /// Write routing modes, step tables and knob values under each
    /// module's id.
    pub fn save(&self, tree: &mut dyn StateTree) {
        for entry in self.modules.iter() {
            entry.routes.save(tree, &entry.id);
            match &entry.access {
                ModuleAccess::StepSequencer { steps } => {
                    if let Some(table) = steps.load_full() {
                        table.save(tree, &format!("{}.steps", entry.id));
                    }
                }
                ModuleAccess::Oscillator { params, .. } => {
                    tree.set(&format!("{}.pitch_hz", entry.id), params.pitch_hz() as f64);
                    tree.set(&format!("{}.level", entry.id), params.level() as f64);
                }
            }
        }
    }

    /// Counterpart of [`save`](Self::save). Step tables are republished
    /// whole; keys missing from `tree` leave settings as they are.
    pub fn restore(&self, tree: &dyn StateTree) {
        for entry in self.modules.iter() {
            entry.routes.restore(tree, &entry.id);
            match &entry.access {
                ModuleAccess::StepSequencer { steps } => {
                    if let Some(current) = steps.load_full() {
                        let mut table = StepTable::clone(&current);
                        table.restore(tree, &format!("{}.steps", entry.id));
                        if table != *current {
                            steps.publish(table);
                        }
                    }
                }
                ModuleAccess::Oscillator { params, .. } => {
                    if let Some(hz) = tree.get(&format!("{}.pitch_hz", entry.id)) {
                        params.set_pitch_hz(hz as f32);
                    }
                    if let Some(level) = tree.get(&format!("{}.level", entry.id)) {
                        params.set_level(level as f32);
                    }
                }
            }
        }
        log::debug!("restored state for {} modules", self.modules.len());
    }
}

fn unknown_param(id: &str, param: &str) -> RackError {
    RackError::UnknownParam {
        module: id.to_owned(),
        param: param.to_owned(),
    }
}

fn wrong_kind(entry: &ModuleEntry, expected: &'static str) -> RackError {
    RackError::WrongKind {
        module: entry.id.clone(),
        expected,
        actual: entry.type_name,
    }
}
