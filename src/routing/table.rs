use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use thiserror::Error;

use super::{ModMode, ModulationRoute, ParamRange, RelativeCurve, RouteIndex};
use crate::persist::StateTree;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("parameter `{0}` is routed twice")]
    DuplicateParam(&'static str),
    #[error("`{param}` and `{other}` both target bus {bus} channel {channel}")]
    ChannelInUse {
        param: &'static str,
        other: &'static str,
        bus: usize,
        channel: usize,
    },
    #[error("parameter `{param}` has an invalid range [{min}, {max}]")]
    InvalidRange {
        param: &'static str,
        min: f32,
        max: f32,
    },
}

/// Fixed-shape route table for one module instance.
///
/// The route list never changes after construction. Only two flags per
/// route are mutable, both atomics written from the control thread:
/// whether a cable is plugged into the route's channel, and which
/// combination mode is active.
#[derive(Debug)]
pub struct RoutingTable {
    routes: Box<[ModulationRoute]>,
    connected: Box<[AtomicBool]>,
    modes: Box<[AtomicU8]>,
}

impl RoutingTable {
    pub fn builder() -> RoutingTableBuilder {
        RoutingTableBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[ModulationRoute] {
        &self.routes
    }

    pub fn get(&self, index: RouteIndex) -> Option<&ModulationRoute> {
        self.routes.get(index.get())
    }

    pub fn index_of(&self, param: &str) -> Option<RouteIndex> {
        self.routes
            .iter()
            .position(|r| r.param == param)
            .map(RouteIndex::new)
    }

    /// Where `param` reads its cv from, or `None` if it is not modulatable.
    pub fn route(&self, param: &str) -> Option<(usize, usize)> {
        self.index_of(param)
            .map(|i| &self.routes[i.get()])
            .map(|r| (r.bus, r.channel))
    }

    /// Mark whether a cable targets `param`. Returns `false` for unknown ids.
    pub fn set_connected(&self, param: &str, connected: bool) -> bool {
        match self.index_of(param) {
            Some(i) => {
                self.connected[i.get()].store(connected, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Live connection flag. Unknown ids read as not connected.
    ///
    /// The audio thread reads the per-block [`ConnectionCache`] instead.
    ///
    /// [`ConnectionCache`]: super::ConnectionCache
    pub fn is_connected(&self, param: &str) -> bool {
        self.index_of(param)
            .is_some_and(|i| self.connected_at(i))
    }

    /// Switch the combination mode. Returns `false` for unknown ids.
    pub fn set_mode(&self, param: &str, mode: ModMode) -> bool {
        match self.index_of(param) {
            Some(i) => {
                self.modes[i.get()].store(mode.to_bits(), Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn mode(&self, param: &str) -> Option<ModMode> {
        self.index_of(param).map(|i| self.mode_at(i))
    }

    #[inline]
    pub(crate) fn connected_at(&self, index: RouteIndex) -> bool {
        self.connected
            .get(index.get())
            .is_some_and(|c| c.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn mode_at(&self, index: RouteIndex) -> ModMode {
        self.modes
            .get(index.get())
            .map(|m| ModMode::from_bits(m.load(Ordering::Acquire)))
            .unwrap_or(ModMode::Absolute)
    }

    /// Write each route's active mode under `{prefix}.{param}.relative`.
    pub fn save(&self, tree: &mut dyn StateTree, prefix: &str) {
        for (i, route) in self.routes.iter().enumerate() {
            let relative = self.mode_at(RouteIndex::new(i)) == ModMode::Relative;
            tree.set(
                &format!("{}.{}.relative", prefix, route.param),
                if relative { 1.0 } else { 0.0 },
            );
        }
    }

    /// Restore modes written by [`save`](Self::save). Missing keys keep
    /// the current mode.
    pub fn restore(&self, tree: &dyn StateTree, prefix: &str) {
        for route in self.routes.iter() {
            if let Some(flag) = tree.get(&format!("{}.{}.relative", prefix, route.param)) {
                let mode = if flag >= 0.5 {
                    ModMode::Relative
                } else {
                    ModMode::Absolute
                };
                self.set_mode(route.param, mode);
            }
        }
    }
}

/// Collects routes and validates them into a [`RoutingTable`].
#[derive(Debug, Default)]
pub struct RoutingTableBuilder {
    routes: Vec<ModulationRoute>,
}

impl RoutingTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route that starts in absolute mode.
    ///
    /// Its relative curve is additive over the full range, so switching to
    /// relative later behaves sensibly.
    pub fn absolute(mut self, param: &'static str, bus: usize, channel: usize, range: ParamRange) -> Self {
        self.routes.push(ModulationRoute {
            param,
            bus,
            channel,
            mode: ModMode::Absolute,
            curve: RelativeCurve::Additive {
                span: range.max - range.min,
            },
            range,
        });
        self
    }

    /// Route that starts in relative mode with the given curve.
    pub fn relative(
        mut self,
        param: &'static str,
        bus: usize,
        channel: usize,
        curve: RelativeCurve,
        range: ParamRange,
    ) -> Self {
        self.routes.push(ModulationRoute {
            param,
            bus,
            channel,
            mode: ModMode::Relative,
            curve,
            range,
        });
        self
    }

    pub fn build(self) -> Result<RoutingTable, RoutingError> {
        for (i, route) in self.routes.iter().enumerate() {
            if !route.range.is_valid() {
                return Err(RoutingError::InvalidRange {
                    param: route.param,
                    min: route.range.min,
                    max: route.range.max,
                });
            }
            for earlier in &self.routes[..i] {
                if earlier.param == route.param {
                    return Err(RoutingError::DuplicateParam(route.param));
                }
                if earlier.bus == route.bus && earlier.channel == route.channel {
                    return Err(RoutingError::ChannelInUse {
                        param: route.param,
                        other: earlier.param,
                        bus: route.bus,
                        channel: route.channel,
                    });
                }
            }
        }

        let connected = self.routes.iter().map(|_| AtomicBool::new(false)).collect();
        let modes = self
            .routes
            .iter()
            .map(|r| AtomicU8::new(r.mode.to_bits()))
            .collect();

        Ok(RoutingTable {
            routes: self.routes.into_boxed_slice(),
            connected,
            modes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryTree;

    fn filter_table() -> RoutingTable {
        RoutingTable::builder()
            .relative(
                "cutoff",
                0,
                0,
                RelativeCurve::Exponential { octaves: 4.0 },
                ParamRange::AUDIO_HZ,
            )
            .absolute("x_mod", 0, 1, ParamRange::UNIT)
            .build()
            .unwrap()
    }

    #[test]
    fn test_route_is_stable() {
        let table = filter_table();
        let first = table.route("x_mod");
        for _ in 0..100 {
            assert_eq!(table.route("x_mod"), first);
        }
        assert_eq!(first, Some((0, 1)));
    }

    #[test]
    fn test_unknown_param_is_not_connected() {
        let table = filter_table();
        assert_eq!(table.route("resonance"), None);
        assert!(!table.is_connected("resonance"));
        assert!(!table.set_connected("resonance", true));
        assert!(!table.is_connected("resonance"));
    }

    #[test]
    fn test_connection_flags() {
        let table = filter_table();
        assert!(!table.is_connected("cutoff"));
        assert!(table.set_connected("cutoff", true));
        assert!(table.is_connected("cutoff"));
        assert!(!table.is_connected("x_mod"));
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let result = RoutingTable::builder()
            .absolute("a", 1, 3, ParamRange::UNIT)
            .absolute("b", 1, 3, ParamRange::UNIT)
            .build();
        assert_eq!(
            result.unwrap_err(),
            RoutingError::ChannelInUse {
                param: "b",
                other: "a",
                bus: 1,
                channel: 3
            }
        );
    }

    #[test]
    fn test_same_channel_on_other_bus_is_fine() {
        let result = RoutingTable::builder()
            .absolute("a", 0, 0, ParamRange::UNIT)
            .absolute("b", 1, 0, ParamRange::UNIT)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let result = RoutingTable::builder()
            .absolute("a", 0, 0, ParamRange::UNIT)
            .absolute("a", 0, 1, ParamRange::UNIT)
            .build();
        assert_eq!(result.unwrap_err(), RoutingError::DuplicateParam("a"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = RoutingTable::builder()
            .absolute("a", 0, 0, ParamRange::new(5.0, 1.0))
            .build();
        assert!(matches!(result, Err(RoutingError::InvalidRange { .. })));
    }

    #[test]
    fn test_modes_round_trip_through_state_tree() {
        let table = filter_table();
        table.set_mode("cutoff", ModMode::Absolute);
        table.set_mode("x_mod", ModMode::Relative);

        let mut tree = MemoryTree::new();
        table.save(&mut tree, "filter");
        assert_eq!(tree.get("filter.cutoff.relative"), Some(0.0));

        let restored = filter_table();
        restored.restore(&tree, "filter");
        assert_eq!(restored.mode("cutoff"), Some(ModMode::Absolute));
        assert_eq!(restored.mode("x_mod"), Some(ModMode::Relative));
    }
}
