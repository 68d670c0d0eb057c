use super::{CvSource, ModMode, ModulationRoute, RelativeCurve, RouteIndex, RoutingTable};
use crate::dsp::modulate::relative_additive;

#[derive(Debug, Clone, Copy)]
struct RouteState {
    connected: bool,
    mode: ModMode,
}

/// Connection and mode flags frozen for the duration of one block.
///
/// Owned by the audio thread. [`refresh`](Self::refresh) is the only place
/// the live atomics are read, once per block, so a cable pulled mid-block
/// takes effect at the next block boundary rather than halfway through.
#[derive(Debug, Clone)]
pub struct ConnectionCache {
    states: Box<[RouteState]>,
}

impl ConnectionCache {
    /// Allocates; call when the module is built, not on the audio thread.
    pub fn new(table: &RoutingTable) -> Self {
        let mut cache = Self {
            states: table
                .routes()
                .iter()
                .map(|r| RouteState {
                    connected: false,
                    mode: r.mode,
                })
                .collect(),
        };
        cache.refresh(table);
        cache
    }

    /// Poll the table's live flags. Realtime-safe.
    pub fn refresh(&mut self, table: &RoutingTable) {
        for (i, state) in self.states.iter_mut().enumerate() {
            let index = RouteIndex::new(i);
            state.connected = table.connected_at(index);
            state.mode = table.mode_at(index);
        }
    }

    #[inline]
    pub fn is_connected_at(&self, index: RouteIndex) -> bool {
        self.states
            .get(index.get())
            .is_some_and(|s| s.connected)
    }

    #[inline]
    pub fn mode_at(&self, index: RouteIndex) -> Option<ModMode> {
        self.states.get(index.get()).map(|s| s.mode)
    }
}

/// Everything a module needs to evaluate modulated parameters for a block.
#[derive(Clone, Copy)]
pub struct BlockRouting<'a> {
    table: &'a RoutingTable,
    cache: &'a ConnectionCache,
    inputs: &'a dyn CvSource,
}

impl<'a> BlockRouting<'a> {
    pub fn new(table: &'a RoutingTable, cache: &'a ConnectionCache, inputs: &'a dyn CvSource) -> Self {
        Self {
            table,
            cache,
            inputs,
        }
    }

    pub fn table(&self) -> &'a RoutingTable {
        self.table
    }

    /// `(bus, channel)` for `param`, if it is modulatable at all.
    pub fn route(&self, param: &str) -> Option<(usize, usize)> {
        self.table.route(param)
    }

    /// Connection state as of the start of this block. Unknown ids read
    /// as not connected.
    pub fn is_connected(&self, param: &str) -> bool {
        self.table
            .index_of(param)
            .is_some_and(|i| self.cache.is_connected_at(i))
    }

    /// Resolve a route to its signal for this block.
    ///
    /// Unconnected routes resolve to [`ParamSignal::Base`] without touching
    /// the input buffer.
    #[inline]
    pub fn signal(&self, index: RouteIndex) -> ParamSignal<'a> {
        if !self.cache.is_connected_at(index) {
            return ParamSignal::Base;
        }
        let (Some(route), Some(mode)) = (self.table.get(index), self.cache.mode_at(index)) else {
            return ParamSignal::Base;
        };
        match self.inputs.channel(route.bus, route.channel) {
            Some(samples) => ParamSignal::Cv {
                route,
                mode,
                samples,
            },
            None => ParamSignal::Base,
        }
    }

    /// Evaluate one parameter at one frame.
    #[inline]
    pub fn value(&self, index: RouteIndex, base: f32, frame: usize) -> f32 {
        self.signal(index).at(base, frame)
    }
}

/// A parameter's modulation source for one block.
#[derive(Clone, Copy)]
pub enum ParamSignal<'a> {
    /// Not wired: the base value passes through.
    Base,
    /// Wired: combine the base with the cv buffer.
    Cv {
        route: &'a ModulationRoute,
        mode: ModMode,
        samples: &'a [f32],
    },
}

impl ParamSignal<'_> {
    pub fn is_connected(&self) -> bool {
        matches!(self, ParamSignal::Cv { .. })
    }

    #[inline]
    pub fn at(&self, base: f32, frame: usize) -> f32 {
        match *self {
            ParamSignal::Base => base,
            ParamSignal::Cv {
                route,
                mode,
                samples,
            } => match samples.get(frame) {
                Some(&cv) => route.combine(mode, base, cv),
                None => base,
            },
        }
    }

    /// Like [`at`](Self::at), but with the additive span replaced.
    ///
    /// Only affects routes that are in relative mode with an additive
    /// curve; anything else evaluates exactly as `at`.
    #[inline]
    pub fn at_with_span(&self, base: f32, frame: usize, span: f32) -> f32 {
        match *self {
            ParamSignal::Cv {
                route,
                mode: ModMode::Relative,
                samples,
            } if matches!(route.curve, RelativeCurve::Additive { .. }) => match samples.get(frame) {
                Some(&cv) => relative_additive(base, cv, span, route.range.min, route.range.max),
                None => base,
            },
            _ => self.at(base, frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{CvBuses, ParamRange};

    const FREQ: RouteIndex = RouteIndex::new(0);
    const DEPTH: RouteIndex = RouteIndex::new(1);

    fn table() -> RoutingTable {
        RoutingTable::builder()
            .relative(
                "freq",
                0,
                0,
                RelativeCurve::Exponential { octaves: 4.0 },
                ParamRange::AUDIO_HZ,
            )
            .relative(
                "depth",
                0,
                1,
                RelativeCurve::Additive { span: 1.0 },
                ParamRange::UNIT,
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_unconnected_uses_base() {
        let table = table();
        let cache = ConnectionCache::new(&table);
        let cv = [1.0f32; 4];
        let bus: [&[f32]; 2] = [&cv, &cv];
        let buses: [&[&[f32]]; 1] = [&bus];
        let inputs = CvBuses::new(&buses);
        let routing = BlockRouting::new(&table, &cache, &inputs);

        assert!(!routing.signal(FREQ).is_connected());
        assert_eq!(routing.value(FREQ, 440.0, 0), 440.0);
    }

    #[test]
    fn test_connected_relative_midpoint() {
        let table = table();
        table.set_connected("freq", true);
        let cache = ConnectionCache::new(&table);
        let cv = [0.5f32; 4];
        let bus: [&[f32]; 1] = [&cv];
        let buses: [&[&[f32]]; 1] = [&bus];
        let inputs = CvBuses::new(&buses);
        let routing = BlockRouting::new(&table, &cache, &inputs);

        assert!(routing.is_connected("freq"));
        assert_eq!(routing.value(FREQ, 440.0, 3), 440.0);
    }

    #[test]
    fn test_absolute_mode_after_switch() {
        let table = table();
        table.set_connected("freq", true);
        table.set_mode("freq", ModMode::Absolute);
        let cache = ConnectionCache::new(&table);
        let cv = [0.0f32, 1.0];
        let bus: [&[f32]; 1] = [&cv];
        let buses: [&[&[f32]]; 1] = [&bus];
        let inputs = CvBuses::new(&buses);
        let routing = BlockRouting::new(&table, &cache, &inputs);

        assert_eq!(routing.value(FREQ, 440.0, 0), 20.0);
        assert_eq!(routing.value(FREQ, 440.0, 1), 20_000.0);
    }

    #[test]
    fn test_cache_holds_until_refresh() {
        let table = table();
        let mut cache = ConnectionCache::new(&table);

        table.set_connected("depth", true);
        assert!(!cache.is_connected_at(DEPTH));

        cache.refresh(&table);
        assert!(cache.is_connected_at(DEPTH));
    }

    #[test]
    fn test_missing_buffer_reads_as_unconnected() {
        let table = table();
        table.set_connected("depth", true);
        let cache = ConnectionCache::new(&table);
        let cv = [0.9f32; 4];
        // Only channel 0 exists; "depth" lives on channel 1
        let bus: [&[f32]; 1] = [&cv];
        let buses: [&[&[f32]]; 1] = [&bus];
        let inputs = CvBuses::new(&buses);
        let routing = BlockRouting::new(&table, &cache, &inputs);

        assert_eq!(routing.value(DEPTH, 0.3, 0), 0.3);
    }

    #[test]
    fn test_span_override() {
        let table = table();
        table.set_connected("depth", true);
        let cache = ConnectionCache::new(&table);
        let cv = [1.0f32; 4];
        let bus: [&[f32]; 2] = [&cv, &cv];
        let buses: [&[&[f32]]; 1] = [&bus];
        let inputs = CvBuses::new(&buses);
        let routing = BlockRouting::new(&table, &cache, &inputs);

        let signal = routing.signal(DEPTH);
        assert!((signal.at(0.2, 0) - 0.7).abs() < 1e-6);
        assert!((signal.at_with_span(0.2, 0, 0.2) - 0.3).abs() < 1e-6);
        assert_eq!(signal.at_with_span(0.2, 0, 0.0), 0.2);
    }
}
