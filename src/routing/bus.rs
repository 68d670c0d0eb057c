use super::RoutingTable;

/// Raw CV input buffers, indexed by bus then channel.
///
/// The buffers are opaque to the routing layer: whatever the graph wrote
/// there this block. Out-of-range lookups return `None`, which callers
/// treat exactly like an unconnected parameter.
pub trait CvSource {
    fn channel(&self, bus: usize, channel: usize) -> Option<&[f32]>;
}

/// Borrowed view over buffers owned by the surrounding graph.
#[derive(Clone, Copy)]
pub struct CvBuses<'a> {
    buses: &'a [&'a [&'a [f32]]],
}

impl<'a> CvBuses<'a> {
    pub fn new(buses: &'a [&'a [&'a [f32]]]) -> Self {
        Self { buses }
    }
}

impl CvSource for CvBuses<'_> {
    #[inline]
    fn channel(&self, bus: usize, channel: usize) -> Option<&[f32]> {
        self.buses.get(bus)?.get(channel).copied()
    }
}

/// A module with no CV inputs at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInputs;

impl CvSource for NoInputs {
    #[inline]
    fn channel(&self, _bus: usize, _channel: usize) -> Option<&[f32]> {
        None
    }
}

/// Owned, preallocated CV storage shaped after a routing table.
///
/// Sized once at build time for `max_block` samples per channel; each
/// block only the first `len` samples are exposed.
#[derive(Debug, Clone)]
pub struct InputBank {
    buses: Vec<Vec<Vec<f32>>>,
    len: usize,
}

impl InputBank {
    /// One bus per distinct bus index in `table`, each wide enough for its
    /// highest routed channel.
    pub fn for_table(table: &RoutingTable, max_block: usize) -> Self {
        let bus_count = table.routes().iter().map(|r| r.bus + 1).max().unwrap_or(0);
        let buses = (0..bus_count)
            .map(|bus| {
                let channels = table
                    .routes()
                    .iter()
                    .filter(|r| r.bus == bus)
                    .map(|r| r.channel + 1)
                    .max()
                    .unwrap_or(0);
                (0..channels).map(|_| vec![0.0; max_block]).collect()
            })
            .collect();

        Self { buses, len: 0 }
    }

    /// Expose the first `len` samples of every channel this block.
    pub fn set_len(&mut self, len: usize) {
        let capacity = self
            .buses
            .iter()
            .flat_map(|b| b.iter())
            .map(Vec::len)
            .min()
            .unwrap_or(0);
        self.len = len.min(capacity);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Full-capacity buffer for writing, or `None` if out of range.
    pub fn channel_mut(&mut self, bus: usize, channel: usize) -> Option<&mut [f32]> {
        self.buses
            .get_mut(bus)?
            .get_mut(channel)
            .map(Vec::as_mut_slice)
    }
}

impl CvSource for InputBank {
    #[inline]
    fn channel(&self, bus: usize, channel: usize) -> Option<&[f32]> {
        self.buses
            .get(bus)?
            .get(channel)
            .map(|c| &c[..self.len])
    }
}
