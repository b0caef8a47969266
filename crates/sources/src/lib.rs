//! Source adapters: uniform access to heterogeneous data stores.
//!
//! Every raw store (NWP grids, satellite imagery, PV/GSP point series) is
//! wrapped in an adapter that can enumerate its available timestamps and
//! fetch a labeled array for an ordered set of them. The alignment core only
//! ever talks to these adapters; persistence formats stay behind this
//! boundary.

pub mod adapter;
pub mod array;
pub mod memory;
pub mod point;
pub mod writer;
pub mod zarr;

pub use adapter::{ForecastAdapter, ObservationAdapter, SourceHandle};
pub use array::TimeArray;
pub use memory::{InMemoryForecastSource, InMemoryObservationSource};
pub use point::ZarrPointSource;
pub use zarr::{ZarrForecastSource, ZarrObservationSource};
