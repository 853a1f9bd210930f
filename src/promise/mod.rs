//! Write-once cells, their promises and the combinators built on them
//!
//! - [`cell`]: the [`Cell`] / [`Promise`] pair and blocking waits
//! - [`cell_ext`]: derived operations such as `map`, `filter` and `recover`
//! - [`combinators`]: races, sequencing, retries and joins
//! - `future`: `.await` support for cells (feature `async`)

pub mod cell;
pub mod cell_ext;
pub mod combinators;
#[cfg(feature = "async")]
pub mod future;
pub mod state;

pub use cell::{channel, Cell, Promise};
pub use cell_ext::CellExt;
pub use combinators::{
    first_completed_of, in_completion_order, join_all, race_first, race_last, retry_until,
    sequence, sequence_running,
};
#[cfg(feature = "async")]
pub use future::CellFuture;
pub use state::CellState;
