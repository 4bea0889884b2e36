//! mplot - typed bindings for an embedded dynamic plotting runtime
//!
//! Statically-typed Rust drives a dynamically-typed figure/axes charting
//! module (canonically `matplotlib.pyplot`) without hand-written glue at
//! each call site. The crate is built around four pieces:
//!
//! - [`object::Object`] - RAII handle owning one foreign reference
//! - [`convert::ToForeign`] - the open host-type-to-foreign-value protocol
//! - [`call::invoke`] - attribute lookup + call with positional/keyword packs
//! - the swappable failure observer on [`runtime::Runtime`]
//!
//! The foreign runtime sits behind [`runtime::RuntimeBackend`]: embedded
//! CPython with the `python` feature, or the in-memory
//! [`runtime::MockRuntime`] that the test suite scripts.
//!
//! ```no_run
//! use mplot::{args, kwargs, Pyplot, Runtime};
//!
//! # #[cfg(feature = "python")]
//! # fn main() -> Result<(), mplot::Error> {
//! let pyplot = Pyplot::attach(Runtime::global())?;
//! let mut fig = pyplot.figure()?;
//! fig.axes0().plot_xy(
//!     &[1.0, 2.0, 3.0],
//!     &[3.0, 4.0, 5.0],
//!     kwargs!["label" => "signal"],
//! )?;
//! fig.axes0().add_legend()?;
//! fig.save_to("signal.png")?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "python"))]
//! # fn main() {}
//! ```

pub mod args;
pub mod axes;
pub mod call;
pub mod config;
pub mod convert;
pub mod error;
pub mod figure;
pub mod logging;
pub mod object;
pub mod pyplot;
pub mod runtime;

pub use args::{build_keyword, build_positional, kw, Kwarg, NO_KWARGS};
pub use axes::Axes;
pub use call::invoke;
pub use config::PlotConfig;
pub use convert::{Axis, ImageLike, PointLike, ToForeign};
pub use error::{Error, FailureKind, FailureReport, Observer, Result};
pub use figure::{Figure, GridCell, GridLayout};
pub use object::Object;
pub use pyplot::Pyplot;
pub use runtime::{MockRuntime, RawObject, Runtime, RuntimeBackend};

#[cfg(feature = "python")]
pub use pyplot::{
    close_all_figures, figure, figure_exists, figure_grid, get_all_figure_ids, get_all_figures,
    set_style, show_all_figures,
};
