//! Pyplot - entry point into the plotting module
//!
//! A [`Pyplot`] owns a handle to the imported plotting module and hands out
//! [`Figure`]s. With the `python` feature a process-wide instance over the
//! embedded interpreter backs the module-level convenience functions.

use crate::call::invoke;
use crate::config::PlotConfig;
use crate::error::{FailureKind, Result};
use crate::figure::{Figure, GridLayout};
use crate::object::Object;
use crate::runtime::Runtime;
use crate::{args, kwargs};

/// Handle to the imported plotting module.
pub struct Pyplot {
    module: Object,
}

impl Pyplot {
    /// Import the configured plotting module (see [`PlotConfig::discover`])
    /// in the given runtime.
    pub fn attach(runtime: &Runtime) -> Result<Self> {
        Self::attach_with(runtime, &PlotConfig::discover())
    }

    /// Import the plotting module named by `config`, applying its default
    /// style when one is set.
    pub fn attach_with(runtime: &Runtime, config: &PlotConfig) -> Result<Self> {
        crate::logging::init();
        let raw = runtime.backend().import(&config.backend.module);
        let module = runtime.own_or_report(raw, FailureKind::Call, &config.backend.module)?;
        tracing::info!(event = "pyplot_attach", module = %config.backend.module);

        let pyplot = Self { module };
        if let Some(style) = &config.backend.style {
            pyplot.use_style(style)?;
        }
        Ok(pyplot)
    }

    /// The underlying module object, for calls this wrapper does not cover.
    pub fn module(&self) -> &Object {
        &self.module
    }

    pub fn runtime(&self) -> &Runtime {
        self.module.runtime()
    }

    /// New single-axes figure under the next unused number.
    pub fn figure(&self) -> Result<Figure> {
        self.figure_grid(GridLayout::default())
    }

    /// New figure with a subplot grid under the next unused number.
    pub fn figure_grid(&self, layout: GridLayout) -> Result<Figure> {
        let id = self.next_free_id()?;
        Figure::create(&self.module, id, layout)
    }

    /// Reopen a registered figure by number.
    pub fn open(&self, id: usize) -> Result<Figure> {
        Figure::open(&self.module, id)
    }

    /// Whether a figure with the given number is registered.
    pub fn figure_exists(&self, id: usize) -> Result<bool> {
        let result = invoke(&self.module, "fignum_exists", args![id], kwargs![])?;
        Ok(result.truthy())
    }

    /// Numbers of all registered figures.
    pub fn figure_ids(&self) -> Result<Vec<usize>> {
        let list = invoke(&self.module, "get_fignums", args![], kwargs![])?;
        let len = list.seq_len().unwrap_or(0);
        let mut ids = Vec::with_capacity(len);
        for index in 0..len {
            if let Some(id) = list.item(index)?.to_i64() {
                ids.push(id as usize);
            }
        }
        Ok(ids)
    }

    /// Reopen every registered figure.
    pub fn all_figures(&self) -> Result<Vec<Figure>> {
        let ids = self.figure_ids()?;
        let mut figures = Vec::with_capacity(ids.len());
        for id in ids {
            figures.push(self.open(id)?);
        }
        Ok(figures)
    }

    /// Show all figures, optionally blocking until the windows close.
    /// `None` leaves the blocking behavior to the foreign side's default.
    pub fn show_all(&self, block: Option<bool>) -> Result<()> {
        invoke(&self.module, "show", args![], kwargs!["block" => block]).map(drop)
    }

    /// Close all registered figures.
    pub fn close_all(&self) -> Result<()> {
        invoke(&self.module, "close", args!["all"], kwargs![]).map(drop)
    }

    /// Select a named style for figures created afterwards.
    pub fn use_style(&self, name: &str) -> Result<()> {
        let style = self.module.getattr("style")?;
        style.invoke("use", args![name], kwargs![]).map(drop)
    }

    fn next_free_id(&self) -> Result<usize> {
        let mut id = 0;
        while self.figure_exists(id)? {
            id += 1;
        }
        Ok(id)
    }
}

// Module-level convenience API over the process-wide interpreter.
#[cfg(feature = "python")]
mod global {
    use super::*;
    use once_cell::sync::OnceCell;

    static PYPLOT: OnceCell<Pyplot> = OnceCell::new();

    fn instance() -> &'static Pyplot {
        PYPLOT.get_or_init(|| {
            Pyplot::attach(Runtime::global())
                .unwrap_or_else(|err| panic!("could not import the plotting module: {}", err))
        })
    }

    /// Create a new single-axes figure.
    pub fn figure() -> Result<Figure> {
        instance().figure()
    }

    /// Create a new figure with a subplot grid.
    pub fn figure_grid(layout: GridLayout) -> Result<Figure> {
        instance().figure_grid(layout)
    }

    /// Return true if a figure with the given number exists.
    pub fn figure_exists(id: usize) -> Result<bool> {
        instance().figure_exists(id)
    }

    /// Get the numbers of all registered figures.
    pub fn get_all_figure_ids() -> Result<Vec<usize>> {
        instance().figure_ids()
    }

    /// Get all registered figures.
    pub fn get_all_figures() -> Result<Vec<Figure>> {
        instance().all_figures()
    }

    /// Show all figures.
    pub fn show_all_figures(block: Option<bool>) -> Result<()> {
        instance().show_all(block)
    }

    /// Close all figures.
    pub fn close_all_figures() -> Result<()> {
        instance().close_all()
    }

    /// Set a style to be used in newly created figures.
    pub fn set_style(name: &str) -> Result<()> {
        instance().use_style(name)
    }
}

#[cfg(feature = "python")]
pub use global::{
    close_all_figures, figure, figure_exists, figure_grid, get_all_figure_ids, get_all_figures,
    set_style, show_all_figures,
};
