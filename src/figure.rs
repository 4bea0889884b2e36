//! Figure - a numbered window holding a grid of axes
//!
//! Created through [`Pyplot`](crate::pyplot::Pyplot). The axes grid is
//! materialized once at construction (`squeeze=False`, so the foreign side
//! always hands back a 2-D arrangement) and indexed host-side afterwards.

use std::path::Path;

use crate::axes::Axes;
use crate::call::invoke;
use crate::error::Result;
use crate::object::Object;
use crate::{args, kwargs};

/// Subplot arrangement of a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self { rows: 1, cols: 1 }
    }
}

/// Position of one subplot within the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

/// A figure registered with the plotting module.
pub struct Figure {
    id: usize,
    module: Object,
    fig: Object,
    layout: GridLayout,
    axes: Vec<Axes>,
}

impl Figure {
    /// Create a new figure with the given number and subplot grid.
    pub(crate) fn create(module: &Object, id: usize, layout: GridLayout) -> Result<Self> {
        if layout.rows == 0 || layout.cols == 0 {
            // Host-side usage error; nothing crosses the boundary.
            return Err(crate::error::Error::Call {
                target: "subplots".to_string(),
                diagnostic: Some("grid dimensions must be positive".to_string()),
            });
        }
        let pair = invoke(
            module,
            "subplots",
            args![],
            kwargs![
                "num" => id,
                "nrows" => layout.rows,
                "ncols" => layout.cols,
                "squeeze" => false
            ],
        )?;
        let fig = pair.item(0)?;
        let grid = pair.item(1)?;

        let mut axes = Vec::with_capacity(layout.rows * layout.cols);
        for row in 0..layout.rows {
            let line = grid.item(row)?;
            for col in 0..layout.cols {
                axes.push(Axes::new(module.clone(), line.item(col)?));
            }
        }

        tracing::debug!(event = "figure_create", id, rows = layout.rows, cols = layout.cols);
        Ok(Self {
            id,
            module: module.clone(),
            fig,
            layout,
            axes,
        })
    }

    /// Reopen an already-registered figure by number. The grid arrangement
    /// is not recoverable from the foreign side, so only the current axes is
    /// exposed.
    pub(crate) fn open(module: &Object, id: usize) -> Result<Self> {
        let fig = invoke(module, "figure", args![], kwargs!["num" => id])?;
        let current = invoke(module, "gca", args![], kwargs![])?;
        Ok(Self {
            id,
            module: module.clone(),
            fig,
            layout: GridLayout::default(),
            axes: vec![Axes::new(module.clone(), current)],
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// The underlying foreign figure object, for calls this wrapper does not
    /// cover.
    pub fn object(&self) -> &Object {
        &self.fig
    }

    /// Subplot at `cell`, or `None` outside the grid.
    pub fn axes(&mut self, cell: GridCell) -> Option<&mut Axes> {
        if cell.row >= self.layout.rows || cell.col >= self.layout.cols {
            return None;
        }
        self.axes.get_mut(cell.row * self.layout.cols + cell.col)
    }

    /// The first subplot; every figure has at least one.
    pub fn axes0(&mut self) -> &mut Axes {
        &mut self.axes[0]
    }

    /// Figure-level title.
    pub fn set_title(&self, title: &str) -> Result<()> {
        invoke(&self.fig, "suptitle", args![title], kwargs![]).map(drop)
    }

    /// Render the figure to a file; the format follows the extension.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_string_lossy();
        invoke(&self.fig, "savefig", args![path], kwargs![]).map(drop)
    }

    /// Close this figure, unregistering its number.
    pub fn close(&self) -> Result<()> {
        invoke(&self.module, "close", args![self.id], kwargs![]).map(drop)
    }
}
