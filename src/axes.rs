//! Axes - plotting primitives on one subplot
//!
//! Thin call sites: every method marshals its typed inputs through the
//! conversion protocol and performs exactly one invocation. Length
//! mismatches between parallel inputs (x vs y, ticks vs labels) are the
//! foreign runtime's to reject and surface as ordinary call failures.

use crate::args::Kwarg;
use crate::call::invoke;
use crate::convert::{image_to_foreign, split_points, ImageLike, PointLike, ToForeign};
use crate::error::{Error, Result};
use crate::object::Object;
use crate::{args, kwargs};

/// One subplot of a [`Figure`](crate::figure::Figure).
pub struct Axes {
    raw: Object,
    module: Object,
    image: Option<Object>,
}

impl Axes {
    pub(crate) fn new(module: Object, raw: Object) -> Self {
        Self {
            raw,
            module,
            image: None,
        }
    }

    /// The underlying foreign axes object, for calls this wrapper does not
    /// cover.
    pub fn object(&self) -> &Object {
        &self.raw
    }

    /// Line plot of `y` over its indices.
    pub fn plot<Y: ToForeign>(&self, y: &[Y], kwargs: &[Kwarg<'_>]) -> Result<()> {
        invoke(&self.raw, "plot", args![y], kwargs).map(drop)
    }

    /// Line plot of `y` over `x`.
    pub fn plot_xy<X: ToForeign, Y: ToForeign>(
        &self,
        x: &[X],
        y: &[Y],
        kwargs: &[Kwarg<'_>],
    ) -> Result<()> {
        invoke(&self.raw, "plot", args![x, y], kwargs).map(drop)
    }

    /// Bar plot of `values` over their indices.
    pub fn bar<V: ToForeign>(&self, values: &[V], kwargs: &[Kwarg<'_>]) -> Result<()> {
        let positions: Vec<usize> = (0..values.len()).collect();
        self.bar_xy(&positions, values, kwargs)
    }

    /// Bar plot of `values` over `x` positions or category labels.
    pub fn bar_xy<X: ToForeign, V: ToForeign>(
        &self,
        x: &[X],
        values: &[V],
        kwargs: &[Kwarg<'_>],
    ) -> Result<()> {
        invoke(&self.raw, "bar", args![x, values], kwargs).map(drop)
    }

    /// Scatter plot of `y` over `x`.
    pub fn scatter<X: ToForeign, Y: ToForeign>(
        &self,
        x: &[X],
        y: &[Y],
        kwargs: &[Kwarg<'_>],
    ) -> Result<()> {
        invoke(&self.raw, "scatter", args![x, y], kwargs).map(drop)
    }

    /// Histogram of `values`.
    pub fn hist<V: ToForeign>(&self, values: &[V], kwargs: &[Kwarg<'_>]) -> Result<()> {
        invoke(&self.raw, "hist", args![values], kwargs).map(drop)
    }

    /// Display a 2-D image. The resulting mappable is kept so a colorbar can
    /// be attached afterwards.
    pub fn imshow<I: ImageLike + ?Sized>(
        &mut self,
        image: &I,
        kwargs: &[Kwarg<'_>],
    ) -> Result<()> {
        let grid = image_to_foreign(self.raw.runtime(), image)?;
        let mappable = invoke(&self.raw, "imshow", args![grid], kwargs)?;
        self.image = Some(mappable);
        Ok(())
    }

    /// Fill the polygon spanned by `points`, decomposed into parallel
    /// coordinate lists.
    pub fn fill<P: PointLike>(&self, points: &[P], kwargs: &[Kwarg<'_>]) -> Result<()> {
        let (xs, ys) = split_points(self.raw.runtime(), points)?;
        invoke(&self.raw, "fill", args![xs, ys], kwargs).map(drop)
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        invoke(&self.raw, "set_title", args![title], kwargs![]).map(drop)
    }

    pub fn set_x_label(&self, label: &str) -> Result<()> {
        invoke(&self.raw, "set_xlabel", args![label], kwargs![]).map(drop)
    }

    pub fn set_y_label(&self, label: &str) -> Result<()> {
        invoke(&self.raw, "set_ylabel", args![label], kwargs![]).map(drop)
    }

    /// Place x-axis ticks; tick labels go through kwargs (`"labels"`).
    pub fn set_x_ticks<T: ToForeign>(&self, ticks: &[T], kwargs: &[Kwarg<'_>]) -> Result<()> {
        invoke(&self.raw, "set_xticks", args![ticks], kwargs).map(drop)
    }

    /// Place y-axis ticks; tick labels go through kwargs (`"labels"`).
    pub fn set_y_ticks<T: ToForeign>(&self, ticks: &[T], kwargs: &[Kwarg<'_>]) -> Result<()> {
        invoke(&self.raw, "set_yticks", args![ticks], kwargs).map(drop)
    }

    pub fn add_legend(&self) -> Result<()> {
        invoke(&self.raw, "legend", args![], kwargs![]).map(drop)
    }

    /// Attach a colorbar to the image previously set with
    /// [`imshow`](Self::imshow).
    ///
    /// Host-side usage error when no image has been displayed; nothing
    /// crosses the boundary in that case.
    pub fn add_colorbar(&self) -> Result<()> {
        let image = self.image.as_ref().ok_or_else(|| Error::Call {
            target: "colorbar".to_string(),
            diagnostic: Some("no image has been displayed on this axes".to_string()),
        })?;
        invoke(
            &self.module,
            "colorbar",
            args![],
            kwargs!["mappable" => image, "ax" => self.raw],
        )
        .map(drop)
    }
}
