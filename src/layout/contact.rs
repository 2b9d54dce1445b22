use std::fmt::Display;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{CellError, Result};
use crate::geometry::{Dir, Int, Point, Rect};
use crate::tech::TechConfig;

use super::Via;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, derive_builder::Builder)]
pub struct ContactParams {
    #[builder(setter(into))]
    pub stack: ArcStr,
    #[builder(default = "1")]
    pub rows: Int,
    #[builder(default = "1")]
    pub cols: Int,
    /// The "relaxed" direction, ie. the direction in which there is more margin
    /// for one-sided overhangs.
    #[builder(default)]
    pub dir: Dir,
}

impl Display for ContactParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}x{}{}",
            &self.stack,
            self.rows,
            self.cols,
            self.dir.short_form()
        )
    }
}

impl ContactParams {
    pub fn builder() -> ContactParamsBuilder {
        ContactParamsBuilder::default()
    }

    /// A single cut contact on `stack`.
    pub fn single(stack: impl Into<ArcStr>) -> Self {
        Self {
            stack: stack.into(),
            rows: 1,
            cols: 1,
            dir: Dir::Vert,
        }
    }
}

/// The number of cuts of `stack` that fit in a span of `span` while
/// respecting the enclosure rule of `outer`.
pub fn max_cuts(tc: &TechConfig, stack: &str, outer: &str, span: Int) -> Result<Int> {
    let stack = tc.stack(stack)?;
    let cut = tc.layer(stack.cut())?;
    let enc = cut.enclosure(outer);
    let n = (span - 2 * enc + cut.space) / (cut.width + cut.space);
    Ok(n.max(1))
}

/// Draws a via array of `params` centered on `center`.
pub fn draw_contact(tc: &TechConfig, params: &ContactParams, center: Point) -> Result<Via> {
    if params.rows < 1 || params.cols < 1 {
        return Err(CellError::InvalidSizing(format!(
            "contact {params} must have at least one row and column"
        )));
    }

    let stack = tc.stack(&params.stack)?;
    let ctlay = tc.layer(stack.cut())?;

    let ctw = ctlay.width;
    let cts = ctlay.space;
    let ctbw = ctw * params.cols + cts * (params.cols - 1);
    let ctbh = ctw * params.rows + cts * (params.rows - 1);

    let ct_bbox = Rect::centered(center, ctbw, ctbh);
    let x0 = ct_bbox.left();
    let y0 = ct_bbox.bottom();

    let mut cuts = Vec::with_capacity((params.rows * params.cols) as usize);
    for i in 0..params.rows {
        for j in 0..params.cols {
            let left = x0 + j * (ctw + cts);
            let bot = y0 + i * (ctw + cts);
            cuts.push(Rect::ll_wh(left, bot, ctw, ctw));
        }
    }

    let enclose = |lay_name: &str| {
        let laybox = ct_bbox.expand(ctlay.enclosure(lay_name));
        let ose = ctlay.one_side_enclosure(lay_name);
        laybox.union(&ct_bbox.expand_dir(params.dir, ose))
    };

    Ok(Via {
        stack: params.stack.clone(),
        bot_layer: stack.bot().into(),
        cut_layer: stack.cut().into(),
        top_layer: stack.top().into(),
        center,
        bot: enclose(stack.bot()),
        top: enclose(stack.top()),
        cuts,
    })
}
