//! Stitching split model output
//!
//! Historical output is sometimes split across several files, not
//! necessarily in time order and with differing calendar encodings. The
//! fragments of one logical run are concatenated, sorted and checked for
//! full coverage of the required period.

use crate::coverage::CoverageSpan;
use crate::errors::{PacGradError, PacGradResult};
use crate::field::GriddedField;
use crate::loader::DatasetLoader;
use log::{debug, info};

/// Concatenate the fragments of one run along time and validate coverage
///
/// Fragments are loaded and appended in the given order, then sorted by time.
/// Overlapping fragments (duplicate timestamps) are rejected. Fails with
/// [`PacGradError::Coverage`] if the result does not span `span`.
pub fn stitch<L: DatasetLoader>(
    loader: &L,
    fragments: &[L::Ref],
    span: &CoverageSpan,
) -> PacGradResult<GriddedField> {
    let (first, rest) = fragments
        .split_first()
        .ok_or_else(|| PacGradError::EmptyInput("stitching fragments".to_string()))?;

    debug!("Loading fragment {}", first);
    let mut field = loader.load(first)?;
    for fragment in rest {
        debug!("Loading fragment {}", fragment);
        field = field.concat_time(&loader.load(fragment)?)?;
    }

    let field = field.sort_by_time();
    field.ensure_strictly_increasing()?;
    span.check(field.time())?;

    info!(
        "Stitched {} fragment(s) into {} time steps covering {}",
        fragments.len(),
        field.len(),
        span
    );
    Ok(field)
}
