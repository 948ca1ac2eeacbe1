//! Score ordering inference and the badness functions used by the merge heap.
//!
//! The service does not say which metric an index uses, so the ordering is
//! read off the scores themselves: a namespace result is always returned
//! best-first, so scores that never rise mean larger is better, and any rise
//! means smaller is better. A near-tie perturbed by floating-point noise can
//! fool this; the heuristic is kept as-is.

use crate::types::Polarity;

/// Maps a score to a value where lower is always better.
///
/// Both zeros map to `+0.0` so that equal scores compare equal under
/// `f64::total_cmp`.
pub(crate) type Badness = fn(f64) -> f64;

fn higher_is_better(score: f64) -> f64 {
    -score + 0.0
}

fn lower_is_better(score: f64) -> f64 {
    score + 0.0
}

/// Infer the score ordering from one best-first sequence of scores.
///
/// Returns [`Polarity::Unknown`] for fewer than two scores.
pub fn infer_polarity<I>(scores: I) -> Polarity
where
    I: IntoIterator<Item = f64>,
{
    let mut scores = scores.into_iter();
    let Some(mut previous) = scores.next() else {
        return Polarity::Unknown;
    };

    let mut compared = false;
    for score in scores {
        if score > previous {
            return Polarity::LowerIsBetter;
        }
        compared = true;
        previous = score;
    }

    if compared {
        Polarity::HigherIsBetter
    } else {
        Polarity::Unknown
    }
}

/// Select the badness function for a known ordering.
pub(crate) fn badness_for(polarity: Polarity) -> Option<Badness> {
    match polarity {
        Polarity::HigherIsBetter => Some(higher_is_better),
        Polarity::LowerIsBetter => Some(lower_is_better),
        Polarity::Unknown => None,
    }
}
