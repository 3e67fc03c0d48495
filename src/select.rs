use std::cmp::{Ordering, Reverse};

use crate::media::{MediaItem, MediaVariant, VariantKind};

/// Picks the rendition of an item that best matches a display width under a
/// byte ceiling.
///
/// Closeness is the absolute width difference. Equal differences prefer the
/// wider variant, since scaling down looks better than scaling up. Remaining
/// ties fall back to kind (still, video, webp), then smaller size, then the
/// order the provider listed the variants in, so the result is fully
/// determined by the inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantSelector;

impl VariantSelector {
    pub fn select(
        item: &MediaItem,
        target_width: u32,
        max_bytes: u64,
        animated: bool,
    ) -> Option<&MediaVariant> {
        let best_still = best_of(item, target_width, max_bytes, |kind| {
            matches!(kind, VariantKind::Still)
        });
        let best_animated =
            best_of(item, target_width, max_bytes, VariantKind::is_animated);

        match (best_still, best_animated) {
            (Some(still), Some(motion)) if animated => {
                if distance(motion, target_width) <= distance(still, target_width) {
                    Some(motion)
                } else {
                    Some(still)
                }
            }
            (Some(still), _) => Some(still),
            (None, motion) => motion,
        }
    }

    /// Whether at least one variant of `item` fits under `max_bytes`.
    pub fn is_feasible(item: &MediaItem, target_width: u32, max_bytes: u64) -> bool {
        Self::select(item, target_width, max_bytes, false).is_some()
    }
}

fn best_of<'a>(
    item: &'a MediaItem,
    target_width: u32,
    max_bytes: u64,
    accept: impl Fn(VariantKind) -> bool,
) -> Option<&'a MediaVariant> {
    item.variants()
        .enumerate()
        .filter(|(_, variant)| accept(variant.kind) && variant.fits_within(max_bytes))
        .min_by(|(ia, a), (ib, b)| compare(a, *ia, b, *ib, target_width))
        .map(|(_, variant)| variant)
}

fn compare(
    a: &MediaVariant,
    a_pos: usize,
    b: &MediaVariant,
    b_pos: usize,
    target_width: u32,
) -> Ordering {
    let key = |v: &MediaVariant, pos: usize| {
        (
            distance(v, target_width),
            Reverse(v.width),
            v.kind,
            v.byte_size,
            pos,
        )
    };
    key(a, a_pos).cmp(&key(b, b_pos))
}

fn distance(variant: &MediaVariant, target_width: u32) -> u32 {
    variant.width.abs_diff(target_width)
}
