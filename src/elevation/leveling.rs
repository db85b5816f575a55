/// Final heights across a ribbon at one vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSection {
    pub centre: f64,
    pub left: f64,
    pub right: f64,
}

/// Decide the cross-section heights at one vertex
///
/// A lifted vertex whose target height clears the terrain on both sides is
/// fully levelled. Otherwise the section follows the terrain slope, limited
/// to `max_gradient` over `width`, and is raised until neither edge is buried.
pub fn level_cross_section(
    ground_centre: f64,
    ground_left: f64,
    ground_right: f64,
    lift: f64,
    width: f64,
    max_gradient: f64,
) -> CrossSection {
    let target = ground_centre + lift;
    if lift > 0.0 && target >= ground_left.max(ground_right) {
        return CrossSection {
            centre: target,
            left: target,
            right: target,
        };
    }

    let limit = (max_gradient * width).abs();
    let half = (ground_right - ground_left).clamp(-limit, limit) / 2.0;
    let mut left = target - half;
    let mut right = target + half;

    let buried = (ground_left - left).max(ground_right - right);
    let mut centre = target;
    if buried > 0.0 {
        left += buried;
        right += buried;
        centre += buried;
    }
    CrossSection { centre, left, right }
}
