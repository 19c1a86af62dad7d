//! Matching labels to the lines users write on.

use crate::geometry::Rect;
use crate::model::{LabelCandidate, Line};

use super::config::AssociationRules;

/// Where a field box came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A line on the label's row, to its right
    SameRow,
    /// A line just under the label
    Below,
    /// No line; the box is estimated from the label
    Estimated,
}

/// Picks a line for each label and derives the field box.
#[derive(Debug, Clone)]
pub struct Associator<'a> {
    rules: &'a AssociationRules,
}

impl<'a> Associator<'a> {
    /// Create an associator.
    pub fn new(rules: &'a AssociationRules) -> Self {
        Self { rules }
    }

    /// Best line on the label's row, scored by vertical offset from the
    /// label centre plus a share of the gap to the right.
    pub fn same_row(&self, label: &Rect, lines: &[Line]) -> Option<(Line, f32)> {
        let center_y = label.center_y();
        lines
            .iter()
            .filter_map(|line| {
                let dy = (line.y - center_y).abs();
                if dy >= self.rules.row_max_dy
                    || line.x_start < label.x - self.rules.row_left_slack
                {
                    return None;
                }
                let gap = (line.x_start - label.right()).max(0.0);
                Some((*line, dy + gap * self.rules.row_gap_weight))
            })
            .fold(None, keep_lowest)
    }

    /// Best line under the label that overlaps it horizontally or comes
    /// close.
    pub fn below(&self, label: &Rect, lines: &[Line]) -> Option<(Line, f32)> {
        let label_bottom = label.bottom();
        lines
            .iter()
            .filter_map(|line| {
                if line.y < label_bottom {
                    return None;
                }
                let dy = line.y - label_bottom;
                if dy > self.rules.below_max_dy {
                    return None;
                }
                let overlap = line.x_end.min(label.right()) - line.x_start.max(label.x);
                let dx = if overlap > 0.0 {
                    0.0
                } else {
                    (line.x_start - label.right())
                        .abs()
                        .min((line.x_end - label.x).abs())
                };
                if dx >= self.rules.below_max_dx {
                    return None;
                }
                Some((*line, dy + dx * self.rules.below_gap_weight))
            })
            .fold(None, keep_lowest)
    }

    /// Line chosen for a label, if any.
    pub fn find_line(&self, label: &Rect, lines: &[Line]) -> Option<(Line, Placement)> {
        let row = self.same_row(label, lines);
        if self.rules.prefer_same_row {
            if let Some((line, _)) = row {
                return Some((line, Placement::SameRow));
            }
            return self.below(label, lines).map(|(l, _)| (l, Placement::Below));
        }

        match (row, self.below(label, lines)) {
            (Some((r, rs)), Some((b, bs))) => {
                if bs < rs {
                    Some((b, Placement::Below))
                } else {
                    Some((r, Placement::SameRow))
                }
            }
            (Some((r, _)), None) => Some((r, Placement::SameRow)),
            (None, Some((b, _))) => Some((b, Placement::Below)),
            (None, None) => None,
        }
    }

    /// Field box for a label.
    ///
    /// A matched line gives `{line_left, line_y, line_length, field_height}`;
    /// otherwise the box sits just right of the label with the label's
    /// height.
    pub fn field_box(&self, label: &LabelCandidate, lines: &[Line]) -> (Rect, Placement) {
        match self.find_line(&label.bbox, lines) {
            Some((line, placement)) => (
                Rect::new(line.x_start, line.y, line.length(), self.rules.field_height),
                placement,
            ),
            None => (
                Rect::new(
                    label.bbox.right() + self.rules.fallback_gap,
                    label.bbox.y,
                    self.rules.fallback_width,
                    label.bbox.h,
                ),
                Placement::Estimated,
            ),
        }
    }
}

fn keep_lowest(best: Option<(Line, f32)>, candidate: (Line, f32)) -> Option<(Line, f32)> {
    match best {
        Some((_, score)) if score <= candidate.1 => best,
        _ => Some(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> LabelCandidate {
        LabelCandidate::new("Nombre", Rect::from_corners(50.0, 100.0, 120.0, 112.0), 10.0)
    }

    #[test]
    fn test_same_row_line() {
        let rules = AssociationRules::default();
        let lines = vec![Line::new(130.0, 300.0, 106.0)];
        let (rect, placement) = Associator::new(&rules).field_box(&label(), &lines);
        assert_eq!(rect, Rect::new(130.0, 106.0, 170.0, 20.0));
        assert_eq!(placement, Placement::SameRow);
    }

    #[test]
    fn test_fallback_box() {
        let rules = AssociationRules::default();
        let (rect, placement) = Associator::new(&rules).field_box(&label(), &[]);
        assert_eq!(rect, Rect::new(125.0, 100.0, 150.0, 12.0));
        assert_eq!(placement, Placement::Estimated);
    }

    #[test]
    fn test_line_below() {
        let rules = AssociationRules::default();
        // Too far down for the row search, overlapping the label
        let lines = vec![Line::new(40.0, 250.0, 135.0)];
        let (rect, placement) = Associator::new(&rules).field_box(&label(), &lines);
        assert_eq!(placement, Placement::Below);
        assert_eq!(rect, Rect::new(40.0, 135.0, 210.0, 20.0));
    }

    #[test]
    fn test_below_rejects_distant_lines() {
        let rules = AssociationRules::default();
        let associator = Associator::new(&rules);
        let bbox = label().bbox;
        // More than 30pt under the label
        assert!(associator.below(&bbox, &[Line::new(40.0, 250.0, 150.0)]).is_none());
        // Off to the side
        assert!(associator.below(&bbox, &[Line::new(200.0, 300.0, 120.0)]).is_none());
        // Above the label bottom
        assert!(associator.below(&bbox, &[Line::new(40.0, 250.0, 110.0)]).is_none());
    }

    #[test]
    fn test_row_prefers_closest() {
        let rules = AssociationRules::default();
        let lines = vec![
            Line::new(400.0, 500.0, 106.0),
            Line::new(125.0, 300.0, 110.0),
            // Starts too far left of the label
            Line::new(0.0, 300.0, 106.0),
        ];
        let (line, score) = Associator::new(&rules)
            .same_row(&label().bbox, &lines)
            .unwrap();
        assert_eq!(line, Line::new(125.0, 300.0, 110.0));
        assert!((score - 6.5).abs() < 1e-4);
    }

    #[test]
    fn test_same_row_bias_is_tunable() {
        // Row line far to the right (score 40), line under the label
        // (score 20).
        let lines = vec![Line::new(200.0, 300.0, 106.0), Line::new(50.0, 120.0, 132.0)];

        let biased = AssociationRules::default();
        let (line, placement) = Associator::new(&biased)
            .find_line(&label().bbox, &lines)
            .unwrap();
        assert_eq!(placement, Placement::SameRow);
        assert_eq!(line.x_start, 200.0);

        let unbiased = AssociationRules {
            prefer_same_row: false,
            ..Default::default()
        };
        let (line, placement) = Associator::new(&unbiased)
            .find_line(&label().bbox, &lines)
            .unwrap();
        assert_eq!(placement, Placement::Below);
        assert_eq!(line.x_start, 50.0);
    }
}
