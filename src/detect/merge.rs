//! Deduplication of lines found by both detectors.

use std::cmp::Ordering;

use crate::model::Line;

use super::config::LineTolerances;

/// Merge two line lists, dropping near-duplicates.
///
/// Lines are sorted by Y and each one is compared only against accepted
/// lines at most `merge_dy` above it. A line is a duplicate when it is
/// within `merge_dy` vertically and both ends are within `merge_dx`.
pub fn merge_lines(vector: &[Line], raster: &[Line], tolerances: &LineTolerances) -> Vec<Line> {
    let mut all: Vec<Line> = vector.iter().chain(raster.iter()).copied().collect();
    if all.is_empty() {
        return all;
    }
    all.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal));

    let mut merged: Vec<Line> = Vec::with_capacity(all.len());
    for line in all {
        let is_duplicate = merged
            .iter()
            .rev()
            .take_while(|existing| line.y - existing.y <= tolerances.merge_dy)
            .any(|existing| {
                (line.y - existing.y).abs() < tolerances.merge_dy
                    && (line.x_start - existing.x_start).abs() < tolerances.merge_dx
                    && (line.x_end - existing.x_end).abs() < tolerances.merge_dx
            });
        if !is_duplicate {
            merged.push(line);
        }
    }

    log::debug!(
        "Merged {} vector and {} raster lines into {}",
        vector.len(),
        raster.len(),
        merged.len()
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jittered_duplicate_is_dropped() {
        let vector = vec![Line::new(10.0, 100.0, 50.0)];
        let raster = vec![Line::new(10.5, 99.0, 51.0)];
        let merged = merge_lines(&vector, &raster, &LineTolerances::default());
        assert_eq!(merged, vec![Line::new(10.0, 100.0, 50.0)]);
    }

    #[test]
    fn test_disjoint_lines_on_one_row_are_kept() {
        let vector = vec![Line::new(10.0, 50.0, 50.0)];
        let raster = vec![Line::new(200.0, 250.0, 50.0)];
        let merged = merge_lines(&vector, &raster, &LineTolerances::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_separate_rows_are_kept() {
        let lines = vec![
            Line::new(10.0, 100.0, 50.0),
            Line::new(10.0, 100.0, 80.0),
            Line::new(10.0, 100.0, 53.0),
        ];
        let merged = merge_lines(&lines, &[], &LineTolerances::default());
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].y, 50.0);
        assert_eq!(merged[1].y, 80.0);
    }

    #[test]
    fn test_scan_reaches_past_other_lines_in_window() {
        // The duplicate of the first line sits behind an unrelated line at
        // nearly the same height.
        let lines = vec![
            Line::new(10.0, 100.0, 50.0),
            Line::new(300.0, 400.0, 51.0),
            Line::new(12.0, 101.0, 52.0),
        ];
        let merged = merge_lines(&lines, &[], &LineTolerances::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_empty() {
        assert!(merge_lines(&[], &[], &LineTolerances::default()).is_empty());
    }
}
