//! Fragment geometry and row reconstruction
//!
//! Layout engines report text as unordered fragments with pixel positions.
//! Row reconstruction clusters them by vertical proximity into visual lines
//! so that, for example, an invoice line item and its price end up on the
//! same output line.

use serde::{Deserialize, Serialize};

/// Vertical pixel distance at which a fragment starts a new row
pub const ROW_THRESHOLD: i32 = 50;

/// Separator placed between fragments of one row
pub const COLUMN_SEPARATOR: &str = "    ";

/// Axis-aligned bounding box in integer pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    pub fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Build from engine coordinates `[x0, y0, x1, y1]`, truncating to
    /// whole pixels. Missing trailing coordinates collapse onto the origin.
    pub fn from_coords(coords: &[f64]) -> Option<Self> {
        let x_min = *coords.first()? as i32;
        let y_min = *coords.get(1)? as i32;
        let x_max = coords.get(2).map_or(x_min, |v| *v as i32);
        let y_max = coords.get(3).map_or(y_min, |v| *v as i32);
        Some(Self::new(x_min, y_min, x_max, y_max))
    }

    pub fn width(&self) -> i32 {
        self.x_max.saturating_sub(self.x_min)
    }

    pub fn height(&self) -> i32 {
        self.y_max.saturating_sub(self.y_min)
    }
}

/// One recognized text span with its position on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionFragment {
    pub text: String,
    /// Engine-specific scale
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl RecognitionFragment {
    pub fn new(text: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }

    pub fn x_min(&self) -> i32 {
        self.bbox.x_min
    }

    pub fn y_min(&self) -> i32 {
        self.bbox.y_min
    }
}

/// Fragments judged to lie on the same visual line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fragments: Vec<RecognitionFragment>,
}

impl Row {
    fn start(anchor: RecognitionFragment) -> Self {
        Self {
            fragments: vec![anchor],
        }
    }

    /// First fragment seen for this row; membership is measured against it
    pub fn anchor(&self) -> Option<&RecognitionFragment> {
        self.fragments.first()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    /// Fragments joined left to right with column spacing
    pub fn to_line(&self) -> String {
        self.texts().join(COLUMN_SEPARATOR)
    }

    fn accepts(&self, fragment: &RecognitionFragment, threshold: i32) -> bool {
        self.anchor()
            .is_some_and(|anchor| {
                // Coordinates may sit at the i32 extremes
                (i64::from(fragment.y_min()) - i64::from(anchor.y_min())).abs() < i64::from(threshold)
            })
    }

    fn sort_horizontally(&mut self) {
        self.fragments.sort_by_key(|f| f.x_min());
    }
}

/// Cluster fragments into rows.
///
/// Fragments are ordered by `(y_min, x_min)`; a fragment joins the current
/// row while its `y_min` is less than `threshold` pixels from the row's
/// anchor, otherwise it opens a new row. Each finished row is ordered by
/// `x_min`. Both sorts are stable, so ties keep engine order.
pub fn group_rows(mut fragments: Vec<RecognitionFragment>, threshold: i32) -> Vec<Row> {
    fragments.sort_by_key(|f| (f.y_min(), f.x_min()));

    let mut rows: Vec<Row> = Vec::new();
    for fragment in fragments {
        match rows.last_mut() {
            Some(row) if row.accepts(&fragment, threshold) => row.fragments.push(fragment),
            _ => rows.push(Row::start(fragment)),
        }
    }

    for row in &mut rows {
        row.sort_horizontally();
    }
    rows
}

/// Rows joined with single newlines
pub fn render_rows(rows: &[Row]) -> String {
    rows.iter().map(Row::to_line).collect::<Vec<_>>().join("\n")
}

/// Group and render in one step
pub fn reconstruct_text(fragments: Vec<RecognitionFragment>, threshold: i32) -> String {
    render_rows(&group_rows(fragments, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fragment at `(y, x)` with an arbitrary passing score
    fn frag(text: &str, y: i32, x: i32) -> RecognitionFragment {
        RecognitionFragment::new(text, 0.9, BoundingBox::new(x, y, x + 10, y + 10))
    }

    #[test]
    fn test_rows_by_vertical_proximity() {
        let fragments = vec![frag("A", 0, 0), frag("B", 5, 50), frag("C", 200, 0)];
        let rows = group_rows(fragments, ROW_THRESHOLD);

        let texts: Vec<Vec<&str>> = rows.iter().map(Row::texts).collect();
        assert_eq!(texts, vec![vec!["A", "B"], vec!["C"]]);
        assert_eq!(render_rows(&rows), "A    B\nC");
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let rows = group_rows(vec![frag("top", 0, 0), frag("next", 50, 0)], 50);
        assert_eq!(rows.len(), 2);

        let rows = group_rows(vec![frag("top", 0, 0), frag("same", 49, 0)], 50);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_membership_measured_from_anchor() {
        // Each step is 30px, but the third fragment is 60px from the anchor
        let rows = group_rows(
            vec![frag("a", 0, 0), frag("b", 30, 10), frag("c", 60, 20)],
            50,
        );
        let texts: Vec<Vec<&str>> = rows.iter().map(Row::texts).collect();
        assert_eq!(texts, vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn test_row_sorted_left_to_right() {
        // Price sits slightly higher than the description but further right
        let text = reconstruct_text(
            vec![frag("$12.50", 100, 400), frag("Widget", 104, 20), frag("x2", 101, 200)],
            ROW_THRESHOLD,
        );
        assert_eq!(text, "Widget    x2    $12.50");
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let forward = vec![frag("Total", 300, 10), frag("Item", 100, 10), frag("9.99", 102, 300)];
        let mut reversed = forward.clone();
        reversed.reverse();

        assert_eq!(
            reconstruct_text(forward, ROW_THRESHOLD),
            reconstruct_text(reversed, ROW_THRESHOLD)
        );
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let far_top = RecognitionFragment::new("top", 0.9, BoundingBox::from_coords(&[0.0, -3e9, 10.0, -3e9]).unwrap());
        let far_bottom =
            RecognitionFragment::new("bottom", 0.9, BoundingBox::from_coords(&[0.0, 3e9, 10.0, 3e9]).unwrap());
        assert_eq!(far_top.y_min(), i32::MIN);
        assert_eq!(far_bottom.y_min(), i32::MAX);

        let text = reconstruct_text(vec![far_bottom, far_top], ROW_THRESHOLD);
        assert_eq!(text, "top\nbottom");

        let wide = BoundingBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(wide.width(), i32::MAX);
        assert_eq!(wide.height(), i32::MAX);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_rows(Vec::new(), ROW_THRESHOLD).is_empty());
        assert_eq!(reconstruct_text(Vec::new(), ROW_THRESHOLD), "");
    }

    #[test]
    fn test_bbox_from_coords_truncates() {
        let bbox = BoundingBox::from_coords(&[10.9, 20.2, 110.0, 40.7]).unwrap();
        assert_eq!(bbox, BoundingBox::new(10, 20, 110, 40));
        assert_eq!(bbox.width(), 100);
        assert_eq!(bbox.height(), 20);

        assert_eq!(
            BoundingBox::from_coords(&[3.0, 4.0]),
            Some(BoundingBox::new(3, 4, 3, 4))
        );
        assert!(BoundingBox::from_coords(&[1.0]).is_none());
    }
}
