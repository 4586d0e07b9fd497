//! Placement of the mention dropdown relative to the trigger's on-screen
//! cell.

use ratatui::layout::Rect;

/// Compute the dropdown rectangle for an anchor cell (the `@` of the live
/// trigger). The popup opens on the row below the anchor when it fits,
/// flips above when it does not, and when neither side has room it takes
/// whichever side has more space, truncated to fit.
pub fn dropdown_area(anchor: (u16, u16), frame: Rect, width: u16, height: u16) -> Rect {
    let (anchor_x, anchor_y) = anchor;
    let width = width.min(frame.width).max(1);
    let height = height.max(1);

    let below_top = anchor_y.saturating_add(1);
    let space_below = frame.bottom().saturating_sub(below_top);
    let space_above = anchor_y.saturating_sub(frame.y);

    let (y, height) = if space_below >= height {
        (below_top, height)
    } else if space_above >= height {
        (anchor_y - height, height)
    } else if space_above > space_below {
        (frame.y, space_above.min(height).max(1))
    } else {
        (below_top.min(frame.bottom().saturating_sub(1)), space_below.min(height).max(1))
    };

    let max_x = frame.right().saturating_sub(width);
    let x = anchor_x.min(max_x).max(frame.x);

    Rect {
        x,
        y,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Rect {
        Rect::new(0, 0, 80, 24)
    }

    #[test]
    fn opens_below_when_there_is_room() {
        let area = dropdown_area((10, 5), frame(), 40, 6);
        assert_eq!(area.y, 6);
        assert_eq!(area.height, 6);
        assert_eq!(area.x, 10);
    }

    #[test]
    fn flips_above_when_below_is_tight() {
        // anchor near the bottom: 24 - 21 = 3 rows below, 20 above
        let area = dropdown_area((10, 20), frame(), 40, 6);
        assert_eq!(area.y, 14);
        assert_eq!(area.height, 6);
        assert!(area.bottom() <= 20);
    }

    #[test]
    fn neither_side_fits_prefers_the_larger_side() {
        let short = Rect::new(0, 0, 80, 8);
        // anchor at row 5: 2 rows below, 5 above — above wins, truncated
        let area = dropdown_area((0, 5), short, 40, 6);
        assert_eq!(area.y, 0);
        assert_eq!(area.height, 5);

        // anchor at row 2: 5 rows below, 2 above — below wins, truncated
        let area = dropdown_area((0, 2), short, 40, 6);
        assert_eq!(area.y, 3);
        assert_eq!(area.height, 5);
    }

    #[test]
    fn horizontal_position_clamps_into_the_frame() {
        let area = dropdown_area((70, 5), frame(), 40, 6);
        assert_eq!(area.right(), 80);

        let narrow = Rect::new(0, 0, 20, 24);
        let area = dropdown_area((5, 5), narrow, 40, 6);
        assert_eq!(area.x, 0);
        assert_eq!(area.width, 20);
    }
}
