//! Named anchors and the geometry used to place a dialog surface.

use serde::{Deserialize, Serialize};

/// Surface size in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Area a surface is placed in (a monitor work area or a parent window)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// The nine positions a dialog can be anchored to.
///
/// Names follow the dialog library (`top-start`, `center-end`, ...); the
/// `start` side is the left edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    Top,
    TopStart,
    TopEnd,
    #[default]
    Center,
    CenterStart,
    CenterEnd,
    Bottom,
    BottomStart,
    BottomEnd,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::Top,
        Anchor::TopStart,
        Anchor::TopEnd,
        Anchor::Center,
        Anchor::CenterStart,
        Anchor::CenterEnd,
        Anchor::Bottom,
        Anchor::BottomStart,
        Anchor::BottomEnd,
    ];

    /// Parse a dialog `position` value.
    pub fn from_name(name: &str) -> Option<Anchor> {
        Anchor::ALL.into_iter().find(|a| a.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::Top => "top",
            Anchor::TopStart => "top-start",
            Anchor::TopEnd => "top-end",
            Anchor::Center => "center",
            Anchor::CenterStart => "center-start",
            Anchor::CenterEnd => "center-end",
            Anchor::Bottom => "bottom",
            Anchor::BottomStart => "bottom-start",
            Anchor::BottomEnd => "bottom-end",
        }
    }

    /// Resolve the anchor for a dialog.
    ///
    /// Unknown or missing names fall back to `top-end` for toasts and to
    /// `center` for everything else.
    pub fn resolve(name: Option<&str>, toast: bool) -> Anchor {
        match name.and_then(Anchor::from_name) {
            Some(anchor) => anchor,
            None if toast => Anchor::TopEnd,
            None => Anchor::Center,
        }
    }

    /// Top-left corner for a surface of `size` anchored inside `area`.
    /// Oversized surfaces get a negative offset; the result saturates at
    /// the `i32` bounds.
    pub fn place(&self, area: Rect, size: Size) -> Point {
        let free_w = i64::from(area.width) - i64::from(size.width);
        let free_h = i64::from(area.height) - i64::from(size.height);

        let x = match self {
            Anchor::TopStart | Anchor::CenterStart | Anchor::BottomStart => 0,
            Anchor::Top | Anchor::Center | Anchor::Bottom => free_w / 2,
            Anchor::TopEnd | Anchor::CenterEnd | Anchor::BottomEnd => free_w,
        };
        let y = match self {
            Anchor::Top | Anchor::TopStart | Anchor::TopEnd => 0,
            Anchor::Center | Anchor::CenterStart | Anchor::CenterEnd => free_h / 2,
            Anchor::Bottom | Anchor::BottomStart | Anchor::BottomEnd => free_h,
        };

        Point {
            x: saturate(i64::from(area.x) + x),
            y: saturate(i64::from(area.y) + y),
        }
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };
    const WINDOW: Size = Size {
        width: 800,
        height: 600,
    };

    #[test]
    fn test_names_round_trip() {
        for anchor in Anchor::ALL {
            assert_eq!(Anchor::from_name(anchor.as_str()), Some(anchor));
        }
        assert_eq!(Anchor::from_name("middle"), None);
    }

    #[test]
    fn test_resolve_defaults() {
        assert_eq!(Anchor::resolve(None, true), Anchor::TopEnd);
        assert_eq!(Anchor::resolve(None, false), Anchor::Center);
        assert_eq!(Anchor::resolve(Some("sideways"), true), Anchor::TopEnd);
        assert_eq!(Anchor::resolve(Some("sideways"), false), Anchor::Center);
        assert_eq!(Anchor::resolve(Some("bottom-start"), true), Anchor::BottomStart);
    }

    #[test]
    fn test_place_corners_and_center() {
        assert_eq!(Anchor::TopStart.place(SCREEN, WINDOW), Point { x: 0, y: 0 });
        assert_eq!(Anchor::TopEnd.place(SCREEN, WINDOW), Point { x: 1120, y: 0 });
        assert_eq!(Anchor::Center.place(SCREEN, WINDOW), Point { x: 560, y: 240 });
        assert_eq!(Anchor::BottomEnd.place(SCREEN, WINDOW), Point { x: 1120, y: 480 });
    }

    #[test]
    fn test_place_respects_area_origin() {
        let second_monitor = Rect {
            x: 1920,
            y: -200,
            width: 1280,
            height: 1024,
        };
        assert_eq!(
            Anchor::CenterStart.place(second_monitor, WINDOW),
            Point { x: 1920, y: 12 }
        );
    }

    #[test]
    fn test_place_huge_size_saturates() {
        let huge = Size {
            width: 2_147_483_648,
            height: u32::MAX,
        };
        assert_eq!(
            Anchor::Center.place(SCREEN, huge),
            Point {
                x: -1_073_740_864,
                y: -2_147_483_107,
            }
        );
        let far = Rect {
            x: -2_000_000_000,
            ..SCREEN
        };
        assert_eq!(Anchor::BottomEnd.place(far, huge).x, i32::MIN);
    }

    #[test]
    fn test_serde_uses_dialog_names() {
        let json = serde_json::to_string(&Anchor::CenterEnd).unwrap();
        assert_eq!(json, "\"center-end\"");
    }
}
