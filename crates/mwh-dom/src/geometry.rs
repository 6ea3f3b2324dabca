//! Geometry
//!
//! Client rects and intersection-root margins.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomError;

/// DOM rect
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DOMRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DOMRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f32 { self.y }
    pub fn left(&self) -> f32 { self.x }
    pub fn right(&self) -> f32 { self.x + self.width }
    pub fn bottom(&self) -> f32 { self.y + self.height }

    /// Calculate intersection with another rect
    pub fn intersect(&self, other: &DOMRect) -> Option<DOMRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > x && bottom > y {
            Some(DOMRect {
                x,
                y,
                width: right - x,
                height: bottom - y,
            })
        } else {
            None
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether a point lies inside the rect (edges inclusive)
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Translate by a scroll offset
    pub fn offset(&self, dx: f32, dy: f32) -> DOMRect {
        DOMRect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// One side of a root margin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MarginValue {
    Px(f32),
    Percent(f32),
}

impl MarginValue {
    /// Resolve against the root's extent on this side's axis
    pub fn resolve(&self, extent: f32) -> f32 {
        match *self {
            MarginValue::Px(px) => px,
            MarginValue::Percent(p) => extent * p / 100.0,
        }
    }
}

impl FromStr for MarginValue {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomError::InvalidMargin(s.to_string());
        if let Some(px) = s.strip_suffix("px") {
            px.parse().map(MarginValue::Px).map_err(|_| invalid())
        } else if let Some(pct) = s.strip_suffix('%') {
            pct.parse().map(MarginValue::Percent).map_err(|_| invalid())
        } else if s.parse::<f32>().map(|v| v == 0.0).unwrap_or(false) {
            // Unitless values are only valid for zero
            Ok(MarginValue::Px(0.0))
        } else {
            Err(invalid())
        }
    }
}

/// Intersection root margin in CSS shorthand order (top, right, bottom, left).
///
/// Positive values grow the root so targets count as intersecting before they
/// reach the viewport edge; negative values shrink it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl RootMargin {
    pub const ZERO: RootMargin = RootMargin {
        top: MarginValue::Px(0.0),
        right: MarginValue::Px(0.0),
        bottom: MarginValue::Px(0.0),
        left: MarginValue::Px(0.0),
    };

    /// Same margin above and below, nothing on the sides
    pub fn vertical(px: f32) -> Self {
        Self {
            top: MarginValue::Px(px),
            bottom: MarginValue::Px(px),
            ..Self::ZERO
        }
    }

    /// Apply the margin to a root rect
    pub fn expand(&self, root: DOMRect) -> DOMRect {
        let top = self.top.resolve(root.height);
        let bottom = self.bottom.resolve(root.height);
        let left = self.left.resolve(root.width);
        let right = self.right.resolve(root.width);

        DOMRect {
            x: root.x - left,
            y: root.y - top,
            width: (root.width + left + right).max(0.0),
            height: (root.height + top + bottom).max(0.0),
        }
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::ZERO
    }
}

impl FromStr for RootMargin {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split_whitespace()
            .map(str::parse::<MarginValue>)
            .collect::<Result<Vec<_>, _>>()?;

        let (top, right, bottom, left) = match values.as_slice() {
            [all] => (*all, *all, *all, *all),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return Err(DomError::InvalidMargin(s.to_string())),
        };
        Ok(Self { top, right, bottom, left })
    }
}
