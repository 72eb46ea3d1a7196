//! Rectangular field limits at the isocenter plane.

use serde::{Deserialize, Serialize};

/// A rectangular field limit `[xmin, xmax] x [ymin, ymax]` projected onto
/// the isocenter plane (mm).
///
/// Jaw positions arrive from the treatment plan; the core only intersects
/// them to bound fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jaws {
    /// Lower x jaw position.
    pub xmin: f64,
    /// Upper x jaw position.
    pub xmax: f64,
    /// Lower y jaw position.
    pub ymin: f64,
    /// Upper y jaw position.
    pub ymax: f64,
}

impl Jaws {
    /// Create jaws from the four positions.
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// A square field of the given side length centered on the axis.
    pub fn square(side: f64) -> Self {
        let h = side / 2.0;
        Self::new(-h, h, -h, h)
    }

    /// The overlap of two fields.
    ///
    /// Commutative; if one field contains the other the result is the
    /// smaller. A disjoint pair yields an empty (inverted) rectangle.
    pub fn intersection(&self, other: &Jaws) -> Jaws {
        Jaws {
            xmin: self.xmin.max(other.xmin),
            xmax: self.xmax.min(other.xmax),
            ymin: self.ymin.max(other.ymin),
            ymax: self.ymax.min(other.ymax),
        }
    }

    /// True if `(x, y)` lies within the field.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// True if the field has positive area.
    pub fn is_empty(&self) -> bool {
        self.xmin >= self.xmax || self.ymin >= self.ymax
    }
}
