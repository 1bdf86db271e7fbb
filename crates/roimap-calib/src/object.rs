use crate::CalibError;
use roimap_core::{Pt2, Pt3};
use serde::{Deserialize, Serialize};

/// Minimum number of corners needed to fit a plane homography.
pub const MIN_POINTS_PER_VIEW: usize = 4;

/// Planar grid coordinates `(i * s, j * s, 0)` in raster order (`i + j * cols`).
///
/// The order matches the corner order produced by the chessboard detector.
pub fn object_points(cols: u32, rows: u32, square_size: f64) -> Vec<Pt3> {
    let mut pts = Vec::with_capacity(cols as usize * rows as usize);
    for j in 0..rows {
        for i in 0..cols {
            pts.push(Pt3::new(i as f64 * square_size, j as f64 * square_size, 0.0));
        }
    }
    pts
}

/// Physical description of a chessboard target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Interior corners per row.
    pub cols: u32,
    /// Interior corners per column.
    pub rows: u32,
    /// Square edge length, in the depth unit (typically mm).
    pub square_size: f64,
}

impl TargetSpec {
    pub fn new(cols: u32, rows: u32, square_size: f64) -> Self {
        Self {
            cols,
            rows,
            square_size,
        }
    }

    pub fn corner_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn object_points(&self) -> Vec<Pt3> {
        object_points(self.cols, self.rows, self.square_size)
    }
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self::new(9, 6, 25.0)
    }
}

/// One target view seen by a single camera.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanarView {
    pub image: Vec<Pt2>,
    pub object: Vec<Pt3>,
}

impl PlanarView {
    pub fn new(image: Vec<Pt2>, object: Vec<Pt3>) -> Result<Self, CalibError> {
        if image.len() != object.len() {
            return Err(CalibError::ViewLengthMismatch {
                image: image.len(),
                object: object.len(),
            });
        }
        check_count(image.len())?;
        Ok(Self { image, object })
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

/// Matched corners of one image pair plus their object-space coordinates.
///
/// Index `k` of `camera1`, `camera2` and `object` refers to the same
/// physical corner.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrespondenceSet {
    camera1: Vec<Pt2>,
    camera2: Vec<Pt2>,
    object: Vec<Pt3>,
}

impl CorrespondenceSet {
    pub fn new(camera1: Vec<Pt2>, camera2: Vec<Pt2>, object: Vec<Pt3>) -> Result<Self, CalibError> {
        if camera1.len() != object.len() || camera2.len() != object.len() {
            return Err(CalibError::MismatchedLengths {
                camera1: camera1.len(),
                camera2: camera2.len(),
                object: object.len(),
            });
        }
        check_count(object.len())?;
        Ok(Self {
            camera1,
            camera2,
            object,
        })
    }

    /// Build a set for a chessboard seen in both cameras.
    pub fn from_target(
        target: &TargetSpec,
        camera1: Vec<Pt2>,
        camera2: Vec<Pt2>,
    ) -> Result<Self, CalibError> {
        Self::new(camera1, camera2, target.object_points())
    }

    pub fn camera1(&self) -> &[Pt2] {
        &self.camera1
    }

    pub fn camera2(&self) -> &[Pt2] {
        &self.camera2
    }

    pub fn object(&self) -> &[Pt3] {
        &self.object
    }

    pub fn len(&self) -> usize {
        self.object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object.is_empty()
    }

    pub fn view1(&self) -> PlanarView {
        PlanarView {
            image: self.camera1.clone(),
            object: self.object.clone(),
        }
    }

    pub fn view2(&self) -> PlanarView {
        PlanarView {
            image: self.camera2.clone(),
            object: self.object.clone(),
        }
    }
}

fn check_count(n: usize) -> Result<(), CalibError> {
    if n == 0 {
        return Err(CalibError::EmptyCorrespondences);
    }
    if n < MIN_POINTS_PER_VIEW {
        return Err(CalibError::TooFewPoints {
            found: n,
            required: MIN_POINTS_PER_VIEW,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_points_follow_raster_order() {
        let pts = object_points(4, 3, 25.0);
        assert_eq!(pts.len(), 12);
        assert_eq!(pts[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[1], Pt3::new(25.0, 0.0, 0.0));
        assert_eq!(pts[4], Pt3::new(0.0, 25.0, 0.0));
        assert_eq!(pts[11], Pt3::new(75.0, 50.0, 0.0));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let obj = object_points(2, 2, 1.0);
        let a = vec![Pt2::origin(); 4];
        let b = vec![Pt2::origin(); 3];
        let err = CorrespondenceSet::new(a, b, obj).unwrap_err();
        assert_eq!(
            err,
            CalibError::MismatchedLengths {
                camera1: 4,
                camera2: 3,
                object: 4
            }
        );
    }

    #[test]
    fn view_length_mismatch_names_both_counts() {
        let err = PlanarView::new(vec![Pt2::origin(); 5], object_points(2, 2, 1.0)).unwrap_err();
        assert_eq!(
            err,
            CalibError::ViewLengthMismatch {
                image: 5,
                object: 4
            }
        );
    }

    #[test]
    fn empty_and_tiny_sets_are_rejected() {
        assert_eq!(
            CorrespondenceSet::new(vec![], vec![], vec![]).unwrap_err(),
            CalibError::EmptyCorrespondences
        );
        let obj = object_points(3, 1, 1.0);
        let img = vec![Pt2::origin(); 3];
        assert!(matches!(
            CorrespondenceSet::new(img.clone(), img, obj),
            Err(CalibError::TooFewPoints { found: 3, .. })
        ));
    }
}
