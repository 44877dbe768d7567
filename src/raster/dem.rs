use crate::geometry::Point3D;
use crate::least_squares::{self, LeastSquares, LineFit};
use crate::{Error, Result, ARCSEC_PER_DEGREE, FG_EPSILON, NO_DATA};

use log::{log, Level};

use std::ops::Index;

/// Inclusive column and row range of the grid that a fit covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitRegion {
    pub col_min: usize,
    pub col_max: usize,
    pub row_min: usize,
    pub row_max: usize,
}

impl FitRegion {
    pub fn whole(cols: usize, rows: usize) -> FitRegion {
        FitRegion {
            col_min: 0,
            col_max: cols.saturating_sub(1),
            row_min: 0,
            row_max: rows.saturating_sub(1),
        }
    }

    /// One of the `divisions` x `divisions` buckets a DEM is split into,
    /// neighbouring buckets share their edge rows and columns.
    pub fn bucket(
        cols: usize,
        rows: usize,
        x: usize,
        y: usize,
        divisions: usize,
    ) -> Result<FitRegion> {
        if divisions == 0 || x >= divisions || y >= divisions {
            return Err(Error::InvalidGrid(format!(
                "bucket ({x}, {y}) is not part of a {divisions}x{divisions} subdivision"
            )));
        }
        let col_span = (cols.saturating_sub(1)) / divisions;
        let row_span = (rows.saturating_sub(1)) / divisions;
        if col_span == 0 || row_span == 0 {
            return Err(Error::InvalidGrid(format!(
                "a {cols}x{rows} grid is too small for {divisions} divisions"
            )));
        }

        Ok(FitRegion {
            col_min: x * col_span,
            col_max: x * col_span + col_span,
            row_min: y * row_span,
            row_max: y * row_span + row_span,
        })
    }

    // sw, se, ne, nw
    pub fn corners(&self) -> [(usize, usize); 4] {
        [
            (self.col_min, self.row_min),
            (self.col_max, self.row_min),
            (self.col_max, self.row_max),
            (self.col_min, self.row_max),
        ]
    }

    fn is_corner(&self, col: usize, row: usize) -> bool {
        (col == self.col_min || col == self.col_max) && (row == self.row_min || row == self.row_max)
    }
}

/// Dense elevation raster.
///
/// Origin and steps are in arc seconds, cells are stored column by column
/// starting at the south west corner. The raster is never modified after
/// construction, a fit writes into its own `FittedGrid`.
#[derive(Clone, Debug)]
pub struct DemGrid {
    origin_x: f64,
    origin_y: f64,
    cols: usize,
    rows: usize,
    col_step: f64,
    row_step: f64,
    field: Vec<f64>,
}

impl DemGrid {
    pub fn new(
        origin: (f64, f64),
        cols: usize,
        col_step: f64,
        rows: usize,
        row_step: f64,
        field: Vec<f64>,
    ) -> Result<DemGrid> {
        if cols < 2 || rows < 2 {
            return Err(Error::InvalidGrid(format!(
                "need at least 2x2 samples, got {cols}x{rows}"
            )));
        }
        if !(col_step > 0. && row_step > 0. && col_step.is_finite() && row_step.is_finite()) {
            return Err(Error::InvalidGrid(format!(
                "steps must be positive, got {col_step} and {row_step}"
            )));
        }
        if !(origin.0.is_finite() && origin.1.is_finite()) {
            return Err(Error::InvalidGrid("origin is not finite".to_string()));
        }
        if field.len() != cols * rows {
            return Err(Error::InvalidGrid(format!(
                "expected {} samples, got {}",
                cols * rows,
                field.len()
            )));
        }

        Ok(DemGrid {
            origin_x: origin.0,
            origin_y: origin.1,
            cols,
            rows,
            col_step,
            row_step,
            field,
        })
    }

    /// a grid with every sample at the same elevation
    pub fn flat(
        origin: (f64, f64),
        cols: usize,
        col_step: f64,
        rows: usize,
        row_step: f64,
        elevation: f64,
    ) -> Result<DemGrid> {
        DemGrid::new(
            origin,
            cols,
            col_step,
            rows,
            row_step,
            vec![elevation; cols * rows],
        )
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    pub fn steps(&self) -> (f64, f64) {
        (self.col_step, self.row_step)
    }

    pub fn whole_region(&self) -> FitRegion {
        FitRegion::whole(self.cols, self.rows)
    }

    /// position of a cell in degrees
    #[inline]
    pub fn index2point(&self, col: usize, row: usize, z: f64) -> Point3D {
        Point3D::new(
            (self.origin_x + col as f64 * self.col_step) / ARCSEC_PER_DEGREE,
            (self.origin_y + row as f64 * self.row_step) / ARCSEC_PER_DEGREE,
            z,
        )
    }

    pub fn fit(&self, error: f64) -> Result<FittedGrid<'_>> {
        self.fit_region(error, self.whole_region())
    }

    /// Least squares simplification of one region.
    ///
    /// Every row is cut into runs whose largest squared residual against
    /// their best fit line stays within `error`, only the run boundaries
    /// and the region corners are kept.
    pub fn fit_region(&self, error: f64, region: FitRegion) -> Result<FittedGrid<'_>> {
        self.check_region(&region)?;
        if !(error >= 0.) {
            return Err(Error::InvalidGrid(format!("invalid fit error {error}")));
        }

        let mut fitted = FittedGrid::new(self, region);

        // include the corners explicitly, neighbouring tiles must agree on them
        for (col, row) in region.corners() {
            fitted.set_output(col, row, self[(col, row)])?;
        }

        let run_capacity = region.col_max - region.col_min + 1;
        let mut x = Vec::with_capacity(run_capacity);
        let mut y = Vec::with_capacity(run_capacity);

        for row in region.row_min..=region.row_max {
            let mut start = region.col_min;
            let mut last_z = 0.;

            while start < region.col_max {
                x.clear();
                y.clear();

                let mut acc = LeastSquares::default();
                for col in start..=start + 1 {
                    x.push(col as f64 * self.col_step);
                    y.push(self[(col, row)]);
                    acc.push(col as f64 * self.col_step, self[(col, row)]);
                }
                let mut end = start + 1;

                // grow the run until the worst residual breaks the tolerance
                while end < region.col_max {
                    let next = end + 1;
                    let (xi, yi) = (next as f64 * self.col_step, self[(next, row)]);
                    x.push(xi);
                    y.push(yi);
                    let fit = acc.update(xi, yi);

                    if least_squares::max_error(&x, &y, fit) > error {
                        // back up to the last good enough fit
                        x.pop();
                        y.pop();
                        break;
                    }
                    end = next;
                }

                let fit: LineFit = least_squares::least_squares(&x, &y);

                if start > region.col_min {
                    // average with the previous run to avoid a seam
                    let cur_z = fit.at(x[0]);
                    fitted.set_output(start, row, (last_z + cur_z) / 2.)?;
                }

                last_z = fit.at(x[x.len() - 1]);
                start = end;
            }
        }

        log!(
            Level::Debug,
            "Fitted region {:?} with error {error}, kept {} of {} cells",
            region,
            fitted.kept(),
            fitted.output.len()
        );
        Ok(fitted)
    }

    /// the four region corners with their raw elevations, sw, se, ne, nw
    pub fn corner_points(&self, region: &FitRegion) -> Result<[Point3D; 4]> {
        self.check_region(region)?;
        Ok(region
            .corners()
            .map(|(col, row)| self.index2point(col, row, self[(col, row)])))
    }

    /// Elevation at a position given in arc seconds.
    ///
    /// Each cell is split along its sw-ne diagonal and the value is
    /// interpolated on the plane of the triangle the position falls in.
    pub fn interpolate_altitude(&self, lon: f64, lat: f64) -> Result<f64> {
        let outside = Error::OutsideGrid { x: lon, y: lat };

        let mut x_local = (lon - self.origin_x) / self.col_step;
        let mut y_local = (lat - self.origin_y) / self.row_step;

        // tolerate round off from the degree to arc second conversion
        let max_x = (self.cols - 1) as f64;
        let max_y = (self.rows - 1) as f64;
        if !(x_local >= -FG_EPSILON
            && y_local >= -FG_EPSILON
            && x_local <= max_x + FG_EPSILON
            && y_local <= max_y + FG_EPSILON)
        {
            return Err(outside);
        }
        x_local = x_local.clamp(0., max_x);
        y_local = y_local.clamp(0., max_y);

        let mut x_index = x_local.floor() as usize;
        let mut y_index = y_local.floor() as usize;
        if x_index + 1 >= self.cols {
            x_index = self.cols - 2;
        }
        if y_index + 1 >= self.rows {
            y_index = self.rows - 2;
        }

        let dx = x_local - x_index as f64;
        let dy = y_local - y_index as f64;

        let z1 = self[(x_index, y_index)];
        let z3 = self[(x_index + 1, y_index + 1)];

        let elevation = if dx > dy {
            // lower triangle
            let z2 = self[(x_index + 1, y_index)];
            let z_a = dx * (z2 - z1) + z1;
            let z_b = dx * (z3 - z1) + z1;
            if dx > FG_EPSILON {
                dy * (z_b - z_a) / dx + z_a
            } else {
                z_a
            }
        } else {
            // upper triangle
            let z2 = self[(x_index, y_index + 1)];
            let z_a = dy * (z2 - z1) + z1;
            let z_b = dy * (z3 - z1) + z1;
            if dy > FG_EPSILON {
                dx * (z_b - z_a) / dy + z_a
            } else {
                z_a
            }
        };

        Ok(elevation)
    }

    /// same as `interpolate_altitude` for a position in degrees
    pub fn altitude_at(&self, point: &Point3D) -> Result<f64> {
        self.interpolate_altitude(point.x * ARCSEC_PER_DEGREE, point.y * ARCSEC_PER_DEGREE)
            .map_err(|_| Error::OutsideGrid {
                x: point.x,
                y: point.y,
            })
    }

    fn check_region(&self, region: &FitRegion) -> Result<()> {
        if region.col_min >= region.col_max
            || region.row_min >= region.row_max
            || region.col_max >= self.cols
            || region.row_max >= self.rows
        {
            return Err(Error::InvalidGrid(format!(
                "region {region:?} does not fit a {}x{} grid",
                self.cols, self.rows
            )));
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for DemGrid {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.field[index.0 * self.rows + index.1]
    }
}

/// Sparse result of fitting one region of a `DemGrid`.
///
/// Only the region is stored, cells are still addressed by grid column and
/// row. Cells the fit did not keep read as `NO_DATA`.
#[derive(Clone, Debug)]
pub struct FittedGrid<'a> {
    dem: &'a DemGrid,
    region: FitRegion,
    output: Vec<f64>,
}

impl<'a> FittedGrid<'a> {
    fn new(dem: &'a DemGrid, region: FitRegion) -> FittedGrid<'a> {
        let len = (region.col_max - region.col_min + 1) * (region.row_max - region.row_min + 1);
        FittedGrid {
            dem,
            region,
            output: vec![NO_DATA; len],
        }
    }

    pub fn dem(&self) -> &'a DemGrid {
        self.dem
    }

    pub fn region(&self) -> FitRegion {
        self.region
    }

    /// fitted elevation of a cell, `NO_DATA` when not kept or outside the region
    pub fn output(&self, col: usize, row: usize) -> f64 {
        self.offset(col, row).map_or(NO_DATA, |i| self.output[i])
    }

    pub fn set_output(&mut self, col: usize, row: usize, z: f64) -> Result<()> {
        let i = self.offset(col, row).ok_or_else(|| {
            Error::InvalidGrid(format!(
                "cell ({col}, {row}) is outside of {:?}",
                self.region
            ))
        })?;
        self.output[i] = z;
        Ok(())
    }

    /// number of kept cells, corners included
    pub fn kept(&self) -> usize {
        self.output.iter().filter(|&&z| z > NO_DATA).count()
    }

    /// the four region corners with their raw elevations, sw, se, ne, nw
    pub fn corner_points(&self) -> [Point3D; 4] {
        self.region
            .corners()
            .map(|(col, row)| self.dem.index2point(col, row, self.dem[(col, row)]))
    }

    /// every kept cell except the region corners, row by row
    pub fn fitted_points(&self) -> Vec<Point3D> {
        let r = &self.region;
        let mut points = Vec::new();
        for row in r.row_min..=r.row_max {
            for col in r.col_min..=r.col_max {
                let z = self.output(col, row);
                if z > NO_DATA && !r.is_corner(col, row) {
                    points.push(self.dem.index2point(col, row, z));
                }
            }
        }
        points
    }

    fn offset(&self, col: usize, row: usize) -> Option<usize> {
        let r = &self.region;
        if col < r.col_min || col > r.col_max || row < r.row_min || row > r.row_max {
            return None;
        }
        Some((col - r.col_min) * (r.row_max - r.row_min + 1) + (row - r.row_min))
    }
}
