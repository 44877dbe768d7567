use crate::clip::{ClipOp, Clipper};
use crate::geometry::{AreaPolygons, FeaturePolygon};
use crate::parameters::MeshParameters;
use crate::raster::{DemGrid, FitRegion};
use crate::steps::{Deadline, TileId};
use crate::triangulate::{poly_file, Pass, TileMesh, TriangulationDriver, Triangulator};
use crate::{Error, Result};

use log::{log, Level};

use std::sync::Arc;

/// One tile of work: a region of a shared grid and the features around it.
#[derive(Debug, Clone)]
pub struct TileJob {
    pub id: TileId,
    pub dem: Arc<DemGrid>,
    pub region: FitRegion,
    pub features: Arc<AreaPolygons>,
}

/// Runs the whole pipeline for one tile: fit, clip, build, triangulate and
/// sample the node elevations.
pub fn build_tile<C: Clipper, T: Triangulator>(
    job: &TileJob,
    params: &MeshParameters,
    clipper: &C,
    triangulator: T,
) -> Result<TileMesh> {
    let deadline = Deadline::start(params.tile_budget);
    log!(Level::Info, "Tile {}: fitting {:?}", job.id, job.region);

    let fit = job.dem.fit_region(params.fit_error, job.region)?;
    let corners = fit.corner_points();
    let fitted = fit.fitted_points();
    deadline.check()?;

    let tile = FeaturePolygon::from_exterior(corners.iter().map(|p| p.coord()).collect())?;
    let clipped = clip_features(&job.features, &tile, clipper)?;
    deadline.check()?;

    let mut driver =
        TriangulationDriver::new(triangulator).with_steiner_limit(params.max_steiner_points);
    driver.build(&corners, &fitted, &clipped)?;
    if let Some(dir) = &params.debug_dump {
        poly_file::write_triangle_input(dir, &job.id.stem(), &driver.input()?)?;
    }
    deadline.check()?;

    driver.run_triangulate(Pass::Quality {
        min_angle: params.min_angle,
    })?;
    deadline.check()?;

    let mut mesh = driver.into_mesh()?;
    mesh.assign_elevations(&job.dem)?;
    if let Some(dir) = &params.debug_dump {
        poly_file::write_triangles(dir, &job.id.stem(), &mesh.triangles)?;
    }

    if deadline.is_close() {
        log!(
            Level::Warn,
            "Tile {} used {:?} of its {:?} budget",
            job.id,
            deadline.elapsed(),
            params.tile_budget
        );
    }
    log!(
        Level::Info,
        "Tile {}: {} nodes, {} triangles in {:?}",
        job.id,
        mesh.nodes.len(),
        mesh.triangles.len(),
        deadline.elapsed()
    );
    Ok(mesh)
}

/// Cuts the features to the tile and removes every overlap, a feature
/// keeps only what no higher priority feature already covers.
pub fn clip_features<C: Clipper>(
    features: &AreaPolygons,
    tile: &FeaturePolygon,
    clipper: &C,
) -> Result<AreaPolygons> {
    let mut accum = FeaturePolygon::new();
    let mut clipped = AreaPolygons::new();

    for (area, polygons) in features.iter() {
        for (index, polygon) in polygons.iter().enumerate() {
            if polygon.is_empty() {
                return Err(Error::NoContours {
                    area,
                    polygon: index,
                });
            }

            let inside = clipper.clip(ClipOp::Int, polygon, tile)?;
            let result = clipper.clip(ClipOp::Diff, &inside, &accum)?;
            if result.is_empty() {
                log!(
                    Level::Debug,
                    "{area} polygon {index} is covered or outside of the tile"
                );
                continue;
            }

            accum = clipper.clip(ClipOp::Union, &accum, &result)?;
            clipped.push(area, result);
        }
    }
    Ok(clipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::GeoClipper;
    use crate::geometry::{AreaType, Point3D};
    use crate::triangulate::SpadeTriangulator;

    use geo::{coord, Area, Contains, Coord, Point};

    const STEP: f64 = 3.;

    // a flat grid of 3 arc second cells with its south west corner at 0, 0
    fn job(cells: usize, features: AreaPolygons) -> Result<TileJob> {
        let dem = DemGrid::flat((0., 0.), cells + 1, STEP, cells + 1, STEP, 100.)?;
        let region = dem.whole_region();
        Ok(TileJob {
            id: TileId::new(1, 2),
            dem: Arc::new(dem),
            region,
            features: Arc::new(features),
        })
    }

    fn deg(arcsec: f64) -> f64 {
        arcsec / 3600.
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * b.abs()
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<Coord> {
        vec![
            coord! { x: deg(x), y: deg(y) },
            coord! { x: deg(x + size), y: deg(y) },
            coord! { x: deg(x + size), y: deg(y + size) },
            coord! { x: deg(x), y: deg(y + size) },
        ]
    }

    #[test]
    fn flat_quadrant_is_two_triangles() -> Result<()> {
        let mesh = build_tile(
            &job(1, AreaPolygons::new())?,
            &MeshParameters::default(),
            &GeoClipper,
            SpadeTriangulator,
        )?;

        assert_eq!(mesh.nodes.len(), 4);
        assert_eq!(mesh.triangles.len(), 2);
        assert!(mesh.triangles.iter().all(|t| t.attribute == 0));
        assert!(mesh.nodes.iter().all(|n| n.z == 100.));
        Ok(())
    }

    #[test]
    fn airport_ignore_area_becomes_a_hole() -> Result<()> {
        let hole = square(3., 3., 5.);
        let mut features = AreaPolygons::new();
        features.push(AreaType::AirportIgnore, FeaturePolygon::from_exterior(hole.clone())?);

        let mesh = build_tile(
            &job(4, features)?,
            &MeshParameters::default(),
            &GeoClipper,
            SpadeTriangulator,
        )?;

        let hole = geo::Polygon::new(hole.into(), vec![]);
        for t in mesh.triangles.iter() {
            let c = mesh.centroid(t);
            assert!(!hole.contains(&Point::new(c.x, c.y)));
        }
        let tile_area = deg(12.) * deg(12.);
        assert!(close(mesh.area(), tile_area - hole.unsigned_area()));
        Ok(())
    }

    #[test]
    fn shared_vertex_is_one_node() -> Result<()> {
        // the lake starts exactly on the south west tile corner
        let mut features = AreaPolygons::new();
        features.push(AreaType::Lake, FeaturePolygon::from_exterior(square(0., 0., 4.))?);

        let mesh = build_tile(
            &job(4, features)?,
            &MeshParameters::default(),
            &GeoClipper,
            SpadeTriangulator,
        )?;

        let origin = Point3D::from_xy(0., 0.);
        let copies = mesh
            .nodes
            .iter()
            .filter(|n| n.squared_distance_2d(&origin) < 1e-20)
            .count();
        assert_eq!(copies, 1);
        assert!(mesh
            .triangles
            .iter()
            .any(|t| t.attribute == AreaType::Lake.code()));
        Ok(())
    }

    #[test]
    fn higher_priority_features_win() -> Result<()> {
        let tile = FeaturePolygon::from_exterior(square(0., 0., 12.))?;
        let mut features = AreaPolygons::new();
        features.push(AreaType::Urban, FeaturePolygon::from_exterior(square(3., 3., 6.))?);
        features.push(AreaType::Lake, FeaturePolygon::from_exterior(square(0., 0., 6.))?);
        // entirely outside of the tile
        features.push(AreaType::Marsh, FeaturePolygon::from_exterior(square(20., 20., 2.))?);

        let clipped = clip_features(&features, &tile, &GeoClipper)?;

        let area = |a: AreaType| -> f64 {
            clipped.get(a).iter().map(|p| p.to_geo().unsigned_area()).sum()
        };
        assert!(close(area(AreaType::Lake), deg(6.) * deg(6.)));
        assert!(close(area(AreaType::Urban), 27. / 3600. / 3600.));
        assert!(clipped.get(AreaType::Marsh).is_empty());
        Ok(())
    }

    #[test]
    fn zero_contour_feature_aborts_the_tile() -> Result<()> {
        let mut features = AreaPolygons::new();
        features.push(AreaType::Canal, FeaturePolygon::new());

        let result = build_tile(
            &job(2, features)?,
            &MeshParameters::default(),
            &GeoClipper,
            SpadeTriangulator,
        );

        assert!(matches!(result, Err(Error::NoContours { .. })));
        Ok(())
    }
}
