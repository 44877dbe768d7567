use crate::clip::GeoClipper;
use crate::parameters::MeshParameters;
use crate::steps::{build_tile, TileId, TileJob};
use crate::triangulate::{SpadeTriangulator, TileMesh};
use crate::{Error, Result};

use log::{log, Level};

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};

type Queue = Arc<Mutex<VecDeque<(usize, TileJob)>>>;

#[derive(Debug)]
pub struct TileOutcome {
    pub id: TileId,
    pub result: Result<TileMesh>,
}

/// Meshes every job on `params.threads` workers.
///
/// Each tile is owned by the worker that picked it. A failing or panicking
/// tile is reported in its outcome and does not affect the others. The
/// outcomes are in the order of `jobs`.
pub fn run_batch(jobs: Vec<TileJob>, params: &MeshParameters) -> Vec<TileOutcome> {
    let ids: Vec<TileId> = jobs.iter().map(|j| j.id).collect();
    let num_threads = params.threads.clamp(1, jobs.len().max(1));
    log!(
        Level::Info,
        "Meshing {} tiles on {num_threads} threads",
        jobs.len()
    );

    let queue: Queue = Arc::new(Mutex::new(jobs.into_iter().enumerate().collect()));
    let (tx, rx) = mpsc::channel();

    let mut thread_handles = Vec::with_capacity(num_threads);
    for thread_i in 0..num_threads {
        let queue = queue.clone();
        let tx = tx.clone();
        let params = params.clone();

        match std::thread::Builder::new()
            .name(format!("tile-worker-{thread_i}"))
            .stack_size(crate::STACK_SIZE * 1024 * 1024)
            .spawn(move || work(&queue, &tx, &params))
        {
            Ok(handle) => thread_handles.push(handle),
            Err(e) => log!(Level::Warn, "Could not spawn worker {thread_i}: {e}"),
        }
    }
    if thread_handles.is_empty() {
        work(&queue, &tx, params);
    }
    drop(tx);

    let mut results: Vec<Option<Result<TileMesh>>> = ids.iter().map(|_| None).collect();
    for (i, result) in rx {
        results[i] = Some(result);
    }
    for handle in thread_handles {
        if handle.join().is_err() {
            log!(Level::Warn, "A tile worker exited with a panic");
        }
    }

    let outcomes: Vec<TileOutcome> = ids
        .into_iter()
        .zip(results)
        .map(|(id, result)| TileOutcome {
            id,
            result: result.unwrap_or(Err(Error::WorkerPanicked)).map_err(|e| {
                log!(Level::Warn, "Tile {id} failed: {e}");
                Error::Tile {
                    tile: id,
                    source: Box::new(e),
                }
            }),
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    log!(
        Level::Info,
        "Batch done, {} tiles meshed, {failed} failed",
        outcomes.len() - failed
    );
    outcomes
}

fn work(queue: &Queue, tx: &Sender<(usize, Result<TileMesh>)>, params: &MeshParameters) {
    loop {
        // the guard is dropped before the tile is processed
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some((i, job)) = next else {
            break;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            build_tile(&job, params, &GeoClipper, SpadeTriangulator)
        }))
        .unwrap_or(Err(Error::WorkerPanicked));

        if tx.send((i, result)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{AreaPolygons, AreaType, FeaturePolygon};
    use crate::raster::{DemGrid, FitRegion};

    fn jobs(features: AreaPolygons) -> Result<Vec<TileJob>> {
        let dem = Arc::new(DemGrid::flat((0., 0.), 9, 3., 9, 3., 40.)?);
        let features = Arc::new(features);
        let mut jobs = Vec::new();
        for y in 0..2 {
            for x in 0..2 {
                jobs.push(TileJob {
                    id: TileId::new(x, y),
                    dem: dem.clone(),
                    region: FitRegion::bucket(9, 9, x as usize, y as usize, 2)?,
                    features: features.clone(),
                });
            }
        }
        Ok(jobs)
    }

    #[test]
    fn outcomes_keep_job_order() -> Result<()> {
        let params = MeshParameters {
            threads: 3,
            ..Default::default()
        };

        let outcomes = run_batch(jobs(AreaPolygons::new())?, &params);

        let ids: Vec<TileId> = outcomes.iter().map(|o| o.id).collect();
        assert_eq!(
            ids,
            vec![
                TileId::new(0, 0),
                TileId::new(1, 0),
                TileId::new(0, 1),
                TileId::new(1, 1)
            ]
        );
        for outcome in outcomes {
            let mesh = outcome.result?;
            assert_eq!(mesh.triangles.len(), 2);
            assert!(mesh.nodes.iter().all(|n| n.z == 40.));
        }
        Ok(())
    }

    #[test]
    fn a_failing_tile_is_reported_alone() -> Result<()> {
        // a feature without any outline, only in the north east tile
        let mut features = AreaPolygons::new();
        features.push(AreaType::Ocean, FeaturePolygon::new());
        let mut jobs = jobs(AreaPolygons::new())?;
        jobs[3].features = Arc::new(features);

        let outcomes = run_batch(
            jobs,
            &MeshParameters {
                threads: 2,
                ..Default::default()
            },
        );

        assert!(outcomes[..3].iter().all(|o| o.result.is_ok()));
        match &outcomes[3].result {
            Err(Error::Tile { tile, source }) => {
                assert_eq!(*tile, TileId::new(1, 1));
                assert!(matches!(**source, Error::NoContours { .. }));
            }
            other => panic!("expected a tile error, got {other:?}"),
        }
        Ok(())
    }
}
