use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "parallel")]
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    height_field::{HeightField, PixelRow},
    sampler::{ObliquePlaneSampler, PlaneBasis, PlaneView},
    types::{DepthValue, LatticePoint, ThresholdWindow, Vector, Voxel},
    volume::Volume,
};

/// Everything a scan needs besides the volume itself.
///
/// Defaults match the command-line defaults:
///
/// ```text
/// threshold  (128, 255)     direction  (0, 0, 1)     origin  (0, 0, 1)
/// raster     100 × 100      max_scan   255           background fill off
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScanParams {
    /// Open intensity window a voxel must fall in to count as a hit.
    pub threshold: ThresholdWindow,
    /// Step between successive planes. Need not be normalized.
    pub direction: Vector,
    /// Lattice point the raster centre sits on at step 0.
    pub origin: LatticePoint,
    /// Raster columns, along the plane's first axis.
    pub width: usize,
    /// Raster rows, along the plane's second axis.
    pub height: usize,
    /// Number of depth steps; clamped to the raster's value range.
    pub max_scan: u32,
    /// Close unfilled pixels with the depth of the last hit once the scan completes.
    pub background_last_depth: bool,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            threshold: ThresholdWindow::default(),
            direction: Vector::new(0.0, 0.0, 1.0),
            origin: [0, 0, 1],
            width: 100,
            height: 100,
            max_scan: 255,
            background_last_depth: false,
        }
    }
}

impl ScanParams {
    pub fn with_threshold(mut self, min: i64, max: i64) -> Self {
        self.threshold = ThresholdWindow::new(min, max);
        self
    }

    pub fn with_direction(mut self, direction: Vector) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_origin(mut self, origin: LatticePoint) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_max_scan(mut self, max_scan: u32) -> Self {
        self.max_scan = max_scan;
        self
    }

    pub fn with_background_last_depth(mut self, enabled: bool) -> Self {
        self.background_last_depth = enabled;
        self
    }
}

/// Requested and effective number of depth steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxScan {
    pub requested: u32,
    pub effective: u32,
}

impl MaxScan {
    /// Caps `requested` to the largest depth a `T` raster can store.
    pub fn for_raster<T: DepthValue>(requested: u32) -> Self {
        Self {
            requested,
            effective: requested.min(T::MAX),
        }
    }

    pub fn is_clamped(&self) -> bool {
        self.effective != self.requested
    }
}

/// Depth counter and the last depth at which any pixel was first filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    depth: u32,
    last_hit_depth: u32,
}

impl ScanState {
    /// Next depth step to run (equals the number of steps already run).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn last_hit_depth(&self) -> u32 {
        self.last_hit_depth
    }

    fn record_hit(&mut self, k: u32) {
        debug_assert!(k >= self.last_hit_depth);
        self.last_hit_depth = k;
    }
}

/// Result of a single depth step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub depth: u32,
    /// Pixels first filled at this depth.
    pub hits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Completed,
    /// Stopped before running step `depth`.
    Cancelled { depth: u32 },
}

/// What a finished (or stopped) scan hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome<T> {
    pub field: HeightField<T>,
    pub max_scan: MaxScan,
    pub last_hit_depth: u32,
    pub steps_run: u32,
    pub completed: bool,
    /// Value written by background fill, when it ran.
    pub background: Option<T>,
}

/// Marches an oblique plane through a [`Volume`] and records first hits.
///
/// ```text
/// for k in 0..max_scan:
///     sampler  = plane through origin + direction·k
///     for every unfilled pixel (u, v):
///         if min < volume(sampler(u, v)) < max:
///             field(u, v)    = max_scan - k
///             last_hit_depth = k
/// if background fill:
///     every unfilled pixel = max_scan - last_hit_depth
/// ```
///
/// Depth steps always run in order. With the `parallel` feature the pixel rows
/// of one step are scanned on the Rayon pool.
pub struct ScanEngine<'a, V, T> {
    volume: &'a Volume<V>,
    basis: PlaneBasis,
    params: ScanParams,
    max_scan: MaxScan,
    state: ScanState,
    field: HeightField<T>,
}

impl<'a, V: Voxel, T: DepthValue> ScanEngine<'a, V, T> {
    /// Validates `params` and allocates an unfilled raster.
    ///
    /// Fails on a degenerate direction or an empty raster. An oversized
    /// `max_scan` is clamped with a warning; an empty threshold window only warns.
    pub fn new(volume: &'a Volume<V>, params: ScanParams) -> Result<Self> {
        let basis = PlaneBasis::from_direction(params.direction)?;
        let field = HeightField::new(params.width, params.height)?;

        let max_scan = MaxScan::for_raster::<T>(params.max_scan);
        if max_scan.is_clamped() {
            warn!(
                "max scan {} outside the raster value range, set to max value: {}",
                max_scan.requested, max_scan.effective
            );
        }
        if params.threshold.is_empty() {
            warn!(
                "threshold window ({}, {}) admits no value, nothing will be filled",
                params.threshold.min, params.threshold.max
            );
        }

        info!(
            "scanning {}x{} raster from {:?} along {:?} over {} steps",
            params.width,
            params.height,
            params.origin,
            params.direction.as_slice(),
            max_scan.effective
        );

        Ok(Self {
            volume,
            basis,
            params,
            max_scan,
            state: ScanState::default(),
            field,
        })
    }

    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    pub fn basis(&self) -> &PlaneBasis {
        &self.basis
    }

    pub fn max_scan(&self) -> MaxScan {
        self.max_scan
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The raster as accumulated so far. Every filled pixel is final.
    pub fn field(&self) -> &HeightField<T> {
        &self.field
    }

    pub fn is_complete(&self) -> bool {
        self.state.depth >= self.max_scan.effective
    }

    /// Sampler for depth step `k`.
    pub fn sampler_at(&self, k: u32) -> ObliquePlaneSampler {
        ObliquePlaneSampler::at_step(
            self.params.origin,
            &self.basis,
            k,
            self.params.width,
            self.params.height,
        )
    }

    /// Runs the next depth step. Returns `None` once every step has run.
    pub fn step(&mut self) -> Option<StepReport> {
        if self.is_complete() {
            return None;
        }
        let k = self.state.depth;
        let view = PlaneView::new(self.volume, self.sampler_at(k), self.params.width, self.params.height);
        let value = T::from_depth(self.max_scan.effective - k);

        let hits = scan_plane(&view, self.params.threshold, value, &mut self.field);
        if hits > 0 {
            self.state.record_hit(k);
            debug!("depth {k}: {hits} pixels filled");
        }
        self.state.depth += 1;

        Some(StepReport { depth: k, hits })
    }

    /// Runs every remaining step, then [`finish`](ScanEngine::finish)es.
    pub fn run(mut self) -> ScanOutcome<T> {
        while self.step().is_some() {}
        self.finish()
    }

    /// Runs remaining steps, polling `cancel` before each one.
    ///
    /// A cancelled scan keeps its partial raster; call [`finish`](ScanEngine::finish)
    /// to take it.
    pub fn run_cancellable(&mut self, cancel: &AtomicBool) -> ScanStatus {
        while !self.is_complete() {
            if cancel.load(Ordering::Relaxed) {
                info!("scan cancelled before depth {}", self.state.depth);
                return ScanStatus::Cancelled {
                    depth: self.state.depth,
                };
            }
            self.step();
        }
        ScanStatus::Completed
    }

    /// Applies background fill (when enabled and the scan completed) and returns the raster.
    pub fn finish(self) -> ScanOutcome<T> {
        let completed = self.is_complete();
        let mut field = self.field;
        let mut background = None;

        if self.params.background_last_depth {
            if completed {
                let value = T::from_depth(self.max_scan.effective - self.state.last_hit_depth);
                let written = field.fill_background(value);
                debug!("background fill wrote {written} pixels with {value:?}");
                background = Some(value);
            } else {
                warn!("scan stopped early, background fill skipped");
            }
        }

        info!(
            "scan finished after {} steps: {} pixels filled, last hit at depth {}",
            self.state.depth,
            field.filled_count(),
            self.state.last_hit_depth
        );

        ScanOutcome {
            field,
            max_scan: self.max_scan,
            last_hit_depth: self.state.last_hit_depth,
            steps_run: self.state.depth,
            completed,
            background,
        }
    }
}

/// Runs a full scan of `volume` with `params`.
pub fn extract_height_field<V: Voxel, T: DepthValue>(
    volume: &Volume<V>,
    params: ScanParams,
) -> Result<ScanOutcome<T>> {
    Ok(ScanEngine::new(volume, params)?.run())
}

/// Tests every unfilled pixel of `field` against `view` and writes `value` on a hit.
///
/// Returns the number of pixels filled.
fn scan_plane<V: Voxel, T: DepthValue>(
    view: &PlaneView<'_, V>,
    threshold: ThresholdWindow,
    value: T,
    field: &mut HeightField<T>,
) -> usize {
    #[cfg(feature = "parallel")]
    let rows = field.rows_mut().into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let rows = field.rows_mut();

    rows.enumerate()
        .map(|(v, row)| scan_row(view, threshold, value, v, row))
        .sum()
}

#[inline]
fn scan_row<V: Voxel, T: DepthValue>(
    view: &PlaneView<'_, V>,
    threshold: ThresholdWindow,
    value: T,
    v: usize,
    mut row: PixelRow<'_, T>,
) -> usize {
    let mut hits = 0;
    for (u, pixel) in row.iter_mut().enumerate() {
        if pixel.filled {
            continue;
        }
        if let Some(sample) = view.get(u, v) {
            if threshold.contains(sample) && pixel.record_hit(value) {
                hits += 1;
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::AtomicUsize,
    };

    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::{
        Registry,
        layer::{Context, Layer, SubscriberExt},
    };

    use super::*;
    use crate::error::HeightFieldError;

    /// Counts `WARN` events seen while it is the active subscriber.
    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn warnings_while<F: FnOnce()>(f: F) -> usize {
        let counter = WarnCounter::default();
        let subscriber = Registry::default().with(counter.clone());
        tracing::subscriber::with_default(subscriber, f);
        counter.0.load(Ordering::SeqCst)
    }

    fn column_params(size: usize, max_scan: u32) -> ScanParams {
        ScanParams::default()
            .with_origin([size as i64 / 2, size as i64 / 2, 0])
            .with_size(size, size)
            .with_max_scan(max_scan)
    }

    #[test]
    fn max_scan_is_clamped_to_raster_range() {
        assert_eq!(MaxScan::for_raster::<u8>(300), MaxScan { requested: 300, effective: 255 });
        assert!(MaxScan::for_raster::<u8>(300).is_clamped());
        assert!(!MaxScan::for_raster::<u8>(255).is_clamped());
        assert!(!MaxScan::for_raster::<u16>(300).is_clamped());

        let volume = Volume::filled(2, 2, 2, 0u8);
        let engine = ScanEngine::<u8, u8>::new(&volume, ScanParams::default().with_max_scan(1000)).unwrap();
        assert_eq!(engine.max_scan().effective, 255);
    }

    #[test]
    fn clamping_warns_exactly_once() {
        let volume = Volume::filled(4, 4, 4, 200u8);
        let params = ScanParams::default().with_origin([2, 2, 0]).with_size(4, 4);

        let clamped = warnings_while(|| {
            let outcome = extract_height_field::<u8, u8>(&volume, params.clone().with_max_scan(1000)).unwrap();
            assert_eq!(outcome.max_scan.effective, 255);
        });
        assert_eq!(clamped, 1);

        let in_range = warnings_while(|| {
            extract_height_field::<u8, u8>(&volume, params.clone().with_max_scan(255)).unwrap();
        });
        assert_eq!(in_range, 0);
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        let volume = Volume::filled(2, 2, 2, 0u8);
        let zero = ScanParams::default().with_direction(Vector::zeros());
        assert!(matches!(
            ScanEngine::<u8, u8>::new(&volume, zero),
            Err(HeightFieldError::DegenerateDirection)
        ));
        let empty = ScanParams::default().with_size(0, 10);
        assert!(matches!(
            ScanEngine::<u8, u8>::new(&volume, empty),
            Err(HeightFieldError::EmptyRaster)
        ));
    }

    #[test]
    fn hit_depth_is_the_first_matching_step() {
        // Surface depth varies with x: column x first matches at z = x.
        let volume = Volume::from_fn(6, 6, 6, |x, _, z| if z >= x { 200u8 } else { 0 });
        let outcome = extract_height_field::<u8, u8>(&volume, column_params(6, 6)).unwrap();
        for v in 0..6 {
            for u in 0..6 {
                assert_eq!(outcome.field.get(u, v), (6 - u) as u8);
                assert!(outcome.field.is_filled(u, v));
            }
        }
        assert_eq!(outcome.last_hit_depth, 5);
    }

    #[test]
    fn steps_report_hits_and_track_last_hit_depth() {
        let volume = Volume::from_fn(4, 4, 4, |x, _, z| if (z == 1 && x < 2) || z == 3 { 200u8 } else { 0 });
        let mut engine = ScanEngine::<u8, u8>::new(&volume, column_params(4, 4)).unwrap();

        assert_eq!(engine.step(), Some(StepReport { depth: 0, hits: 0 }));
        assert_eq!(engine.step(), Some(StepReport { depth: 1, hits: 8 }));
        assert_eq!(engine.state().last_hit_depth(), 1);
        assert_eq!(engine.step(), Some(StepReport { depth: 2, hits: 0 }));
        assert_eq!(engine.state().last_hit_depth(), 1);
        assert_eq!(engine.step(), Some(StepReport { depth: 3, hits: 8 }));
        assert_eq!(engine.state().last_hit_depth(), 3);
        assert_eq!(engine.step(), None);

        let outcome = engine.finish();
        assert!(outcome.completed);
        assert_eq!(outcome.field.get(0, 0), 3);
        assert_eq!(outcome.field.get(3, 0), 1);
    }

    #[test]
    fn cancelled_scan_keeps_partial_raster_and_skips_background() {
        let volume = Volume::from_fn(4, 4, 4, |x, _, z| if z == x { 200u8 } else { 0 });
        let params = column_params(4, 4).with_background_last_depth(true);
        let mut engine = ScanEngine::<u8, u8>::new(&volume, params).unwrap();

        engine.step();
        engine.step();
        let cancel = AtomicBool::new(true);
        assert_eq!(engine.run_cancellable(&cancel), ScanStatus::Cancelled { depth: 2 });

        let outcome = engine.finish();
        assert!(!outcome.completed);
        assert_eq!(outcome.background, None);
        assert_eq!(outcome.field.filled_count(), 8);
        assert_eq!(outcome.field.get(0, 0), 4);
        assert_eq!(outcome.field.get(1, 2), 3);
        assert_eq!(outcome.field.get(2, 0), 0);
    }

    #[test]
    fn uncancelled_run_completes() {
        let volume = Volume::filled(4, 4, 4, 200u8);
        let mut engine = ScanEngine::<u8, u8>::new(&volume, column_params(4, 4)).unwrap();
        assert_eq!(engine.run_cancellable(&AtomicBool::new(false)), ScanStatus::Completed);
        assert_eq!(engine.state().depth(), 4);
    }

    #[test]
    fn zero_max_scan_runs_no_steps() {
        let volume = Volume::filled(4, 4, 4, 200u8);
        let params = column_params(4, 0).with_background_last_depth(true);
        let outcome = extract_height_field::<u8, u8>(&volume, params).unwrap();
        assert_eq!(outcome.steps_run, 0);
        assert_eq!(outcome.field.filled_count(), 0);
        assert_eq!(outcome.background, Some(0));
    }

    #[test]
    fn wide_raster_encodes_deep_scans() {
        let volume = Volume::from_fn(3, 3, 400, |_, _, z| if z == 300 { 1000u16 } else { 0 });
        let params = column_params(3, 400).with_threshold(500, 2000);
        let outcome = extract_height_field::<u16, u16>(&volume, params).unwrap();
        assert_eq!(outcome.max_scan.effective, 400);
        assert_eq!(outcome.field.get(1, 1), 100);
    }
}
