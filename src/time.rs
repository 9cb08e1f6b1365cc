//! Frame and compute timing.
//!
//! [`FrameTimer`] measures the compute bracket with `tic`/`toc` and derives
//! frames per second from successive frames. [`ScrollingSeries`] keeps a
//! bounded history for the panel plot.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Compute time and frame rate tracking.
#[derive(Debug)]
pub struct FrameTimer {
    started: Option<Instant>,
    last_frame: Instant,
    /// Duration of the last finished tic/toc span [ms].
    compute_ms: f32,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    frame_count: u64,
}

impl FrameTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: None,
            last_frame: now,
            compute_ms: 0.0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            frame_count: 0,
        }
    }

    /// Start measuring a span.
    pub fn tic(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Finish the current span and return its length in milliseconds.
    ///
    /// A `toc` without `tic` keeps the previous measurement.
    pub fn toc(&mut self) -> f32 {
        if let Some(started) = self.started.take() {
            self.compute_ms = started.elapsed().as_secs_f32() * 1000.0;
        }
        self.compute_ms
    }

    /// Count a frame. Returns the frame delta in seconds.
    pub fn frame(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }
        delta
    }

    #[inline]
    pub fn compute_ms(&self) -> f32 {
        self.compute_ms
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity history of `(x, y)` samples; the oldest sample is dropped
/// once full.
#[derive(Clone, Debug)]
pub struct ScrollingSeries {
    capacity: usize,
    points: VecDeque<[f64; 2]>,
}

impl ScrollingSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            points: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, x: f64, y: f64) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back([x, y]);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Samples, oldest first.
    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.points.iter().copied()
    }

    /// Largest y value, or zero when empty.
    pub fn max_y(&self) -> f64 {
        self.points.iter().map(|p| p[1]).fold(0.0, f64::max)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_tic_toc_measures_span() {
        let mut timer = FrameTimer::new();
        timer.tic();
        thread::sleep(Duration::from_millis(10));
        let ms = timer.toc();
        assert!(ms >= 10.0);
        assert_eq!(timer.compute_ms(), ms);
    }

    #[test]
    fn test_toc_without_tic_keeps_previous() {
        let mut timer = FrameTimer::new();
        assert_eq!(timer.toc(), 0.0);
    }

    #[test]
    fn test_frame_counts() {
        let mut timer = FrameTimer::new();
        thread::sleep(Duration::from_millis(5));
        let delta = timer.frame();
        assert!(delta > 0.0);
        assert_eq!(timer.frame_count(), 1);
    }

    #[test]
    fn test_fps_updates_after_interval() {
        let mut timer = FrameTimer::new();
        timer.frame();
        thread::sleep(Duration::from_millis(550));
        timer.frame();
        assert!(timer.fps() > 0.0);
    }

    #[test]
    fn test_series_drops_oldest() {
        let mut series = ScrollingSeries::new(3);
        for i in 0..5 {
            series.push(i as f64, (i * 10) as f64);
        }
        assert_eq!(series.len(), 3);
        let xs: Vec<f64> = series.points().map(|p| p[0]).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
        assert_eq!(series.max_y(), 40.0);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut series = ScrollingSeries::new(0);
        series.push(0.0, 1.0);
        series.push(1.0, 2.0);
        assert_eq!(series.len(), 1);
    }
}
