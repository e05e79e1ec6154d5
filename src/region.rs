use std::time::Duration;

/// A time interval within the loaded audio, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub start: f64,
    pub end: f64,
}

/// What the playback transport should do with the cursor at a given position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayheadAction {
    Continue,
    /// Cursor left the region, move it back to the region start.
    SeekTo(Duration),
    /// Cursor reached the region end.
    Stop,
}

impl Region {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Region covering the whole buffer.
    pub fn full(duration: f64) -> Self {
        Self::new(0.0, duration.max(0.0))
    }

    /// Clamps both bounds into `[0, duration]`, swapping them if they are reversed.
    pub fn clamped(self, duration: f64) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        let clamp = |t: f64| if t.is_nan() { 0.0 } else { t.clamp(0.0, duration) };
        let (mut start, mut end) = (clamp(self.start), clamp(self.end));
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        Self { start, end }
    }

    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn start_duration(&self) -> Duration {
        Duration::from_secs_f64(self.start.max(0.0))
    }

    /// Keeps the playback cursor inside `[start, end)`.
    pub fn playhead_action(&self, position: Duration) -> PlayheadAction {
        let t = position.as_secs_f64();
        if t >= self.end {
            PlayheadAction::Stop
        } else if t < self.start {
            PlayheadAction::SeekTo(self.start_duration())
        } else {
            PlayheadAction::Continue
        }
    }
}

/// Selection state of the editor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionState {
    /// No audio loaded.
    NoRegion,
    /// Fresh buffer: the region spans the whole duration.
    Full(Region),
    /// The user moved a handle.
    Adjusted(Region),
}

/// Region selection bound to the duration of the loaded buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    state: RegionState,
    duration: f64,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            state: RegionState::NoRegion,
            duration: 0.0,
        }
    }
}

impl Selection {
    pub fn state(&self) -> RegionState {
        self.state
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn region(&self) -> Option<Region> {
        match self.state {
            RegionState::NoRegion => None,
            RegionState::Full(region) | RegionState::Adjusted(region) => Some(region),
        }
    }

    /// Called whenever a new buffer is loaded.
    pub fn reset(&mut self, duration: f64) {
        let region = Region::full(duration);
        self.duration = region.end;
        self.state = RegionState::Full(region);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Sets both bounds at once. Does nothing while no audio is loaded.
    pub fn adjust(&mut self, start: f64, end: f64) -> Option<Region> {
        self.region()?;
        let region = Region::new(start, end).clamped(self.duration);
        self.state = RegionState::Adjusted(region);
        Some(region)
    }

    /// Drags the start handle. It stays within `[0, end]`.
    pub fn adjust_start(&mut self, start: f64) -> Option<Region> {
        let current = self.region()?;
        let start = if start.is_nan() { 0.0 } else { start.clamp(0.0, current.end) };
        self.state = RegionState::Adjusted(Region::new(start, current.end));
        self.region()
    }

    /// Drags the end handle. It stays within `[start, duration]`.
    pub fn adjust_end(&mut self, end: f64) -> Option<Region> {
        let current = self.region()?;
        let end = if end.is_nan() {
            self.duration
        } else {
            end.clamp(current.start, self.duration)
        };
        self.state = RegionState::Adjusted(Region::new(current.start, end));
        self.region()
    }
}
