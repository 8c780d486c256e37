use std::time::{Duration, Instant};

/// Label fade window derived from recent zoom changes.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FadeProperties {
    /// Zoom levels traversed per fade duration at the current zoom speed.
    pub fadedist: f32,
    pub min_fade_zoom: f32,
    pub max_fade_zoom: f32,
    /// Extra zoom the gesture would have reached had it kept going.
    pub bump: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Frame {
    /// Milliseconds since the history's origin; `-inf` for the seed frames.
    time: f64,
    z: f32,
}

/// Zoom level per frame, kept just long enough to derive label fades.
///
/// The history is seeded with two frames in the distant past so that the
/// first real frame always counts as a zoom change.
#[derive(Debug, Clone, Default)]
pub struct FrameHistory {
    origin: Option<Instant>,
    frames: Vec<Frame>,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn millis(&mut self, now: Instant) -> f64 {
        let origin = *self.origin.get_or_insert(now);
        now.saturating_duration_since(origin).as_secs_f64() * 1000.0
    }

    /// Records the zoom of the frame drawn at `now`.
    ///
    /// Only zoom changes are recorded.
    pub fn record(&mut self, zoom: f32, now: Instant) {
        let time = self.millis(now);

        if self.frames.is_empty() {
            let seed = Frame {
                time: f64::NEG_INFINITY,
                z: zoom,
            };
            self.frames.push(seed);
            self.frames.push(seed);
        }

        let changed = self.frames.last().is_some_and(|f| f.z != zoom);
        if self.frames.len() == 2 || changed {
            self.frames.push(Frame { time, z: zoom });
        }
    }

    /// Number of retained frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Derives the fade window at `now` and drops frames that no longer matter.
    ///
    /// Frames are trimmed until the second one is within `duration` of `now`,
    /// keeping at least three.
    pub fn fade_properties(&mut self, duration: Duration, now: Instant) -> FadeProperties {
        let now = self.millis(now);
        let duration = duration.as_secs_f64() * 1000.0;

        if self.frames.len() < 3 || duration <= 0.0 {
            return FadeProperties {
                min_fade_zoom: self.frames.first().map_or(0.0, |f| f.z),
                max_fade_zoom: self.frames.first().map_or(0.0, |f| f.z),
                ..Default::default()
            };
        }

        while self.frames.len() > 3 && self.frames[1].time + duration < now {
            self.frames.remove(0);
        }

        if self.frames[1].time + duration < now {
            self.frames[0].z = self.frames[1].z;
        }

        let first = self.frames[0];
        let second = self.frames[1];
        let last = self.frames[self.frames.len() - 1];

        let zoom_diff = (last.z - second.z) as f64;
        let time_diff = last.time - second.time;
        let mut fadedist = zoom_diff / (time_diff / duration);
        if !fadedist.is_finite() {
            fadedist = 0.0;
        }

        let mut bump = (now - last.time) / duration * fadedist;
        if !bump.is_finite() {
            bump = 0.0;
        }

        FadeProperties {
            fadedist: fadedist as f32,
            min_fade_zoom: first.z.min(last.z),
            max_fade_zoom: first.z.max(last.z),
            bump: bump as f32,
        }
    }
}
