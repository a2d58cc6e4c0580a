use super::numeric::{mean, population_stddev};
use std::collections::VecDeque;

/// Trailing simple moving average over the last `window` values pushed.
#[derive(Debug, Clone)]
pub struct RollingSma {
    window: usize,
    buf: VecDeque<f64>,
}

impl RollingSma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::with_capacity(window),
        }
    }

    /// Pushes `value` and returns the average once the window is full.
    ///
    /// The sum is taken over the buffer in arrival order on every call, so the
    /// result does not depend on how many values have already scrolled out.
    /// A flat window returns its value exactly.
    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        while self.buf.len() > self.window {
            self.buf.pop_front();
        }

        if self.buf.len() < self.window {
            return None;
        }

        let first = self.buf[0];
        if self.buf.iter().all(|v| *v == first) {
            return Some(first);
        }
        Some(self.buf.iter().sum::<f64>() / self.window as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub stddev: f64,
}

/// Trailing mean and population standard deviation.
#[derive(Debug, Clone)]
pub struct RollingStats {
    window: usize,
    buf: VecDeque<f64>,
    scratch: Vec<f64>,
}

impl RollingStats {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::with_capacity(window),
            scratch: Vec::with_capacity(window),
        }
    }

    pub fn update(&mut self, value: f64) -> Option<WindowStats> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        while self.buf.len() > self.window {
            self.buf.pop_front();
        }

        if self.buf.len() < self.window {
            return None;
        }

        let first = self.buf[0];
        if self.buf.iter().all(|v| *v == first) {
            return Some(WindowStats {
                mean: first,
                stddev: 0.0,
            });
        }

        self.scratch.clear();
        self.scratch.extend(self.buf.iter().copied());
        Some(WindowStats {
            mean: mean(&self.scratch),
            stddev: population_stddev(&self.scratch),
        })
    }
}
