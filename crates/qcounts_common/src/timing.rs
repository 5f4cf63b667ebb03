// Copyright contributors to the qcounts project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    fmt::{Display, Formatter},
    time::{Duration, Instant},
};

use log::info;

/// Measures the wall-clock time of a scope and reports it through `log`.
///
/// The clock stops on the first call to [`MeasureTime::finish`] or when the
/// guard is dropped, whichever comes first.
///
/// ```
/// use qcounts_common::MeasureTime;
///
/// let mut timer = MeasureTime::new("densify:");
/// // ... work ...
/// let seconds = timer.finish();
/// assert!(seconds >= 0.0);
/// ```
#[derive(Debug)]
pub struct MeasureTime {
    message: Option<String>,
    start: Instant,
    elapsed: Option<Duration>,
}

impl MeasureTime {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            start: Instant::now(),
            elapsed: None,
        }
    }

    /// A guard that records the time without logging it.
    pub fn silent() -> Self {
        Self {
            message: None,
            start: Instant::now(),
            elapsed: None,
        }
    }

    /// Seconds since the guard was created, also after it finished.
    pub fn current_delta_time(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Seconds spent inside the guard, or `NaN` while it is still running.
    pub fn delta_time(&self) -> f64 {
        self.elapsed.map_or(f64::NAN, |dt| dt.as_secs_f64())
    }

    pub fn is_running(&self) -> bool {
        self.elapsed.is_none()
    }

    pub fn finish(&mut self) -> f64 {
        if let Some(dt) = self.elapsed {
            return dt.as_secs_f64();
        }
        let dt = self.start.elapsed();
        self.elapsed = Some(dt);
        if let Some(message) = &self.message {
            info!("{} {:.3} [s]", message, dt.as_secs_f64());
        }
        dt.as_secs_f64()
    }
}

impl Default for MeasureTime {
    fn default() -> Self {
        Self::new("dt:")
    }
}

impl Drop for MeasureTime {
    fn drop(&mut self) {
        self.finish();
    }
}

impl Display for MeasureTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<MeasureTime: dt {:.3}>", self.delta_time())
    }
}
