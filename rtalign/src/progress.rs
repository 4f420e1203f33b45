use log::debug;

/// Receives progress updates of a long running computation.
pub trait ProgressReporter {
    fn start(&mut self, label: &str, begin: u32, end: u32);
    fn set(&mut self, value: u32);
    fn end(&mut self);
}

/// Discards all progress updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&mut self, _label: &str, _begin: u32, _end: u32) {}
    fn set(&mut self, _value: u32) {}
    fn end(&mut self) {}
}

/// Forwards progress to the `log` facade at debug level, in steps of `step` percent.
#[derive(Clone, Debug)]
pub struct LogProgress {
    label: String,
    begin: u32,
    end: u32,
    step: u32,
    last_reported: Option<u32>,
}

impl LogProgress {
    pub fn new(step: u32) -> Self {
        LogProgress {
            label: String::new(),
            begin: 0,
            end: 100,
            step: step.max(1),
            last_reported: None,
        }
    }

    fn percent(&self, value: u32) -> u32 {
        if self.end <= self.begin {
            return 100;
        }
        let clamped = value.clamp(self.begin, self.end);
        (clamped - self.begin) * 100 / (self.end - self.begin)
    }

    pub fn last_reported(&self) -> Option<u32> {
        self.last_reported
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        LogProgress::new(10)
    }
}

impl ProgressReporter for LogProgress {
    fn start(&mut self, label: &str, begin: u32, end: u32) {
        self.label = label.to_string();
        self.begin = begin;
        self.end = end;
        self.last_reported = None;
        debug!("{}: started", self.label);
    }

    fn set(&mut self, value: u32) {
        let percent = self.percent(value);
        let due = match self.last_reported {
            None => true,
            Some(last) => percent >= last + self.step,
        };
        if due {
            debug!("{}: {}%", self.label, percent);
            self.last_reported = Some(percent);
        }
    }

    fn end(&mut self) {
        debug!("{}: done", self.label);
        self.last_reported = Some(100);
    }
}
