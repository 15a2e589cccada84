pub trait ProgressReporter {
    fn start(&mut self, total: usize);
    fn advance(&mut self, label: &str);
    fn finish(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&mut self, _total: usize) {}
    fn advance(&mut self, _label: &str) {}
    fn finish(&mut self) {}
}

// Keeps every event so tests can inspect them
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingProgress {
    pub total: Option<usize>,
    pub labels: Vec<String>,
    pub finished: bool,
}

impl ProgressReporter for RecordingProgress {
    fn start(&mut self, total: usize) {
        self.total = Some(total);
    }

    fn advance(&mut self, label: &str) {
        self.labels.push(label.to_string());
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
