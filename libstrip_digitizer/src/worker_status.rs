/// Stage of the processing a status refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Loading,
    Digitizing,
    Writing,
}

/// Progress message sent from the processing thread to the UI
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub events_done: usize,
    pub stage: Stage,
}

impl WorkerStatus {
    pub fn new(progress: f32, events_done: usize, stage: Stage) -> Self {
        Self {
            progress,
            events_done,
            stage,
        }
    }
}
