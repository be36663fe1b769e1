use super::{Record, Recorder};

/// Keeps every record in memory.
///
/// This is used for recording sequences of observations and actions
/// during evaluation runs.
#[derive(Debug, Default)]
pub struct BufferedRecorder {
    buf: Vec<Record>,
}

impl BufferedRecorder {
    /// Construct the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<Record> {
        self.buf.iter()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if no record was written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Recorder for BufferedRecorder {
    fn write(&mut self, record: Record) {
        self.buf.push(record);
    }
}
