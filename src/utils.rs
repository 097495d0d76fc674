//! # Utility Functions Module
//!
//! Small helpers shared by the codec adapters.

/// Converts a sequence of string-like items to `Vec<String>`.
///
/// Used to build transcoder argument lists without repeating `.to_string()`.
///
/// # Example
/// ```rust
/// use madacly::utils::to_string_vec;
///
/// let crf = 25;
/// let args = to_string_vec(["-crf", &crf.to_string(), "-y"]);
/// assert_eq!(args, vec!["-crf", "25", "-y"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Keeps only the last `capacity` lines pushed into it.
///
/// Transcoder stderr can be very long; failures only need the tail.
#[derive(Debug)]
pub struct LineTail {
    lines: std::collections::VecDeque<String>,
    capacity: usize,
}

impl LineTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.trim_end().to_string());
    }

    pub fn joined(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}
