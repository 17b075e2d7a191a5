use time::OffsetDateTime;

/// One atomic unit of narrative text, immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub text: String,
    pub created_at: OffsetDateTime,
}

/// Append-only ordered record of all segments in a session.
///
/// Indices are contiguous from 0 and insertion order is narrative order.
/// Append is the only mutation; segments are never removed or reordered.
/// Must only be mutated from within the session's serialized section.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoryLedger {
    segments: Vec<Segment>,
}

impl StoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a segment at the next contiguous index and returns it.
    pub fn append(&mut self, text: impl Into<String>) -> &Segment {
        let segment = Segment {
            index: self.segments.len(),
            text: text.into(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.segments.push(segment);
        self.segments
            .last()
            .expect("ledger cannot be empty immediately after append")
    }

    /// Returns all segment texts in narrative order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.segments
            .iter()
            .map(|segment| segment.text.clone())
            .collect()
    }

    /// Returns the texts joined with a newline separator, the context format
    /// the backend expects for continuation requests.
    #[must_use]
    pub fn joined_context(&self) -> String {
        let texts: Vec<&str> = self
            .segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect();
        texts.join("\n")
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
