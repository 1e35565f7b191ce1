/// Generates collection names unique across scenarios and runs.
#[derive(Debug, Clone)]
pub struct NameGen {
    prefix: String,
}

impl NameGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `<prefix>_<tag>_<uuid>`; always valid under the collection naming rules
    /// as long as the prefix starts with a letter.
    pub fn unique(&self, tag: &str) -> String {
        format!("{}_{}_{}", self.prefix, tag, uuid::Uuid::new_v4().simple())
    }
}
