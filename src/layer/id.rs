use std::{fmt, sync::Arc};

/// Stable key for a feature within a layer.
/// Keeps the original identifier text (with leading zeros) without repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(Arc<str>);

impl FeatureId {
    pub fn new(id: &str) -> Self { Self(Arc::from(id)) }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self { Self::new(id) }
}

impl From<String> for FeatureId {
    fn from(id: String) -> Self { Self(Arc::from(id)) }
}
