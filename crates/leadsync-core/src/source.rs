//! Source-priority ranking used to resolve duplicate conflicts.

/// Default ranking, highest priority first.
pub const DEFAULT_SOURCE_PRIORITY: &[&str] = &[
  "Product Signup",
  "Chroma Signal",
  "Deep Research",
  "Competitor Customer",
  "LinkedIn Sales Nav",
  "AI Speakers",
];

/// A fixed ranking of provenance tags.
///
/// Tags are compared case-insensitively after trimming. Tags absent from the
/// ranking (and missing tags) rank below every listed one, and equal to each
/// other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePriority {
  /// Lower-cased tags, highest priority first.
  ranked: Vec<String>,
}

impl Default for SourcePriority {
  fn default() -> Self { Self::new(DEFAULT_SOURCE_PRIORITY.iter().copied()) }
}

impl SourcePriority {
  pub fn new<I, S>(ranked: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self {
      ranked: ranked
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect(),
    }
  }

  /// Numeric rank; larger is higher priority, `0` is unranked.
  pub fn rank(&self, source: Option<&str>) -> usize {
    let Some(source) = source else {
      return 0;
    };
    let needle = source.trim().to_lowercase();
    self
      .ranked
      .iter()
      .position(|s| *s == needle)
      .map_or(0, |idx| self.ranked.len() - idx)
  }

  /// `true` when `candidate` ranks strictly above `existing`.
  pub fn outranks(&self, candidate: Option<&str>, existing: Option<&str>) -> bool {
    self.rank(candidate) > self.rank(existing)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_ranking_order() {
    let p = SourcePriority::default();
    assert!(p.outranks(Some("Product Signup"), Some("LinkedIn Sales Nav")));
    assert!(!p.outranks(Some("AI Speakers"), Some("Product Signup")));
    assert!(p.outranks(Some("Deep Research"), Some("Competitor Customer")));
  }

  #[test]
  fn equal_sources_do_not_outrank() {
    let p = SourcePriority::default();
    assert!(!p.outranks(Some("Deep Research"), Some("deep research ")));
    assert!(!p.outranks(None, None));
  }

  #[test]
  fn unranked_sources_rank_lowest() {
    let p = SourcePriority::default();
    assert_eq!(p.rank(Some("Sumble")), 0);
    assert!(p.outranks(Some("AI Speakers"), Some("Sumble")));
    assert!(!p.outranks(Some("Web Research"), Some("Sumble")));
    assert!(p.outranks(Some("AI Speakers"), None));
  }

  #[test]
  fn custom_ranking_replaces_default() {
    let p = SourcePriority::new(["Webinar", "Product Signup"]);
    assert!(p.outranks(Some("webinar"), Some("Product Signup")));
    assert_eq!(p.rank(Some("Deep Research")), 0);
  }
}
