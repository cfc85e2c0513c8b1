//! Result tagging for the fallback chain.

/// Which tier served a piece of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
  /// Fresh data from the remote store
  Remote,
  /// Remote unavailable or unconfigured, served from the local cache
  #[default]
  Cache,
  /// Local cache was empty, served the built-in default collection
  Seed,
}

impl Source {
  pub fn as_str(&self) -> &'static str {
    match self {
      Source::Remote => "remote",
      Source::Cache => "cache",
      Source::Seed => "seed",
    }
  }

  /// Short note for degraded tiers, empty for remote data.
  pub fn note(&self) -> &'static str {
    match self {
      Source::Remote => "",
      Source::Cache => "(offline: served from local cache)",
      Source::Seed => "(offline: showing built-in directory)",
    }
  }

  /// True for anything served without reaching the remote store.
  pub fn is_degraded(&self) -> bool {
    !matches!(self, Source::Remote)
  }
}

impl std::fmt::Display for Source {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Data together with the tier that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
  pub data: T,
  pub source: Source,
}

impl<T> Fetched<T> {
  pub fn from_remote(data: T) -> Self {
    Self {
      data,
      source: Source::Remote,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: Source::Cache,
    }
  }

  pub fn from_seed(data: T) -> Self {
    Self {
      data,
      source: Source::Seed,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
    Fetched {
      data: f(self.data),
      source: self.source,
    }
  }
}
