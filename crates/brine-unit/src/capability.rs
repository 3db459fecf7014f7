use serde::{Deserialize, Serialize};

/// Optional lifecycle hooks a unit implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
  /// Accepts options through `configure`.
  Configurable,
  /// Needs `initialize` once per run before its first invocation.
  Initializable,
  /// Writes artifacts and wants an output directory.
  PathAware,
}

impl Capability {
  const ALL: [Capability; 3] = [
    Capability::Configurable,
    Capability::Initializable,
    Capability::PathAware,
  ];

  const fn bit(self) -> u8 {
    match self {
      Capability::Configurable => 1,
      Capability::Initializable => 1 << 1,
      Capability::PathAware => 1 << 2,
    }
  }
}

/// The set of capabilities a unit declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
  pub const fn none() -> Self {
    Self(0)
  }

  pub const fn with(self, capability: Capability) -> Self {
    Self(self.0 | capability.bit())
  }

  pub const fn contains(&self, capability: Capability) -> bool {
    self.0 & capability.bit() != 0
  }

  pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
    Capability::ALL
      .into_iter()
      .filter(|capability| self.contains(*capability))
  }
}

impl FromIterator<Capability> for Capabilities {
  fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
    iter
      .into_iter()
      .fold(Capabilities::none(), Capabilities::with)
  }
}

impl Serialize for Capabilities {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.iter())
  }
}
