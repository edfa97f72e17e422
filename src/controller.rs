//! Tier selection and one-way degradation.

use tracing::warn;

use crate::types::TierKind;

/// Which backends were usable when the store was built.
///
/// Computed once. A capability that is absent here is never retried later
/// in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
  /// A managed index connector was supplied.
  pub managed: bool,
  /// The local vector index is enabled.
  pub local_index: bool,
  /// An embedding provider was constructed.
  pub embedder: bool,
}

impl Capabilities {
  /// The strongest tier these capabilities allow.
  pub fn initial_tier(&self) -> TierKind {
    if self.managed && self.embedder {
      TierKind::Managed
    } else if self.local_index && self.embedder {
      TierKind::Local
    } else {
      TierKind::BruteForce
    }
  }
}

/// Tracks the active tier and decides where to fall back to.
///
/// The active tier only ever moves down: `Managed > Local > BruteForce`.
#[derive(Debug, Clone)]
pub struct DegradationController {
  capabilities: Capabilities,
  active: TierKind,
}

impl DegradationController {
  pub fn new(capabilities: Capabilities) -> Self {
    Self {
      active: capabilities.initial_tier(),
      capabilities,
    }
  }

  pub fn active(&self) -> TierKind {
    self.active
  }

  pub fn capabilities(&self) -> Capabilities {
    self.capabilities
  }

  /// Records a failure of `failed` and returns the tier to use next.
  ///
  /// Returns `None` when `failed` is already the weakest tier, or when it is
  /// not the active tier (nothing to do; another caller moved on already).
  /// `embedder_available` is the current state of the embedder, which may
  /// have been disabled since the capabilities were computed.
  pub fn downgrade(&mut self, failed: TierKind, embedder_available: bool) -> Option<TierKind> {
    if failed != self.active {
      return None;
    }
    let next = match failed {
      TierKind::Managed if self.capabilities.local_index && embedder_available => TierKind::Local,
      TierKind::Managed | TierKind::Local => TierKind::BruteForce,
      TierKind::BruteForce => return None,
    };
    debug_assert!(next < self.active);
    warn!(from = %failed, to = %next, "downgrading retrieval tier");
    self.active = next;
    Some(next)
  }
}
