//! Identifier allocation for items stored without an explicit id.

use crate::types::EntityId;

/// Allocates identifiers for items stored without one.
///
/// The allocated id is the number of items currently held by the active
/// tier, written as a decimal string. Mixing caller-supplied ids with
/// allocated ones can therefore collide (a caller that stores id `"1"` and
/// then two anonymous items gets `"1"` reused); a collision overwrites the
/// earlier item. Avoiding that is the caller's responsibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdAllocator;

impl IdAllocator {
  /// Creates a new allocator.
  pub fn new() -> Self {
    Self
  }

  /// Returns the id for the next anonymous item given the current item count.
  pub fn next_id(&self, stored: usize) -> EntityId {
    stored.to_string()
  }

  /// Returns `explicit` when present, otherwise allocates a fresh id.
  pub fn resolve(&self, explicit: Option<EntityId>, stored: usize) -> EntityId {
    explicit.unwrap_or_else(|| self.next_id(stored))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocates_decimal_count() {
    let allocator = IdAllocator::new();
    assert_eq!(allocator.next_id(0), "0");
    assert_eq!(allocator.next_id(42), "42");
  }

  #[test]
  fn explicit_ids_win() {
    let allocator = IdAllocator::new();
    assert_eq!(allocator.resolve(Some("doc-9".into()), 3), "doc-9");
    assert_eq!(allocator.resolve(None, 3), "3");
  }
}
