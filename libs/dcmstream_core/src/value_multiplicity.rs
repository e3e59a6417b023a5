//! The number of values that a data element is allowed to hold.

/// Describes the range of the number of values a data element may contain.
/// `max` is `None` when there is no upper bound.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueMultiplicity {
  pub min: usize,
  pub max: Option<usize>,
}

impl ValueMultiplicity {
  /// A value multiplicity of exactly one.
  ///
  pub const ONE: ValueMultiplicity = ValueMultiplicity {
    min: 1,
    max: Some(1),
  };

  /// A value multiplicity of one or more, i.e. unbounded.
  ///
  pub const ONE_TO_MANY: ValueMultiplicity = ValueMultiplicity {
    min: 1,
    max: None,
  };

  /// Returns whether the given number of values lies in this multiplicity's
  /// range.
  ///
  pub fn contains(&self, count: usize) -> bool {
    count >= self.min && self.max.map(|max| count <= max).unwrap_or(true)
  }
}

impl core::fmt::Display for ValueMultiplicity {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    match (self.min, self.max) {
      (min, Some(max)) if min == max => write!(f, "{min}"),
      (min, Some(max)) => write!(f, "{min}-{max}"),
      (min, None) => write!(f, "{min}-n"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn contains_test() {
    assert!(ValueMultiplicity::ONE.contains(1));
    assert!(!ValueMultiplicity::ONE.contains(2));
    assert!(ValueMultiplicity::ONE_TO_MANY.contains(100));
    assert!(!ValueMultiplicity::ONE_TO_MANY.contains(0));
  }

  #[test]
  fn to_string_test() {
    assert_eq!(ValueMultiplicity::ONE.to_string(), "1");
    assert_eq!(ValueMultiplicity::ONE_TO_MANY.to_string(), "1-n");
    assert_eq!(
      ValueMultiplicity {
        min: 1,
        max: Some(3)
      }
      .to_string(),
      "1-3"
    );
  }
}
