//! Predicate operator registry

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::{Error, Result};

/// A WHERE predicate operator.
///
/// Variant order is the registry order: `build()` renders predicate groups in
/// exactly this sequence, so `Ord` is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Like,
    NotLike,
    SetIn,
    SetNotIn,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// Every operator, in registry order
    pub const ALL: [Operator; 12] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThanOrEqual,
        Operator::Like,
        Operator::NotLike,
        Operator::SetIn,
        Operator::SetNotIn,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    /// Registry name, which is also the name of the builder method
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equal => "equal",
            Operator::NotEqual => "not_equal",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::Like => "like",
            Operator::NotLike => "not_like",
            Operator::SetIn => "set_in",
            Operator::SetNotIn => "set_not_in",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
        }
    }

    /// SQL token rendered between the column and its placeholder(s)
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanOrEqual => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::SetIn => "IN",
            Operator::SetNotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Nullness operators render without a placeholder
    pub fn is_nullness(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Membership operators render one placeholder per element
    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::SetIn | Operator::SetNotIn)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for Operator {
    type Err = Error;

    /// Accepts either a registry name (`"greater_than"`) or a SQL token (`">"`).
    fn from_str(s: &str) -> Result<Self> {
        if let Some(op) = Operator::ALL.iter().find(|op| op.name() == s) {
            return Ok(*op);
        }
        let upper = s.trim().to_uppercase();
        let upper = upper.split_whitespace().collect::<Vec<_>>().join(" ");
        match upper.as_str() {
            "!=" => Ok(Operator::NotEqual),
            token => Operator::ALL
                .iter()
                .find(|op| op.token() == token)
                .copied()
                .ok_or_else(|| Error::unknown_operator(s)),
        }
    }
}

/// Trait for types that can be converted to predicate operators
pub trait IntoOperator {
    fn into_operator(self) -> Result<Operator>;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Result<Operator> {
        Ok(self)
    }
}

impl IntoOperator for &str {
    fn into_operator(self) -> Result<Operator> {
        self.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_tokens() {
        assert_eq!(Operator::Equal.token(), "=");
        assert_eq!(Operator::NotEqual.token(), "<>");
        assert_eq!(Operator::NotLike.token(), "NOT LIKE");
        assert_eq!(Operator::SetNotIn.token(), "NOT IN");
        assert_eq!(Operator::IsNotNull.token(), "IS NOT NULL");
    }

    #[test]
    fn test_registry_order_matches_ord() {
        let mut sorted = Operator::ALL;
        sorted.sort();
        assert_eq!(sorted, Operator::ALL);
        assert_eq!(Operator::ALL.first(), Some(&Operator::Equal));
        assert_eq!(Operator::ALL.last(), Some(&Operator::IsNotNull));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Operator::GreaterThan), ">");
        assert_eq!(format!("{}", Operator::Like), "LIKE");
    }

    #[test]
    fn test_parse_names() {
        for op in Operator::ALL {
            assert_eq!(op.name().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!(">=".into_operator().unwrap(), Operator::GreaterThanOrEqual);
        assert_eq!("like".into_operator().unwrap(), Operator::Like);
        assert_eq!("not  in".into_operator().unwrap(), Operator::SetNotIn);
        assert_eq!("is null".into_operator().unwrap(), Operator::IsNull);
        assert_eq!("!=".into_operator().unwrap(), Operator::NotEqual);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "between".parse::<Operator>().unwrap_err();
        assert!(matches!(err, Error::UnknownOperator { ref name } if name == "between"));
    }

    #[test]
    fn test_classification() {
        let nullness: Vec<_> = Operator::ALL.iter().filter(|op| op.is_nullness()).collect();
        let membership: Vec<_> = Operator::ALL.iter().filter(|op| op.is_membership()).collect();
        assert_eq!(nullness, [&Operator::IsNull, &Operator::IsNotNull]);
        assert_eq!(membership, [&Operator::SetIn, &Operator::SetNotIn]);
    }
}
