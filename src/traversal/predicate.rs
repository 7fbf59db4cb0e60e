//! Comparison predicates for `has` filters

use crate::graph::PropertyValue;
use std::cmp::Ordering;
use std::ops::Bound;

/// A predicate over a single property value
///
/// Values of different types never compare, except integers and floats
/// which compare numerically. `neq` and `without` hold for values of a
/// different type.
#[derive(Debug, Clone, PartialEq)]
pub enum P {
    Eq(PropertyValue),
    Neq(PropertyValue),
    Gt(PropertyValue),
    Gte(PropertyValue),
    Lt(PropertyValue),
    Lte(PropertyValue),
    /// Lower bound inclusive, upper bound exclusive
    Between(PropertyValue, PropertyValue),
    Within(Vec<PropertyValue>),
    Without(Vec<PropertyValue>),
}

impl P {
    pub fn eq(value: impl Into<PropertyValue>) -> P {
        P::Eq(value.into())
    }

    pub fn neq(value: impl Into<PropertyValue>) -> P {
        P::Neq(value.into())
    }

    pub fn gt(value: impl Into<PropertyValue>) -> P {
        P::Gt(value.into())
    }

    pub fn gte(value: impl Into<PropertyValue>) -> P {
        P::Gte(value.into())
    }

    pub fn lt(value: impl Into<PropertyValue>) -> P {
        P::Lt(value.into())
    }

    pub fn lte(value: impl Into<PropertyValue>) -> P {
        P::Lte(value.into())
    }

    pub fn between(lower: impl Into<PropertyValue>, upper: impl Into<PropertyValue>) -> P {
        P::Between(lower.into(), upper.into())
    }

    pub fn within<V: Into<PropertyValue>>(values: impl IntoIterator<Item = V>) -> P {
        P::Within(values.into_iter().map(Into::into).collect())
    }

    pub fn without<V: Into<PropertyValue>>(values: impl IntoIterator<Item = V>) -> P {
        P::Without(values.into_iter().map(Into::into).collect())
    }

    /// Evaluate the predicate against a value
    pub fn test(&self, value: &PropertyValue) -> bool {
        let is = |other: &PropertyValue, accept: fn(Ordering) -> bool| {
            compare(value, other).map_or(false, accept)
        };
        match self {
            P::Eq(v) => is(v, Ordering::is_eq),
            P::Neq(v) => !is(v, Ordering::is_eq),
            P::Gt(v) => is(v, Ordering::is_gt),
            P::Gte(v) => is(v, Ordering::is_ge),
            P::Lt(v) => is(v, Ordering::is_lt),
            P::Lte(v) => is(v, Ordering::is_le),
            P::Between(lo, hi) => is(lo, Ordering::is_ge) && is(hi, Ordering::is_lt),
            P::Within(vs) => vs.iter().any(|v| is(v, Ordering::is_eq)),
            P::Without(vs) => !vs.iter().any(|v| is(v, Ordering::is_eq)),
        }
    }

    /// Key range an index can answer for this predicate
    pub(crate) fn bounds(&self) -> Option<(Bound<&PropertyValue>, Bound<&PropertyValue>)> {
        match self {
            P::Gt(v) => Some((Bound::Excluded(v), Bound::Unbounded)),
            P::Gte(v) => Some((Bound::Included(v), Bound::Unbounded)),
            P::Lt(v) => Some((Bound::Unbounded, Bound::Excluded(v))),
            P::Lte(v) => Some((Bound::Unbounded, Bound::Included(v))),
            P::Between(lo, hi) => Some((Bound::Included(lo), Bound::Excluded(hi))),
            _ => None,
        }
    }

    /// Values an exact-match index can answer for this predicate
    pub(crate) fn exact_values(&self) -> Option<&[PropertyValue]> {
        match self {
            P::Eq(v) => Some(std::slice::from_ref(v)),
            P::Within(vs) => Some(vs),
            _ => None,
        }
    }
}

fn compare(a: &PropertyValue, b: &PropertyValue) -> Option<Ordering> {
    use PropertyValue::*;
    match (a, b) {
        (Integer(x), Float(y)) => (*x as f64).partial_cmp(y),
        (Float(x), Integer(y)) => x.partial_cmp(&(*y as f64)),
        (Null, _) | (_, Null) => None,
        _ if std::mem::discriminant(a) == std::mem::discriminant(b) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons() {
        let age = PropertyValue::Integer(5000);
        assert!(P::eq(5000).test(&age));
        assert!(P::gte(5000).test(&age));
        assert!(!P::gt(5000).test(&age));
        assert!(P::lt(5001).test(&age));
        assert!(P::lte(5000).test(&age));
        assert!(P::neq(4500).test(&age));
    }

    #[test]
    fn test_between_is_half_open() {
        assert!(P::between(10, 20).test(&10.into()));
        assert!(P::between(10, 20).test(&19.into()));
        assert!(!P::between(10, 20).test(&20.into()));
    }

    #[test]
    fn test_mixed_types() {
        assert!(P::gt(4.5).test(&PropertyValue::Integer(5)));
        assert!(P::eq(5).test(&PropertyValue::Float(5.0)));
        // a string never compares with a number
        assert!(!P::gt(1).test(&"pluto".into()));
        assert!(P::neq(1).test(&"pluto".into()));
        assert!(!P::eq(PropertyValue::Null).test(&PropertyValue::Null));
    }

    #[test]
    fn test_within_and_without() {
        let name = PropertyValue::from("hydra");
        assert!(P::within(["nemean", "hydra"]).test(&name));
        assert!(!P::without(["nemean", "hydra"]).test(&name));
        assert!(P::without(["cerberus"]).test(&name));
    }

    #[test]
    fn test_index_hints() {
        let gte = P::gte(5000);
        assert_eq!(
            gte.bounds(),
            Some((Bound::Included(&PropertyValue::Integer(5000)), Bound::Unbounded))
        );
        assert!(gte.exact_values().is_none());
        assert_eq!(P::eq("x").exact_values().map(|v| v.len()), Some(1));
        assert!(P::neq("x").bounds().is_none());
    }
}
