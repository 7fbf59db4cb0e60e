//! Property value types for vertices and edges

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A geographic point, stored as latitude/longitude in degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point[{},{}]", self.lat, self.lon)
    }
}

/// Property value type supporting multiple data types
///
/// Supports:
/// - String
/// - Integer (i64)
/// - Float (f64)
/// - Boolean
/// - DateTime (Unix timestamp in milliseconds)
/// - Geo (latitude/longitude point)
///
/// Values are totally ordered (by type first, then by value) so that they
/// can key the B-tree indexes. Floats compare with `f64::total_cmp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(i64),
    Geo(GeoPoint),
    Null,
}

impl PropertyValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get datetime value if this is a datetime
    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Get the point if this is a geo value
    pub fn as_geo(&self) -> Option<GeoPoint> {
        match self {
            PropertyValue::Geo(p) => Some(*p),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::DateTime(_) => "DateTime",
            PropertyValue::Geo(_) => "Geoshape",
            PropertyValue::Null => "Null",
        }
    }

    /// Render as a JSON value, for logging and display
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::String(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Integer(i) => serde_json::json!(i),
            PropertyValue::Float(f) => serde_json::json!(f),
            PropertyValue::Boolean(b) => serde_json::Value::Bool(*b),
            PropertyValue::DateTime(ms) => match chrono::DateTime::from_timestamp_millis(*ms) {
                Some(dt) => serde_json::Value::String(dt.to_rfc3339()),
                None => serde_json::json!(ms),
            },
            PropertyValue::Geo(p) => serde_json::json!({ "lat": p.lat, "lon": p.lon }),
            PropertyValue::Null => serde_json::Value::Null,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            PropertyValue::Null => 0,
            PropertyValue::Boolean(_) => 1,
            PropertyValue::Integer(_) => 2,
            PropertyValue::Float(_) => 3,
            PropertyValue::DateTime(_) => 4,
            PropertyValue::String(_) => 5,
            PropertyValue::Geo(_) => 6,
        }
    }
}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use PropertyValue::*;
        match (self, other) {
            (String(a), String(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Geo(a), Geo(b)) => a.lat.total_cmp(&b.lat).then(a.lon.total_cmp(&b.lon)),
            (Null, Null) => Ordering::Equal,
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyValue {}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::DateTime(ms) => match chrono::DateTime::from_timestamp_millis(*ms) {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d")),
                None => write!(f, "DateTime({})", ms),
            },
            PropertyValue::Geo(p) => write!(f, "{}", p),
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<&String> for PropertyValue {
    fn from(s: &String) -> Self {
        PropertyValue::String(s.clone())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<u32> for PropertyValue {
    fn from(i: u32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<GeoPoint> for PropertyValue {
    fn from(p: GeoPoint) -> Self {
        PropertyValue::Geo(p)
    }
}

impl From<chrono::NaiveDate> for PropertyValue {
    fn from(date: chrono::NaiveDate) -> Self {
        let millis = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default();
        PropertyValue::DateTime(millis)
    }
}

/// Property map for storing vertex and edge properties, in insertion order
pub type PropertyMap = IndexMap<String, PropertyValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_types() {
        assert_eq!(PropertyValue::String("test".to_string()).type_name(), "String");
        assert_eq!(PropertyValue::Integer(42).type_name(), "Integer");
        assert_eq!(PropertyValue::Float(3.5).type_name(), "Float");
        assert_eq!(PropertyValue::Boolean(true).type_name(), "Boolean");
        assert_eq!(PropertyValue::DateTime(1234567890).type_name(), "DateTime");
        assert_eq!(PropertyValue::Geo(GeoPoint::new(1.0, 2.0)).type_name(), "Geoshape");
        assert_eq!(PropertyValue::Null.type_name(), "Null");
    }

    #[test]
    fn test_conversions_into_values() {
        assert_eq!(PropertyValue::from("hercules").as_string(), Some("hercules"));
        assert_eq!(PropertyValue::from(30).as_integer(), Some(30));
        assert_eq!(PropertyValue::from(38.1).as_float(), Some(38.1));
        assert_eq!(PropertyValue::from(false).as_boolean(), Some(false));
        assert!(PropertyValue::from(GeoPoint::new(39.0, 22.0)).as_geo().is_some());
        assert_eq!(PropertyValue::from(3i64).as_string(), None);

        let date = chrono::NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let since = PropertyValue::from(date);
        assert_eq!(since.as_datetime(), Some(1_420_070_400_000));
        assert_eq!(since.to_string(), "2015-01-01");
    }

    #[test]
    fn test_ordering_within_and_across_types() {
        assert!(PropertyValue::Integer(1) < PropertyValue::Integer(2));
        assert!(PropertyValue::from("a") < PropertyValue::from("b"));
        assert!(PropertyValue::Float(-0.5) < PropertyValue::Float(0.5));
        // Integers sort before strings regardless of value
        assert!(PropertyValue::Integer(i64::MAX) < PropertyValue::from(""));
        assert!(PropertyValue::Null < PropertyValue::Boolean(false));
    }

    #[test]
    fn test_nan_is_equal_to_itself() {
        let nan = PropertyValue::Float(f64::NAN);
        assert_eq!(nan, nan.clone());
    }

    #[test]
    fn test_property_map_keeps_insertion_order() {
        let mut battle = PropertyMap::new();
        battle.insert("time".to_string(), PropertyValue::from(12));
        battle.insert("place".to_string(), GeoPoint::new(39.0, 22.0).into());

        let keys: Vec<&String> = battle.keys().collect();
        assert_eq!(keys, ["time", "place"]);
        assert_eq!(battle["time"], PropertyValue::Integer(12));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(PropertyValue::from("x").to_json(), serde_json::json!("x"));
        assert_eq!(PropertyValue::Integer(5).to_json(), serde_json::json!(5));
        assert_eq!(
            PropertyValue::Geo(GeoPoint::new(37.7, 23.9)).to_json(),
            serde_json::json!({"lat": 37.7, "lon": 23.9})
        );
    }
}
