//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different tables.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` (SQLite `INTEGER PRIMARY KEY`) with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
/// - transparent `sqlx::Type` (with the `sqlite` feature)
///
/// # Example
///
/// ```rust
/// # use vega_core::define_id;
/// define_id!(ZoneId);
/// define_id!(RouteId);
///
/// let zone = ZoneId::new(1);
/// let route = RouteId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ZoneId = route;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[cfg_attr(feature = "sqlite", derive(::sqlx::Type))]
        #[cfg_attr(feature = "sqlite", sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(OrderId);
define_id!(OrderLineId);
define_id!(CategoryId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = OrderId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(OrderId::from(42), id);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(CategoryId::new(7).to_string(), "7");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&OrderLineId::new(3)).expect("serialize");
        assert_eq!(json, "3");
    }
}
