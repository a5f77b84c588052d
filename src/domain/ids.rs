//! Identifier types for GTFS entities.
//!
//! GTFS identifiers are short opaque strings, matched case-sensitively.
//! The newtypes below exist so that a stop id can never be handed to an API
//! expecting a trip id; they impose no structure beyond that.

use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

id_type! {
    /// A GTFS stop identifier.
    StopId
}

id_type! {
    /// A GTFS trip identifier.
    TripId
}

id_type! {
    /// A RAPTOR route identifier.
    ///
    /// In the RAPTOR sense a route is a maximal set of trips sharing one
    /// ordered stop pattern; feeds whose published routes mix patterns must
    /// split them before indexing.
    RouteId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_case_sensitive() {
        assert_ne!(StopId::from("main_st"), StopId::from("MAIN_ST"));
    }

    #[test]
    fn display_and_debug() {
        let stop = StopId::from("S1");
        assert_eq!(stop.to_string(), "S1");
        assert_eq!(format!("{stop:?}"), "StopId(S1)");
    }

    #[test]
    fn usable_as_map_keys() {
        use std::collections::HashMap;
        let mut m = HashMap::new();
        m.insert(RouteId::from("R1"), 1);
        assert_eq!(m.get(&RouteId::from("R1")), Some(&1));
        assert_eq!(m.get(&RouteId::from("R2")), None);
    }
}
