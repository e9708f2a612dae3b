//! Type-safe identifier wrappers.
//!
//! Place identifiers come from the place store and are opaque strings.
//! View identifiers are generated server-side (UUID v7) for each mounted
//! live view. Map, marker, and popup handles are allocated by a map
//! backend and are only meaningful to the backend that issued them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Opaque, stable identifier of a place document in the store.
///
/// Unique within one fetched dataset. The engine never inspects its
/// contents; it is only compared and used as a bookkeeping key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct PlaceId(pub String);

impl PlaceId {
    /// Create a place identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PlaceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Unique identifier for one mounted map view (one browser session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ViewId(pub Uuid);

impl ViewId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ViewId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates a backend handle newtype around `u64`.
macro_rules! define_handle {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub u64);

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

define_handle! {
    /// Handle to a map instance created by a map backend.
    MapHandle
}

define_handle! {
    /// Handle to a marker created by a map backend.
    MarkerHandle
}

define_handle! {
    /// Handle to a detail popup created by a map backend.
    PopupHandle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_id_serializes_as_plain_string() {
        let id = PlaceId::new("p1");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"p1\"");
    }

    #[test]
    fn view_ids_are_unique() {
        assert_ne!(ViewId::new(), ViewId::new());
    }

    #[test]
    fn handle_display_names_kind() {
        assert_eq!(MarkerHandle(7).to_string(), "MarkerHandle#7");
    }
}
