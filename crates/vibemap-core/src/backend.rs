//! Map backend that drives a remote mapping library over a channel.
//!
//! [`CommandBackend`] allocates handles locally and emits one
//! [`MapCommand`] per operation. The receiving end (a `WebSocket` writer
//! in the server) forwards the commands to the browser, which applies
//! them to the real mapping library. Once the receiver is gone every
//! operation fails with [`BackendError::Disconnected`].

use std::collections::BTreeSet;

use tokio::sync::mpsc;
use vibemap_types::{
    Bounds, MapCommand, MapHandle, MapOptions, MarkerHandle, MarkerSpec, PopupContent, PopupHandle,
};

use crate::error::BackendError;
use crate::surface::MapBackend;

/// Emits [`MapCommand`]s for a remote mapping library.
#[derive(Debug)]
pub struct CommandBackend {
    tx: mpsc::UnboundedSender<MapCommand>,
    next_handle: u64,
    maps: BTreeSet<MapHandle>,
    markers: BTreeSet<MarkerHandle>,
    popups: BTreeSet<PopupHandle>,
}

impl CommandBackend {
    /// Create a backend writing to `tx`.
    pub const fn new(tx: mpsc::UnboundedSender<MapCommand>) -> Self {
        Self {
            tx,
            next_handle: 0,
            maps: BTreeSet::new(),
            markers: BTreeSet::new(),
            popups: BTreeSet::new(),
        }
    }

    /// Create a backend and the receiver its commands arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MapCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Number of markers the remote side currently holds.
    pub fn live_markers(&self) -> usize {
        self.markers.len()
    }

    /// Whether the receiving side is gone.
    pub fn is_disconnected(&self) -> bool {
        self.tx.is_closed()
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle = self.next_handle.saturating_add(1);
        self.next_handle
    }

    fn send(&self, command: MapCommand) -> Result<(), BackendError> {
        self.tx.send(command).map_err(|_closed| BackendError::Disconnected)
    }
}

impl MapBackend for CommandBackend {
    fn create_map(
        &mut self,
        container_id: &str,
        options: &MapOptions,
    ) -> Result<MapHandle, BackendError> {
        let map = MapHandle(self.allocate());
        self.send(MapCommand::CreateMap {
            map,
            container_id: container_id.to_owned(),
            options: options.clone(),
        })?;
        self.maps.insert(map);
        Ok(map)
    }

    fn destroy_map(&mut self, map: MapHandle) -> Result<(), BackendError> {
        if !self.maps.remove(&map) {
            return Err(BackendError::UnknownHandle(map.to_string()));
        }
        self.markers.clear();
        self.popups.clear();
        self.send(MapCommand::DestroyMap { map })
    }

    fn create_marker(
        &mut self,
        map: MapHandle,
        spec: &MarkerSpec,
    ) -> Result<MarkerHandle, BackendError> {
        if !self.maps.contains(&map) {
            return Err(BackendError::UnknownHandle(map.to_string()));
        }
        if !spec.position.is_valid() {
            return Err(BackendError::InvalidPosition {
                lat: spec.position.lat,
                lng: spec.position.lng,
            });
        }
        let marker = MarkerHandle(self.allocate());
        self.send(MapCommand::CreateMarker {
            marker,
            map,
            spec: spec.clone(),
        })?;
        self.markers.insert(marker);
        Ok(marker)
    }

    fn destroy_marker(&mut self, marker: MarkerHandle) -> Result<(), BackendError> {
        if !self.markers.remove(&marker) {
            return Err(BackendError::UnknownHandle(marker.to_string()));
        }
        self.send(MapCommand::DestroyMarker { marker })
    }

    fn create_popup(&mut self, content: &PopupContent) -> Result<PopupHandle, BackendError> {
        let popup = PopupHandle(self.allocate());
        self.send(MapCommand::CreatePopup {
            popup,
            content: content.clone(),
        })?;
        self.popups.insert(popup);
        Ok(popup)
    }

    fn attach_click_handler(
        &mut self,
        marker: MarkerHandle,
        popup: PopupHandle,
    ) -> Result<(), BackendError> {
        if !self.markers.contains(&marker) {
            return Err(BackendError::UnknownHandle(marker.to_string()));
        }
        if !self.popups.contains(&popup) {
            return Err(BackendError::UnknownHandle(popup.to_string()));
        }
        self.send(MapCommand::AttachClickHandler { marker, popup })
    }

    fn fit_bounds(&mut self, map: MapHandle, bounds: &Bounds) -> Result<(), BackendError> {
        if !self.maps.contains(&map) {
            return Err(BackendError::UnknownHandle(map.to_string()));
        }
        self.send(MapCommand::FitBounds {
            map,
            bounds: *bounds,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vibemap_types::{Coordinate, Emotion, PlaceId};

    use super::*;

    fn options() -> MapOptions {
        MapOptions {
            center: Coordinate::new(0.0, 0.0),
            zoom: 3,
            styles: Vec::new(),
        }
    }

    fn marker_spec(lat: f64) -> MarkerSpec {
        MarkerSpec {
            place_id: PlaceId::new("p"),
            position: Coordinate::new(lat, 0.0),
            size: 8.0,
            color: String::from("#808080"),
            title: String::from("P"),
        }
    }

    #[test]
    fn emits_one_command_per_operation() {
        let (mut backend, mut rx) = CommandBackend::channel();
        let map = backend.create_map("vibe-heatmap", &options()).unwrap();
        let marker = backend.create_marker(map, &marker_spec(10.0)).unwrap();
        let popup = backend
            .create_popup(&PopupContent {
                place_id: PlaceId::new("p"),
                name: String::from("P"),
                emotion: Emotion::from("lonely"),
                emotion_label: String::from("Lonely"),
                rating: 3.0,
                intensity_percent: 40,
            })
            .unwrap();
        backend.attach_click_handler(marker, popup).unwrap();
        backend.destroy_marker(marker).unwrap();

        let mut kinds = Vec::new();
        while let Ok(command) = rx.try_recv() {
            kinds.push(serde_json::to_value(&command).unwrap()["type"].clone());
        }
        assert_eq!(
            kinds,
            [
                "create_map",
                "create_marker",
                "create_popup",
                "attach_click_handler",
                "destroy_marker"
            ]
        );
        assert_eq!(backend.live_markers(), 0);
    }

    #[test]
    fn rejects_out_of_range_positions() {
        let (mut backend, _rx) = CommandBackend::channel();
        let map = backend.create_map("vibe-heatmap", &options()).unwrap();
        assert!(matches!(
            backend.create_marker(map, &marker_spec(95.0)),
            Err(BackendError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn dropped_receiver_disconnects() {
        let (mut backend, rx) = CommandBackend::channel();
        drop(rx);
        assert!(backend.is_disconnected());
        assert_eq!(
            backend.create_map("vibe-heatmap", &options()),
            Err(BackendError::Disconnected)
        );
    }

    #[test]
    fn unknown_handles_are_rejected() {
        let (mut backend, _rx) = CommandBackend::channel();
        assert!(matches!(
            backend.destroy_marker(MarkerHandle(42)),
            Err(BackendError::UnknownHandle(_))
        ));
    }
}
