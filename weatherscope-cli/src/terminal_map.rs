//! A map "widget" for the terminal: it has no tiles to draw, so it reports
//! what a graphical map would do.

use weatherscope_core::{
    MapView, Marker, Place,
    map::{TileLayer, Viewport},
};

#[derive(Debug, Default)]
pub struct TerminalMap;

impl MapView for TerminalMap {
    fn mount(&mut self, tiles: &TileLayer, view: Viewport) {
        tracing::debug!(
            tiles = tiles.url_template,
            zoom = view.zoom,
            "Map mounted at {:.4}, {:.4}",
            view.latitude,
            view.longitude
        );
    }

    fn recenter(&mut self, place: &Place, zoom: u8) {
        println!(
            "Map centered on {} ({:.4}, {:.4}, zoom {zoom})",
            place.display_name, place.latitude, place.longitude
        );
    }

    fn show_marker(&mut self, marker: &Marker) {
        println!("[marker] {}", marker.popup.replace('\n', " | "));
    }

    fn remove_marker(&mut self, marker: &Marker) {
        tracing::debug!(place = %marker.place.display_name, "Marker removed");
    }
}
