use crate::placement::PlacedFurnitureItem;
use crate::room::RoomDimensions;

/// Figures derived from the current layout.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct RoomMetrics {
    pub item_count: usize,
    /// Sum of catalog footprints (width x depth), square meters.
    pub covered_area: f32,
    /// Covered area over floor area, 0-100. Overlapping items count twice.
    pub coverage_percent: f32,
    pub total_cost: f64,
}

impl RoomMetrics {
    pub fn compute(items: &[PlacedFurnitureItem], room: &RoomDimensions) -> Self {
        let covered_area: f32 = items
            .iter()
            .map(|i| i.catalog.dimensions.footprint_area())
            .sum();
        let floor_area = room.floor_area();
        let coverage_percent = if floor_area > 0.0 {
            covered_area / floor_area * 100.0
        } else {
            0.0
        };

        Self {
            item_count: items.len(),
            covered_area,
            coverage_percent,
            total_cost: total_cost(items),
        }
    }
}

pub fn total_cost(items: &[PlacedFurnitureItem]) -> f64 {
    items.iter().map(|i| i.catalog.price).sum()
}
