use std::collections::HashMap;

use lazy_static::lazy_static;

/// Map-friendly geocoordinate. `(0, 0)` means unknown; such countries
/// stay in the tree but are excluded from on-map counts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn is_on_map(&self) -> bool {
        self.lat != 0.0 || self.lng != 0.0
    }
}

lazy_static! {
    static ref COUNTRY_COORDINATES: HashMap<&'static str, Coordinates> = {
        let table: &[(&str, f64, f64)] = &[
            ("malaysia", 4.2105, 101.9758),
            ("china", 35.8617, 104.1954),
            ("turkey", 38.9637, 35.2433),
            ("united kingdom", 55.3781, -3.4360),
            ("uk", 55.3781, -3.4360),
            ("united states", 37.0902, -95.7129),
            ("usa", 37.0902, -95.7129),
            ("india", 20.5937, 78.9629),
            ("iran", 32.4279, 53.6880),
            ("viet nam", 14.0583, 108.2772),
            ("vietnam", 14.0583, 108.2772),
            ("south africa", -30.5595, 22.9375),
            ("botswana", -22.3285, 24.6849),
            ("sweden", 60.1282, 18.6435),
            ("bangladesh", 23.6850, 90.3563),
            ("indonesia", -0.7893, 113.9213),
            ("oman", 21.4735, 55.9754),
            ("jordan", 30.5852, 36.2384),
            ("bahrain", 26.0667, 50.5577),
            ("canada", 56.1304, -106.3468),
            ("australia", -25.2744, 133.7751),
            ("germany", 51.1657, 10.4515),
            ("france", 46.2276, 2.2137),
            ("japan", 36.2048, 138.2529),
            ("south korea", 35.9078, 127.7669),
            ("brazil", -14.2350, -51.9253),
            ("mexico", 23.6345, -102.5528),
            ("italy", 41.8719, 12.5674),
            ("spain", 40.4637, -3.7492),
            ("netherlands", 52.1326, 5.2913),
            ("singapore", 1.3521, 103.8198),
            ("thailand", 15.8700, 100.9925),
            ("pakistan", 30.3753, 69.3451),
            ("egypt", 26.8206, 30.8025),
            ("saudi arabia", 23.8859, 45.0792),
            ("uae", 23.4241, 53.8478),
            ("united arab emirates", 23.4241, 53.8478),
            ("russia", 61.5240, 105.3188),
            ("poland", 51.9194, 19.1451),
            ("philippines", 12.8797, 121.7740),
        ];
        table
            .iter()
            .map(|&(name, lat, lng)| (name, Coordinates { lat, lng }))
            .collect()
    };
}

/// Case-insensitive coordinate lookup; unknown names get `(0, 0)`.
pub fn country_coordinates(name: &str) -> Coordinates {
    COUNTRY_COORDINATES
        .get(name.trim().to_lowercase().as_str())
        .copied()
        .unwrap_or_default()
}
