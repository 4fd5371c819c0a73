//! Sector boundary lookup.
//!
//! The engine only needs a sector id to attach to aircraft and
//! notifications; polygon data is supplied by the hosting application and
//! stays opaque behind [`SectorMap`].

/// Read-only lookup from a position to the owning sector.
pub trait SectorMap: Send + Sync {
    fn sector_for(&self, lat: f64, lon: f64) -> Option<String>;
}

/// Null lookup for deployments without sector data.
pub struct NoSectors;

impl SectorMap for NoSectors {
    fn sector_for(&self, _lat: f64, _lon: f64) -> Option<String> {
        None
    }
}

/// A sector boundary as a closed polygon ring of [lat, lon] vertices.
pub struct SectorPolygon {
    id: String,
    ring: Vec<[f64; 2]>,
}

impl SectorPolygon {
    pub fn new(id: impl Into<String>, ring: Vec<[f64; 2]>) -> Self {
        Self {
            id: id.into(),
            ring,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ray-casting point-in-polygon test.
    fn contains(&self, lat: f64, lon: f64) -> bool {
        let n = self.ring.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let yi = self.ring[i][0];
            let xi = self.ring[i][1];
            let yj = self.ring[j][0];
            let xj = self.ring[j][1];

            if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Fixed polygon list; first containing sector wins.
pub struct StaticSectors {
    sectors: Vec<SectorPolygon>,
}

impl StaticSectors {
    pub fn new(sectors: Vec<SectorPolygon>) -> Self {
        Self { sectors }
    }
}

impl SectorMap for StaticSectors {
    fn sector_for(&self, lat: f64, lon: f64) -> Option<String> {
        self.sectors
            .iter()
            .find(|sector| sector.contains(lat, lon))
            .map(|sector| sector.id.clone())
    }
}
