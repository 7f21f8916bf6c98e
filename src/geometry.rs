//! Mapping between the community grid and agent positions.
//!
//! The domain is a 2-D grid of `ni x nj` cells. Census-initialized runs work
//! directly in grid coordinates (cell centers at `(i + 0.5) * dx`); UrbanPop
//! runs position agents in longitude/latitude via an affine mapping.

use crate::agent::Cell;

/// How the initial conditions were produced, which also fixes the coordinate
/// system agents move in.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum IcType {
    Census,
    UrbanPop,
}

#[derive(Copy, Clone, Debug)]
struct LngLatMapping {
    min_lng: f64,
    min_lat: f64,
    spacing_x: f64,
    spacing_y: f64,
}

impl LngLatMapping {
    // The nudges keep coordinates that land exactly on a cell edge inside
    // the intended cell after the float round trip.
    fn grid_to_lnglat(&self, cell: Cell) -> (f64, f64) {
        let lng = f64::from(cell.i) * self.spacing_x + self.min_lng + 0.001;
        let lat = f64::from(cell.j) * self.spacing_y + self.min_lat + 0.001;
        (lng, lat)
    }

    fn lnglat_to_grid(&self, lng: f64, lat: f64) -> Cell {
        let rx = (lng - self.min_lng) / self.spacing_x;
        let ry = (lat - self.min_lat) / self.spacing_y;
        Cell::new((rx + 0.001) as i32, (ry + 0.001) as i32)
    }
}

/// The simulation domain: grid extent plus the coordinate mapping for the
/// active initial-condition type.
#[derive(Copy, Clone, Debug)]
pub struct Geometry {
    ni: usize,
    nj: usize,
    dx: f64,
    dy: f64,
    lnglat: Option<LngLatMapping>,
}

impl Geometry {
    /// A census-mode domain of `ni x nj` unit cells.
    pub fn grid(ni: usize, nj: usize) -> Geometry {
        assert!(ni > 0 && nj > 0, "domain must have at least one cell");
        Geometry {
            ni,
            nj,
            dx: 1.0,
            dy: 1.0,
            lnglat: None,
        }
    }

    /// An UrbanPop-mode domain where cell `(i, j)` covers the lng/lat patch
    /// starting at `(min_lng + i * spacing_x, min_lat + j * spacing_y)`.
    pub fn lnglat(
        ni: usize,
        nj: usize,
        min_lng: f64,
        min_lat: f64,
        spacing_x: f64,
        spacing_y: f64,
    ) -> Geometry {
        assert!(ni > 0 && nj > 0, "domain must have at least one cell");
        assert!(
            spacing_x > 0.0 && spacing_y > 0.0,
            "grid spacing must be positive"
        );
        Geometry {
            ni,
            nj,
            dx: spacing_x,
            dy: spacing_y,
            lnglat: Some(LngLatMapping {
                min_lng,
                min_lat,
                spacing_x,
                spacing_y,
            }),
        }
    }

    #[inline]
    pub fn ic_type(&self) -> IcType {
        if self.lnglat.is_some() {
            IcType::UrbanPop
        } else {
            IcType::Census
        }
    }

    #[inline]
    pub fn ni(&self) -> usize {
        self.ni
    }

    #[inline]
    pub fn nj(&self) -> usize {
        self.nj
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.ni * self.nj
    }

    /// Cell width in the active coordinate system, per axis.
    #[inline]
    pub fn cell_size(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.i >= 0
            && cell.j >= 0
            && (cell.i as usize) < self.ni
            && (cell.j as usize) < self.nj
    }

    /// Row-major linear index of a cell.
    #[inline]
    pub fn linear(&self, cell: Cell) -> usize {
        debug_assert!(self.contains(cell));
        cell.j as usize * self.ni + cell.i as usize
    }

    /// Inverse of [`Geometry::linear`].
    #[inline]
    pub fn cell_at(&self, linear: usize) -> Cell {
        debug_assert!(linear < self.num_cells());
        Cell::new((linear % self.ni) as i32, (linear / self.ni) as i32)
    }

    /// Position agents are placed at when moved "to" a cell.
    pub fn cell_center(&self, cell: Cell) -> (f64, f64) {
        debug_assert!(self.contains(cell));
        match &self.lnglat {
            None => (
                (f64::from(cell.i) + 0.5) * self.dx,
                (f64::from(cell.j) + 0.5) * self.dy,
            ),
            Some(m) => m.grid_to_lnglat(cell),
        }
    }

    /// The cell containing a position. The caller is responsible for the
    /// position being inside the domain; see [`Geometry::position_in_domain`].
    pub fn cell_of(&self, x: f64, y: f64) -> Cell {
        match &self.lnglat {
            None => Cell::new((x / self.dx).floor() as i32, (y / self.dy).floor() as i32),
            Some(m) => m.lnglat_to_grid(x, y),
        }
    }

    pub fn position_in_domain(&self, x: f64, y: f64) -> bool {
        self.contains(self.cell_of(x, y))
    }

    /// Pulls a position back inside the domain, staying strictly within the
    /// outermost cells. Used by the random-walk jitter.
    pub fn clamp_into_domain(&self, x: f64, y: f64) -> (f64, f64) {
        match &self.lnglat {
            None => (
                x.clamp(0.0, (self.ni as f64 - 0.01) * self.dx),
                y.clamp(0.0, (self.nj as f64 - 0.01) * self.dy),
            ),
            Some(m) => (
                x.clamp(
                    m.min_lng,
                    m.min_lng + (self.ni as f64 - 0.01) * m.spacing_x,
                ),
                y.clamp(
                    m.min_lat,
                    m.min_lat + (self.nj as f64 - 0.01) * m.spacing_y,
                ),
            ),
        }
    }
}
