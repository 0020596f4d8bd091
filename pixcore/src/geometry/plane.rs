use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// One sensor plane of the detector stack.
///
/// # Description
///
/// Four side planes surround one base plane. Looking down on the base, the
/// side planes follow each other in the cyclic order 0, 1, 3, 2, each one
/// sharing an edge with its neighbours and with the base across a gap.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PlaneId {
    Side0,
    Side1,
    Side2,
    Side3,
    Base,
}

impl PlaneId {
    /// Returns the `PlaneId` for a raw detector channel number, if valid.
    pub fn from_channel(channel: u8) -> Option<PlaneId> {
        match channel {
            0 => Some(PlaneId::Side0),
            1 => Some(PlaneId::Side1),
            2 => Some(PlaneId::Side2),
            3 => Some(PlaneId::Side3),
            4 => Some(PlaneId::Base),
            _ => None,
        }
    }

    /// Returns the raw detector channel number of this plane.
    pub fn channel(&self) -> u8 {
        match self {
            PlaneId::Side0 => 0,
            PlaneId::Side1 => 1,
            PlaneId::Side2 => 2,
            PlaneId::Side3 => 3,
            PlaneId::Base => 4,
        }
    }

    /// The next side plane one step anticlockwise in the ring, `None` for the base.
    pub fn ring_successor(&self) -> Option<PlaneId> {
        match self {
            PlaneId::Side0 => Some(PlaneId::Side1),
            PlaneId::Side1 => Some(PlaneId::Side3),
            PlaneId::Side3 => Some(PlaneId::Side2),
            PlaneId::Side2 => Some(PlaneId::Side0),
            PlaneId::Base => None,
        }
    }
}

impl Display for PlaneId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TPX{}", self.channel())
    }
}

/// Geometric relation between two planes, before coordinate remapping.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PairTopology {
    SamePlane,
    Adjacent,
    Opposite,
}

/// Classifies an ordered plane pair into its geometric case.
pub fn classify(a: PlaneId, b: PlaneId) -> PairTopology {
    if a == b {
        return PairTopology::SamePlane;
    }
    if a == PlaneId::Base || b == PlaneId::Base {
        return PairTopology::Adjacent;
    }
    if a.ring_successor() == Some(b) || b.ring_successor() == Some(a) {
        return PairTopology::Adjacent;
    }
    PairTopology::Opposite
}

/// Physical layout constants of the sensor stack.
///
/// Positions are handled in pixel units throughout; `pixel_pitch` converts
/// them to millimetres where the likelihood model needs physical lengths.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DetectorGeometry {
    /// Side length of a plane's pixel grid.
    pub chip_size: f64,
    /// Physical width of one pixel in mm.
    pub pixel_pitch: f64,
    /// Distance in mm from a base-plane edge to the readout layer of a side plane.
    pub side_gap: f64,
    /// Height in mm of a side plane's lower edge above the base readout layer.
    pub base_clearance: f64,
}

impl Default for DetectorGeometry {
    fn default() -> Self {
        Self {
            chip_size: 256.0,
            pixel_pitch: 0.055,
            side_gap: 10.0,
            base_clearance: 15.0,
        }
    }
}

impl DetectorGeometry {
    /// Separation in mm between two opposite side planes across the stack.
    pub fn stack_separation(&self) -> f64 {
        2.0 * self.side_gap + self.chip_size * self.pixel_pitch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDES: [PlaneId; 4] = [PlaneId::Side0, PlaneId::Side1, PlaneId::Side2, PlaneId::Side3];

    #[test]
    fn test_channel_round_trip() {
        for ch in 0..5u8 {
            let plane = PlaneId::from_channel(ch).unwrap();
            assert_eq!(plane.channel(), ch);
        }
        assert!(PlaneId::from_channel(5).is_none());
    }

    #[test]
    fn test_ring_order() {
        // 0 -> 1 -> 3 -> 2 -> 0
        assert_eq!(PlaneId::Side0.ring_successor(), Some(PlaneId::Side1));
        assert_eq!(PlaneId::Side1.ring_successor(), Some(PlaneId::Side3));
        assert_eq!(PlaneId::Side3.ring_successor(), Some(PlaneId::Side2));
        assert_eq!(PlaneId::Side2.ring_successor(), Some(PlaneId::Side0));
        assert_eq!(PlaneId::Base.ring_successor(), None);
    }

    #[test]
    fn test_classify_all_pairs() {
        let mut same = 0;
        let mut adjacent = 0;
        let mut opposite = 0;
        let all = [PlaneId::Side0, PlaneId::Side1, PlaneId::Side2, PlaneId::Side3, PlaneId::Base];
        for a in all {
            for b in all {
                match classify(a, b) {
                    PairTopology::SamePlane => same += 1,
                    PairTopology::Adjacent => adjacent += 1,
                    PairTopology::Opposite => opposite += 1,
                }
            }
        }
        // 5 same-plane pairs, 8 base-side + 8 ring-adjacent ordered pairs,
        // 4 ordered pairs across the stack ({0,3} and {1,2})
        assert_eq!(same, 5);
        assert_eq!(adjacent, 16);
        assert_eq!(opposite, 4);
    }

    #[test]
    fn test_opposite_pairs() {
        assert_eq!(classify(PlaneId::Side0, PlaneId::Side3), PairTopology::Opposite);
        assert_eq!(classify(PlaneId::Side3, PlaneId::Side0), PairTopology::Opposite);
        assert_eq!(classify(PlaneId::Side1, PlaneId::Side2), PairTopology::Opposite);
        assert_eq!(classify(PlaneId::Side2, PlaneId::Side1), PairTopology::Opposite);
        for side in SIDES {
            assert_eq!(classify(side, PlaneId::Base), PairTopology::Adjacent);
            assert_eq!(classify(PlaneId::Base, side), PairTopology::Adjacent);
        }
    }

    #[test]
    fn test_stack_separation() {
        let geom = DetectorGeometry::default();
        assert!((geom.stack_separation() - 34.08).abs() < 1e-12);
    }
}
