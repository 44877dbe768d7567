use std::fmt::Display;

use crate::{Error, Result};

/// Feature area types in priority order, a polygon of an earlier
/// area type is cut out of every polygon of a later one.
///
/// The codes start at 1 as triangle attribute 0 marks plain terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AreaType {
    AirportIgnore = 1,
    Ocean,
    Lake,
    DryLake,
    IntermittentLake,
    Reservoir,
    IntermittentReservoir,
    Stream,
    Canal,
    Glacier,
    Urban,
    Marsh,
    Airport,
}

impl AreaType {
    pub const ALL: [AreaType; 13] = [
        AreaType::AirportIgnore,
        AreaType::Ocean,
        AreaType::Lake,
        AreaType::DryLake,
        AreaType::IntermittentLake,
        AreaType::Reservoir,
        AreaType::IntermittentReservoir,
        AreaType::Stream,
        AreaType::Canal,
        AreaType::Glacier,
        AreaType::Urban,
        AreaType::Marsh,
        AreaType::Airport,
    ];

    pub fn code(&self) -> u32 {
        *self as u32
    }

    pub fn from_code(code: u32) -> Result<AreaType> {
        AreaType::ALL
            .into_iter()
            .find(|a| a.code() == code)
            .ok_or(Error::UnknownAreaType(code))
    }

    /// airport ignore areas are cut out of the mesh instead of attributed
    pub fn is_hole(&self) -> bool {
        matches!(self, AreaType::AirportIgnore)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AreaType::AirportIgnore => "AirportIgnore",
            AreaType::Ocean => "Ocean",
            AreaType::Lake => "Lake",
            AreaType::DryLake => "DryLake",
            AreaType::IntermittentLake => "IntermittentLake",
            AreaType::Reservoir => "Reservoir",
            AreaType::IntermittentReservoir => "IntermittentReservoir",
            AreaType::Stream => "Stream",
            AreaType::Canal => "Canal",
            AreaType::Glacier => "Glacier",
            AreaType::Urban => "Urban",
            AreaType::Marsh => "Marsh",
            AreaType::Airport => "Airport",
        }
    }
}

impl Display for AreaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
