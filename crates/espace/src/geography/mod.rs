//! Administrative geography reference data.
//!
//! Cities, regions and districts are owned by an external reference service and are
//! read-only here. Records written by the registry carry [`LocationSnapshot`]s copied
//! at write time, so later edits to the reference tables never rewrite history.

mod loader;
mod router;
mod store;

pub use loader::{GeographyImportError, GeographyImporter};
pub use router::{geography_router, LocationQuery};
pub use store::{InMemoryReferenceStore, ReferenceStore};

use crate::storage::RepositoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative region code. Scopes registry numbering and staff visibility.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Soato(pub u32);

impl Soato {
    pub const fn value(self) -> u32 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Soato {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Soato {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse::<u32>().map(Soato)
    }
}

macro_rules! reference_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

reference_id!(
    /// Identifier of a city in the reference tables.
    CityId
);
reference_id!(RegionId);
reference_id!(DistrictId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub ru_name: String,
    pub code: u32,
    pub soato: Soato,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub city_id: CityId,
    pub name: String,
    pub ru_name: String,
    pub code: u32,
    pub external_id: u32,
    pub soato: Soato,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub id: DistrictId,
    pub city_id: CityId,
    pub region_id: RegionId,
    pub name: String,
    pub ru_name: String,
    pub code: u32,
    pub external_id: u32,
    pub soato: Soato,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitySnapshot {
    pub id: CityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ru_name: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub soato: Soato,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub id: RegionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ru_name: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub soato: Soato,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictSnapshot {
    pub id: DistrictId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ru_name: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub soato: Soato,
}

impl From<&City> for CitySnapshot {
    fn from(city: &City) -> Self {
        Self {
            id: city.id.clone(),
            name: city.name.clone(),
            ru_name: city.ru_name.clone(),
            code: city.code,
            soato: city.soato,
        }
    }
}

impl From<&Region> for RegionSnapshot {
    fn from(region: &Region) -> Self {
        Self {
            id: region.id.clone(),
            name: region.name.clone(),
            ru_name: region.ru_name.clone(),
            code: region.code,
            soato: region.soato,
        }
    }
}

impl From<&District> for DistrictSnapshot {
    fn from(district: &District) -> Self {
        Self {
            id: district.id.clone(),
            name: district.name.clone(),
            ru_name: district.ru_name.clone(),
            code: district.code,
            soato: district.soato,
        }
    }
}

/// City, region and district as they looked when a record was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    #[serde(default)]
    pub city: CitySnapshot,
    #[serde(default)]
    pub region: RegionSnapshot,
    #[serde(default)]
    pub district: DistrictSnapshot,
}

impl LocationSnapshot {
    /// Registry numbers are scoped by the district's region code.
    pub fn region_code(&self) -> Soato {
        self.district.soato
    }

    /// Build a snapshot from reference ids, checking that the three records nest.
    pub fn resolve(
        store: &dyn ReferenceStore,
        city_id: &CityId,
        region_id: &RegionId,
        district_id: &DistrictId,
    ) -> Result<Self, ResolveError> {
        let city = store
            .city(city_id)?
            .ok_or_else(|| ResolveError::UnknownCity(city_id.clone()))?;
        let region = store
            .region(region_id)?
            .ok_or_else(|| ResolveError::UnknownRegion(region_id.clone()))?;
        let district = store
            .district(district_id)?
            .ok_or_else(|| ResolveError::UnknownDistrict(district_id.clone()))?;

        if region.city_id != city.id {
            return Err(ResolveError::RegionOutsideCity {
                region: region.id,
                city: city.id,
            });
        }
        if district.region_id != region.id {
            return Err(ResolveError::DistrictOutsideRegion {
                district: district.id,
                region: region.id,
            });
        }

        Ok(Self {
            city: CitySnapshot::from(&city),
            region: RegionSnapshot::from(&region),
            district: DistrictSnapshot::from(&district),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("city {0} not found")]
    UnknownCity(CityId),
    #[error("region {0} not found")]
    UnknownRegion(RegionId),
    #[error("district {0} not found")]
    UnknownDistrict(DistrictId),
    #[error("region {region} does not belong to city {city}")]
    RegionOutsideCity { region: RegionId, city: CityId },
    #[error("district {district} does not belong to region {region}")]
    DistrictOutsideRegion {
        district: DistrictId,
        region: RegionId,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
