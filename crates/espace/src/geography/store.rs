use super::{City, CityId, District, DistrictId, Region, RegionId};
use crate::storage::RepositoryError;
use std::collections::BTreeMap;

/// Read-only lookups against the administrative geography tables.
pub trait ReferenceStore: Send + Sync {
    fn city(&self, id: &CityId) -> Result<Option<City>, RepositoryError>;
    fn region(&self, id: &RegionId) -> Result<Option<Region>, RepositoryError>;
    fn district(&self, id: &DistrictId) -> Result<Option<District>, RepositoryError>;
    fn cities(&self) -> Result<Vec<City>, RepositoryError>;
    fn regions_in_city(&self, city: &CityId) -> Result<Vec<Region>, RepositoryError>;
    fn districts_in_region(&self, region: &RegionId) -> Result<Vec<District>, RepositoryError>;
}

/// Reference tables held in memory. Built once, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceStore {
    cities: BTreeMap<CityId, City>,
    regions: BTreeMap<RegionId, Region>,
    districts: BTreeMap<DistrictId, District>,
}

impl InMemoryReferenceStore {
    pub fn new(cities: Vec<City>, regions: Vec<Region>, districts: Vec<District>) -> Self {
        Self {
            cities: cities.into_iter().map(|c| (c.id.clone(), c)).collect(),
            regions: regions.into_iter().map(|r| (r.id.clone(), r)).collect(),
            districts: districts.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    pub fn with_city(mut self, city: City) -> Self {
        self.cities.insert(city.id.clone(), city);
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.regions.insert(region.id.clone(), region);
        self
    }

    pub fn with_district(mut self, district: District) -> Self {
        self.districts.insert(district.id.clone(), district);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty() && self.regions.is_empty() && self.districts.is_empty()
    }
}

impl ReferenceStore for InMemoryReferenceStore {
    fn city(&self, id: &CityId) -> Result<Option<City>, RepositoryError> {
        Ok(self.cities.get(id).cloned())
    }

    fn region(&self, id: &RegionId) -> Result<Option<Region>, RepositoryError> {
        Ok(self.regions.get(id).cloned())
    }

    fn district(&self, id: &DistrictId) -> Result<Option<District>, RepositoryError> {
        Ok(self.districts.get(id).cloned())
    }

    fn cities(&self) -> Result<Vec<City>, RepositoryError> {
        let mut cities: Vec<City> = self.cities.values().cloned().collect();
        cities.sort_by_key(|city| city.code);
        Ok(cities)
    }

    fn regions_in_city(&self, city: &CityId) -> Result<Vec<Region>, RepositoryError> {
        let mut regions: Vec<Region> = self
            .regions
            .values()
            .filter(|region| &region.city_id == city)
            .cloned()
            .collect();
        regions.sort_by_key(|region| region.code);
        Ok(regions)
    }

    fn districts_in_region(&self, region: &RegionId) -> Result<Vec<District>, RepositoryError> {
        let mut districts: Vec<District> = self
            .districts
            .values()
            .filter(|district| &district.region_id == region)
            .cloned()
            .collect();
        districts.sort_by_key(|district| district.code);
        Ok(districts)
    }
}
