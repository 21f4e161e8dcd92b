use super::{City, CityId, District, DistrictId, InMemoryReferenceStore, Region, RegionId, Soato};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

pub const CITIES_FILE: &str = "cities.csv";
pub const REGIONS_FILE: &str = "regions.csv";
pub const DISTRICTS_FILE: &str = "districts.csv";

#[derive(Debug)]
pub enum GeographyImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    DanglingReference {
        table: &'static str,
        id: String,
        parent: String,
    },
}

impl std::fmt::Display for GeographyImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeographyImportError::Io(err) => write!(f, "failed to read geography export: {}", err),
            GeographyImportError::Csv(err) => write!(f, "invalid geography CSV data: {}", err),
            GeographyImportError::DanglingReference { table, id, parent } => write!(
                f,
                "{} row '{}' references unknown parent '{}'",
                table, id, parent
            ),
        }
    }
}

impl std::error::Error for GeographyImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeographyImportError::Io(err) => Some(err),
            GeographyImportError::Csv(err) => Some(err),
            GeographyImportError::DanglingReference { .. } => None,
        }
    }
}

impl From<std::io::Error> for GeographyImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for GeographyImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads the reference tables from CSV exports of the geography service.
pub struct GeographyImporter;

impl GeographyImporter {
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<InMemoryReferenceStore, GeographyImportError> {
        let dir = dir.as_ref();
        let cities = std::fs::File::open(dir.join(CITIES_FILE))?;
        let regions = std::fs::File::open(dir.join(REGIONS_FILE))?;
        let districts = std::fs::File::open(dir.join(DISTRICTS_FILE))?;
        Self::from_readers(cities, regions, districts)
    }

    pub fn from_readers<C: Read, R: Read, D: Read>(
        cities: C,
        regions: R,
        districts: D,
    ) -> Result<InMemoryReferenceStore, GeographyImportError> {
        let cities: Vec<City> = parse_rows::<_, CityRow>(cities)?
            .into_iter()
            .map(CityRow::into_city)
            .collect();
        let regions: Vec<Region> = parse_rows::<_, RegionRow>(regions)?
            .into_iter()
            .map(RegionRow::into_region)
            .collect();
        let districts: Vec<District> = parse_rows::<_, DistrictRow>(districts)?
            .into_iter()
            .map(DistrictRow::into_district)
            .collect();

        let city_ids: HashSet<&CityId> = cities.iter().map(|city| &city.id).collect();
        for region in &regions {
            if !city_ids.contains(&region.city_id) {
                return Err(GeographyImportError::DanglingReference {
                    table: "regions",
                    id: region.id.to_string(),
                    parent: region.city_id.to_string(),
                });
            }
        }

        let region_ids: HashSet<&RegionId> = regions.iter().map(|region| &region.id).collect();
        for district in &districts {
            if !region_ids.contains(&district.region_id) {
                return Err(GeographyImportError::DanglingReference {
                    table: "districts",
                    id: district.id.to_string(),
                    parent: district.region_id.to_string(),
                });
            }
        }

        tracing::info!(
            cities = cities.len(),
            regions = regions.len(),
            districts = districts.len(),
            "geography reference tables loaded"
        );

        Ok(InMemoryReferenceStore::new(cities, regions, districts))
    }
}

fn parse_rows<R: Read, T: for<'de> Deserialize<'de>>(reader: R) -> Result<Vec<T>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.deserialize::<T>().collect()
}

#[derive(Debug, Deserialize)]
struct CityRow {
    id: String,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    ru_name: Option<String>,
    code: u32,
    soato: u32,
}

impl CityRow {
    fn into_city(self) -> City {
        City {
            id: CityId(self.id),
            ru_name: self.ru_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            code: self.code,
            soato: Soato(self.soato),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    id: String,
    city_id: String,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    ru_name: Option<String>,
    code: u32,
    #[serde(default)]
    external_id: u32,
    soato: u32,
}

impl RegionRow {
    fn into_region(self) -> Region {
        Region {
            id: RegionId(self.id),
            city_id: CityId(self.city_id),
            ru_name: self.ru_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            code: self.code,
            external_id: self.external_id,
            soato: Soato(self.soato),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DistrictRow {
    id: String,
    city_id: String,
    region_id: String,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    ru_name: Option<String>,
    code: u32,
    #[serde(default)]
    external_id: u32,
    soato: u32,
}

impl DistrictRow {
    fn into_district(self) -> District {
        District {
            id: DistrictId(self.id),
            city_id: CityId(self.city_id),
            region_id: RegionId(self.region_id),
            ru_name: self.ru_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            code: self.code,
            external_id: self.external_id,
            soato: Soato(self.soato),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
