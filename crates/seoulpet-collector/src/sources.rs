//! Upstream datasets and their bindings to destination tables.

use std::fmt;

use seoulpet_client::{ClientError, SeoulOpenApi};
use seoulpet_core::{CollectionResult, PetClinic, PetRegistration, Record, WeatherObservation};
use seoulpet_db::Destination;

use crate::collector::Collector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    PetRegistrations,
    PetClinics,
    Weather,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::PetRegistrations, Source::PetClinics, Source::Weather];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Source::PetRegistrations => "pet_registrations",
            Source::PetClinics => "pet_clinics",
            Source::Weather => "weather",
        }
    }

    /// Default Seoul Open API service name.
    #[must_use]
    pub fn service(self) -> &'static str {
        match self {
            Source::PetRegistrations => "tbPetRegistrationStatus",
            Source::PetClinics => "LOCALDATA_020301",
            Source::Weather => "RealtimeWeatherStation",
        }
    }

    /// Conflict key of the destination table.
    #[must_use]
    pub fn conflict_key(self) -> &'static [&'static str] {
        match self {
            Source::PetRegistrations => PetRegistration::CONFLICT_KEY,
            Source::PetClinics => PetClinic::CONFLICT_KEY,
            Source::Weather => WeatherObservation::CONFLICT_KEY,
        }
    }

    /// Upstream column (lowercased) to destination column.
    fn field_map(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Source::PetRegistrations => &[
                ("dog_reg_cnt", "dog_registration_total"),
                ("cat_reg_cnt", "cat_registration_total"),
                ("tot_reg_cnt", "total_registration"),
                ("crtr_yr", "data_year"),
                ("crtr_mm", "data_month"),
                ("last_updt_dt", "update_date"),
            ],
            // X/Y are projected TM coordinates, not WGS84, and stay unmapped.
            Source::PetClinics => &[
                ("mgtno", "mgt_no"),
                ("bplcnm", "name"),
                ("trdstatenm", "business_status"),
                ("sitetel", "phone"),
                ("rdnwhladdr", "road_address"),
                ("sitewhladdr", "lot_address"),
                ("apvpermymd", "license_date"),
            ],
            Source::Weather => &[
                ("stn_nm", "station_name"),
                ("saws_obs_tm", "observed_at"),
                ("saws_ta_avg", "temperature"),
                ("saws_hd", "humidity"),
                ("saws_rn_sum", "precipitation"),
                ("saws_ws_avg", "wind_speed"),
            ],
        }
    }

    /// Renames upstream keys to destination columns. Keys are lowercased
    /// first; keys without a mapping keep their lowercased name.
    #[must_use]
    pub fn normalize(self, record: Record) -> Record {
        let map = self.field_map();
        record
            .into_iter()
            .map(|(key, value)| {
                let key = key.to_ascii_lowercase();
                let column = map
                    .iter()
                    .find(|(upstream, _)| *upstream == key)
                    .map_or(key, |(_, column)| (*column).to_string());
                (column, value)
            })
            .collect()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.name() == s)
            .ok_or_else(|| format!("unknown source '{s}'"))
    }
}

/// One source wired to an upstream service and a destination table.
#[derive(Debug, Clone)]
pub struct SourceBinding {
    pub source: Source,
    pub service: String,
    pub conflict_key: &'static [&'static str],
}

impl SourceBinding {
    /// Binds `source` to its default service and conflict key.
    #[must_use]
    pub fn new(source: Source) -> Self {
        Self {
            source,
            service: source.service().to_string(),
            conflict_key: source.conflict_key(),
        }
    }

    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Bindings for every known source, in [`Source::ALL`] order.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        Source::ALL.into_iter().map(Self::new).collect()
    }

    /// Fetches `start..=end` from this binding's service and saves it.
    pub async fn collect(
        &self,
        collector: &Collector,
        api: &SeoulOpenApi,
        start: u32,
        end: u32,
    ) -> CollectionResult {
        let source = self.source;
        let service = self.service.as_str();
        let fetch = |from: u32, to: u32| async move {
            let rows = api.fetch_rows(service, from, to).await?;
            let records: Vec<Record> = rows.into_iter().map(|row| source.normalize(row)).collect();
            Ok::<_, ClientError>(records)
        };

        match source {
            Source::PetRegistrations => {
                collector
                    .collect_and_save::<PetRegistration, _, _>(fetch, start, end, self.conflict_key)
                    .await
            }
            Source::PetClinics => {
                collector
                    .collect_and_save::<PetClinic, _, _>(fetch, start, end, self.conflict_key)
                    .await
            }
            Source::Weather => {
                collector
                    .collect_and_save::<WeatherObservation, _, _>(
                        fetch,
                        start,
                        end,
                        self.conflict_key,
                    )
                    .await
            }
        }
    }
}
