//! County filtering.
//!
//! The county is the sole filter key. Matching is exact string
//! equality — no case folding, no trimming, no partial match — so the
//! filtered set is always precisely the subset of the full set whose
//! county equals the requested value.

use emberwatch_common::{Incident, WeatherSample};

/// Records that carry an optional county.
pub trait HasCounty {
    fn county(&self) -> Option<&str>;
}

impl HasCounty for Incident {
    fn county(&self) -> Option<&str> {
        self.county.as_deref()
    }
}

impl HasCounty for WeatherSample {
    fn county(&self) -> Option<&str> {
        self.county.as_deref()
    }
}

/// Filter a cached collection by exact county match. `None` returns
/// everything. Order is preserved.
pub fn filter_by_county<'a, T: HasCounty>(records: &'a [T], county: Option<&str>) -> Vec<&'a T> {
    records
        .iter()
        .filter(|r| county.is_none() || r.county() == county)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use emberwatch_common::IncidentStatus;

    fn incident(id: &str, county: Option<&str>) -> Incident {
        Incident {
            id: id.into(),
            latitude: 34.0,
            longitude: -118.0,
            image_url: None,
            description: None,
            status: IncidentStatus::Reported,
            severity: None,
            reporter_id: "u1".into(),
            timestamp: Utc::now(),
            verified_by: None,
            location_name: None,
            county: county.map(String::from),
        }
    }

    #[test]
    fn exact_match_only() {
        let records = vec![
            incident("a", Some("Los Angeles")),
            incident("b", Some("los angeles")), // case differs: no match
            incident("c", None),
            incident("d", Some("Los Angeles")),
        ];

        let filtered = filter_by_county(&records, Some("Los Angeles"));
        let ids: Vec<&str> = filtered.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn no_filter_returns_everything_in_order() {
        let records = vec![incident("a", Some("Fresno")), incident("b", None)];
        let filtered = filter_by_county(&records, None);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].id, "a");
    }

    #[test]
    fn filter_partitions_the_full_set() {
        let records = vec![
            incident("a", Some("Fresno")),
            incident("b", Some("Kern")),
            incident("c", Some("Fresno")),
        ];
        let fresno = filter_by_county(&records, Some("Fresno"));
        let rest: Vec<&Incident> = records
            .iter()
            .filter(|r| r.county.as_deref() != Some("Fresno"))
            .collect();
        assert_eq!(fresno.len() + rest.len(), records.len());
        assert!(fresno.iter().all(|r| r.county.as_deref() == Some("Fresno")));
    }
}
