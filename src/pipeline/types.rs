//! Row types flowing through the pipeline stages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PASSENGER_KEY: &str = "ID_Pasajero";
pub const PASSENGER_COLUMNS: &[&str] = &["ID_Pasajero", "Edad"];
pub const FLIGHT_COLUMNS: &[&str] = &["Viaje", "Clase", "Precio", "Ruta", "Cve_Cliente", "Cve_LA"];
pub const AIRLINE_COLUMNS: &[&str] = &["Code", "Linea_Aerea"];

/// A passenger row. Columns other than the key and age stay in the source table.
///
/// Age is only carried into the report, so it is kept verbatim (`30`, `30.0`
/// and `N/D` all pass through).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Passenger {
    #[serde(rename = "ID_Pasajero")]
    pub id: String,
    #[serde(rename = "Edad")]
    pub age: Option<String>,
}

/// A flight row. The trip date is kept as text until period derivation.
/// An empty price is `None` and is left out of the mean; a non-numeric one
/// fails deserialization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Flight {
    #[serde(rename = "Viaje")]
    pub trip_date: String,
    #[serde(rename = "Clase")]
    pub class: String,
    #[serde(rename = "Precio")]
    pub price: Option<f64>,
    #[serde(rename = "Ruta")]
    pub route: String,
    #[serde(rename = "Cve_Cliente")]
    pub client_id: String,
    #[serde(rename = "Cve_LA")]
    pub airline_code: String,
}

/// An airline reference row. An empty name counts as unmatched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Airline {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Linea_Aerea")]
    pub name: Option<String>,
}

/// One (flight, passenger) pair produced by the inner join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub flight: Flight,
    pub passenger: Passenger,
}

/// A joined row after the airline lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub joined: JoinedRecord,
    pub airline: String,
    /// False when the sentinel was substituted.
    pub matched: bool,
}

/// The reporting column set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
    #[serde(rename = "Viaje")]
    pub trip_date: String,
    #[serde(rename = "Clase")]
    pub class: String,
    #[serde(rename = "Precio")]
    pub price: Option<f64>,
    #[serde(rename = "Ruta")]
    pub route: String,
    #[serde(rename = "Edad")]
    pub age: Option<String>,
    #[serde(rename = "Linea_Aerea")]
    pub airline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub enum Semester {
    First = 1,
    Second = 2,
}

impl Semester {
    /// Months 1-6 fall in the first semester, 7-12 in the second.
    pub fn from_month(month: u32) -> Self {
        if month <= 6 {
            Semester::First
        } else {
            Semester::Second
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

impl From<Semester> for u8 {
    fn from(semester: Semester) -> Self {
        semester.number()
    }
}

/// A consolidated row with its calendar period resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedRecord {
    pub record: ConsolidatedRecord,
    pub year: i32,
    pub month: u32,
}

impl DatedRecord {
    pub fn semester(&self) -> Semester {
        Semester::from_month(self.month)
    }
}

/// Index of a pivot row. Field order is the sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PeriodKey {
    pub year: i32,
    pub class: String,
    pub route: String,
    pub semester: Semester,
}

/// Full grouping key of the mean aggregation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub year: i32,
    pub class: String,
    pub route: String,
    pub semester: Semester,
    pub airline: String,
}

impl GroupKey {
    pub fn period(&self) -> PeriodKey {
        PeriodKey {
            year: self.year,
            class: self.class.clone(),
            route: self.route.clone(),
            semester: self.semester,
        }
    }
}

/// Mean price of one group in long format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    #[serde(flatten)]
    pub key: GroupKey,
    pub mean_price: f64,
    pub count: usize,
}

/// One wide row: mean price per airline for a period key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    #[serde(flatten)]
    pub key: PeriodKey,
    pub prices: BTreeMap<String, f64>,
}

/// The semester price pivot. `airlines` lists every column in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotTable {
    pub airlines: Vec<String>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    /// Looks up a cell. `None` means the airline has no records for that key.
    pub fn cell(&self, key: &PeriodKey, airline: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| &row.key == key)
            .and_then(|row| row.prices.get(airline).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semester_boundaries() {
        assert_eq!(Semester::from_month(1), Semester::First);
        assert_eq!(Semester::from_month(6), Semester::First);
        assert_eq!(Semester::from_month(7), Semester::Second);
        assert_eq!(Semester::from_month(12), Semester::Second);
    }

    #[test]
    fn test_semester_serializes_as_number() {
        let json = serde_json::to_string(&Semester::Second).unwrap();
        assert_eq!(json, "2");
    }

    #[test]
    fn test_group_keys_sort_by_year_first() {
        let a = GroupKey {
            year: 2016,
            class: "Turista".into(),
            route: "Z".into(),
            semester: Semester::Second,
            airline: "Z".into(),
        };
        let b = GroupKey {
            year: 2017,
            class: "Ejecutivo".into(),
            route: "A".into(),
            semester: Semester::First,
            airline: "A".into(),
        };
        assert!(a < b);
        assert_eq!(a.period().semester, Semester::Second);
    }
}
