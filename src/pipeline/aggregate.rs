//! Period derivation, grouped mean and airline pivot.

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{
    AggregateRow, ConsolidatedRecord, DatedRecord, GroupKey, PeriodKey, PivotRow, PivotTable,
};
use crate::pipeline::utility::mean_present;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Parses a trip date with the first matching format. Formats carrying a time
/// component are accepted and the time is discarded.
pub fn parse_trip_date(value: &str, formats: &[String]) -> Option<NaiveDate> {
    formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(value, fmt)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(value, fmt).ok().map(|dt| dt.date()))
    })
}

/// Resolves year, month and semester for every record.
///
/// # Errors
///
/// Fails on the first record whose date matches none of `formats`; `row` in
/// the error is 1-based. Nothing is skipped.
pub fn derive_periods(
    records: Vec<ConsolidatedRecord>,
    formats: &[String],
) -> Result<Vec<DatedRecord>> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let date = parse_trip_date(&record.trip_date, formats).ok_or_else(|| {
                PipelineError::DateParse {
                    row: i + 1,
                    value: record.trip_date.clone(),
                }
            })?;
            Ok(DatedRecord {
                year: date.year(),
                month: date.month(),
                record,
            })
        })
        .collect()
}

/// Mean price per (year, class, route, semester, airline), sorted by key.
///
/// Missing prices are skipped; a group whose prices are all missing yields no
/// row, so its pivot cell stays absent.
pub fn group_means(records: &[DatedRecord]) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<GroupKey, Vec<Option<f64>>> = BTreeMap::new();

    for dated in records {
        let key = GroupKey {
            year: dated.year,
            class: dated.record.class.clone(),
            route: dated.record.route.clone(),
            semester: dated.semester(),
            airline: dated.record.airline.clone(),
        };
        groups.entry(key).or_default().push(dated.record.price);
    }

    let rows: Vec<AggregateRow> = groups
        .into_iter()
        .filter_map(|(key, prices)| match mean_present(&prices) {
            Some((mean_price, count)) => Some(AggregateRow {
                key,
                mean_price,
                count,
            }),
            None => {
                debug!(?key, "Group has no prices");
                None
            }
        })
        .collect();

    info!(records = records.len(), groups = rows.len(), "Grouped mean prices");
    rows
}

/// Spreads airlines into columns: one row per period key, one column per
/// airline seen anywhere in `rows`. Airlines with no group for a key leave
/// that cell absent.
pub fn pivot(rows: &[AggregateRow]) -> PivotTable {
    let mut airlines = BTreeSet::new();
    let mut wide: BTreeMap<PeriodKey, BTreeMap<String, f64>> = BTreeMap::new();

    for row in rows {
        airlines.insert(row.key.airline.clone());
        wide.entry(row.key.period())
            .or_default()
            .insert(row.key.airline.clone(), row.mean_price);
    }

    let table = PivotTable {
        airlines: airlines.into_iter().collect(),
        rows: wide
            .into_iter()
            .map(|(key, prices)| PivotRow { key, prices })
            .collect(),
    };

    debug!(
        rows = table.rows.len(),
        columns = ?table.airlines,
        "Pivot built"
    );
    table
}

/// Reverses [`pivot`]: every present cell becomes one (key, mean) pair, in key order.
pub fn unpivot(table: &PivotTable) -> Vec<(GroupKey, f64)> {
    let mut long: Vec<(GroupKey, f64)> = table
        .rows
        .iter()
        .flat_map(|row| {
            row.prices.iter().map(move |(airline, price)| {
                (
                    GroupKey {
                        year: row.key.year,
                        class: row.key.class.clone(),
                        route: row.key.route.clone(),
                        semester: row.key.semester,
                        airline: airline.clone(),
                    },
                    *price,
                )
            })
        })
        .collect();
    long.sort_by(|a, b| a.0.cmp(&b.0));
    long
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_date_formats;
    use crate::pipeline::types::Semester;

    fn record(
        date: &str,
        class: &str,
        route: &str,
        airline: &str,
        price: f64,
    ) -> ConsolidatedRecord {
        ConsolidatedRecord {
            trip_date: date.to_string(),
            class: class.to_string(),
            price: Some(price),
            route: route.to_string(),
            age: Some("30".to_string()),
            airline: airline.to_string(),
        }
    }

    #[test]
    fn test_parse_trip_date_formats() {
        let formats = default_date_formats();
        let expected = NaiveDate::from_ymd_opt(2016, 3, 9);

        assert_eq!(parse_trip_date("2016-03-09", &formats), expected);
        assert_eq!(parse_trip_date("2016/03/09", &formats), expected);
        assert_eq!(parse_trip_date("2016-03-09 14:30:00", &formats), expected);
        assert_eq!(parse_trip_date("03/09/2016", &formats), expected);
        assert_eq!(parse_trip_date("2016-02-30", &formats), None);
        assert_eq!(parse_trip_date("not a date", &formats), None);
    }

    #[test]
    fn test_months_map_to_semesters() {
        let records = vec![
            record("2016-03-15", "Turista", "A", "X", 1.0),
            record("2016-09-15", "Turista", "A", "X", 1.0),
        ];

        let dated = derive_periods(records, &default_date_formats()).unwrap();

        assert_eq!(dated[0].year, 2016);
        assert_eq!(dated[0].month, 3);
        assert_eq!(dated[0].semester(), Semester::First);
        assert_eq!(dated[1].month, 9);
        assert_eq!(dated[1].semester(), Semester::Second);
    }

    #[test]
    fn test_unparseable_date_aborts() {
        let records = vec![
            record("2016-03-15", "Turista", "A", "X", 1.0),
            record("15 de marzo", "Turista", "A", "X", 1.0),
        ];

        let err = derive_periods(records, &default_date_formats()).unwrap_err();
        match err {
            PipelineError::DateParse { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "15 de marzo");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_group_means_average_each_group() {
        let dated = derive_periods(
            vec![
                record("2016-01-10", "Turista", "A", "X", 100.0),
                record("2016-05-10", "Turista", "A", "X", 200.0),
                record("2016-08-10", "Turista", "A", "X", 400.0),
                record("2016-01-10", "Turista", "A", "Y", 50.0),
            ],
            &default_date_formats(),
        )
        .unwrap();

        let rows = group_means(&dated);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].key.airline, "X");
        assert_eq!(rows[0].key.semester, Semester::First);
        assert!((rows[0].mean_price - 150.0).abs() < 1e-9);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[1].key.airline, "Y");
        assert_eq!(rows[1].mean_price, 50.0);
        assert_eq!(rows[2].key.semester, Semester::Second);
        assert_eq!(rows[2].mean_price, 400.0);
    }

    #[test]
    fn test_group_means_skip_missing_prices() {
        let mut unpriced = record("2016-01-20", "Turista", "A", "X", 0.0);
        unpriced.price = None;
        let mut only_unpriced = record("2016-01-20", "Turista", "A", "Y", 0.0);
        only_unpriced.price = None;

        let dated = derive_periods(
            vec![
                record("2016-01-10", "Turista", "A", "X", 100.0),
                unpriced,
                record("2016-02-10", "Turista", "A", "X", 300.0),
                only_unpriced,
            ],
            &default_date_formats(),
        )
        .unwrap();

        let rows = group_means(&dated);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key.airline, "X");
        assert_eq!(rows[0].mean_price, 200.0);
        assert_eq!(rows[0].count, 2);
        assert_eq!(pivot(&rows).airlines, vec!["X"]);
    }

    #[test]
    fn test_pivot_leaves_missing_cells_absent() {
        let dated = derive_periods(
            vec![
                record("2016-01-10", "Turista", "A", "X", 100.0),
                record("2016-01-10", "Turista", "A", "Otra", 60.0),
                record("2017-08-10", "Ejecutivo", "B", "Y", 300.0),
            ],
            &default_date_formats(),
        )
        .unwrap();

        let table = pivot(&group_means(&dated));

        assert_eq!(table.airlines, vec!["Otra", "X", "Y"]);
        assert_eq!(table.rows.len(), 2);

        let first = &table.rows[0].key;
        assert_eq!(table.cell(first, "X"), Some(100.0));
        assert_eq!(table.cell(first, "Otra"), Some(60.0));
        assert_eq!(table.cell(first, "Y"), None);

        let second = &table.rows[1].key;
        assert_eq!(second.year, 2017);
        assert_eq!(table.cell(second, "Y"), Some(300.0));
    }

    #[test]
    fn test_unpivot_reproduces_group_means() {
        let dated = derive_periods(
            vec![
                record("2016-01-10", "Turista", "A", "X", 100.0),
                record("2016-02-10", "Turista", "A", "X", 101.0),
                record("2016-07-10", "Turista", "B", "Y", 80.0),
                record("2017-11-10", "Ejecutivo", "A", "Otra", 990.5),
            ],
            &default_date_formats(),
        )
        .unwrap();

        let grouped = group_means(&dated);
        let long = unpivot(&pivot(&grouped));

        let expected: Vec<(GroupKey, f64)> = grouped
            .iter()
            .map(|row| (row.key.clone(), row.mean_price))
            .collect();
        assert_eq!(long, expected);
    }
}
