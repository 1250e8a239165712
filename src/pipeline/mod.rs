//! The consolidation and semester report pipeline.
//!
//! Passenger and flight tables from several years are unioned, passengers are
//! deduplicated by `ID_Pasajero`, flights are joined to passengers and then to
//! the airline reference table, and the result is reduced to mean prices per
//! semester with one column per airline. Every stage consumes the previous
//! stage's full output; the first error aborts the run.

pub mod aggregate;
pub mod join;
pub mod types;
pub mod union;
pub mod utility;

use crate::config::ReportConfig;
use crate::error::Result;
use crate::loader::{Table, load_table};
use crate::pipeline::aggregate::{derive_periods, group_means, pivot};
use crate::pipeline::join::{inner_join, left_join_airlines, project};
use crate::pipeline::types::{
    AIRLINE_COLUMNS, AggregateRow, Airline, ConsolidatedRecord, FLIGHT_COLUMNS, Flight,
    PASSENGER_COLUMNS, PASSENGER_KEY, Passenger, PivotTable,
};
use crate::pipeline::union::{concat, dedup_by_key};
use tracing::{debug, info};

/// The five raw sources, already in memory.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub passengers: Vec<Table>,
    pub flights: Vec<Table>,
    pub airlines: Table,
}

impl SourceTables {
    /// Checks every required column on every table.
    pub fn validate(&self) -> Result<()> {
        for table in &self.passengers {
            table.require_columns(PASSENGER_COLUMNS)?;
        }
        for table in &self.flights {
            table.require_columns(FLIGHT_COLUMNS)?;
        }
        self.airlines.require_columns(AIRLINE_COLUMNS)
    }
}

/// Output of [`consolidate`].
#[derive(Debug, Clone)]
pub struct Consolidation {
    pub records: Vec<ConsolidatedRecord>,
    pub duplicates_dropped: usize,
    /// Passenger keys whose duplicates disagreed; the first row won.
    pub conflicting_keys: Vec<String>,
    pub unmatched_airlines: usize,
}

/// Output of [`semester_report`].
#[derive(Debug, Clone)]
pub struct SemesterReport {
    pub aggregates: Vec<AggregateRow>,
    pub pivot: PivotTable,
}

/// Reads every configured source from disk.
pub fn load_sources(config: &ReportConfig) -> Result<SourceTables> {
    let passengers = config
        .passenger_paths()
        .iter()
        .map(load_table)
        .collect::<Result<Vec<_>>>()?;
    let flights = config
        .flight_paths()
        .iter()
        .map(load_table)
        .collect::<Result<Vec<_>>>()?;
    let airlines = load_table(config.airline_path())?;

    Ok(SourceTables {
        passengers,
        flights,
        airlines,
    })
}

/// Union, dedup, both joins and projection.
#[tracing::instrument(skip_all)]
pub fn consolidate(sources: &SourceTables, config: &ReportConfig) -> Result<Consolidation> {
    sources.validate()?;

    let dedup = dedup_by_key(concat(&sources.passengers)?, PASSENGER_KEY)?;
    let passengers: Vec<Passenger> = dedup.table.deserialize(PASSENGER_COLUMNS)?;
    debug!(?passengers, "Passengers");

    let flights: Vec<Flight> = concat(&sources.flights)?.deserialize(FLIGHT_COLUMNS)?;
    debug!(?flights, "Flights");

    let airlines: Vec<Airline> = sources.airlines.deserialize(AIRLINE_COLUMNS)?;

    let joined = inner_join(&flights, &passengers);
    let enriched = left_join_airlines(joined, &airlines, &config.sentinel)?;
    let unmatched_airlines = enriched.iter().filter(|r| !r.matched).count();
    let records = project(enriched);

    info!(
        records = records.len(),
        duplicates_dropped = dedup.dropped,
        unmatched_airlines,
        "Consolidation complete"
    );

    Ok(Consolidation {
        records,
        duplicates_dropped: dedup.dropped,
        conflicting_keys: dedup.conflicting_keys,
        unmatched_airlines,
    })
}

/// Period derivation, grouped mean and pivot.
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn semester_report(
    records: Vec<ConsolidatedRecord>,
    config: &ReportConfig,
) -> Result<SemesterReport> {
    let dated = derive_periods(records, &config.date_formats)?;
    let aggregates = group_means(&dated);
    let pivot = pivot(&aggregates);

    info!(
        rows = pivot.rows.len(),
        airlines = pivot.airlines.len(),
        "Semester report built"
    );

    Ok(SemesterReport { aggregates, pivot })
}

/// Loads the sources named by `config` and builds the semester report.
pub fn run(config: &ReportConfig) -> Result<SemesterReport> {
    config.validate()?;
    let sources = load_sources(config)?;
    let consolidation = consolidate(&sources, config)?;
    semester_report(consolidation.records, config)
}
