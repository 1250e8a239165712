//! Flight/passenger inner join, airline left join and projection.

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{
    Airline, ConsolidatedRecord, EnrichedRecord, Flight, JoinedRecord, Passenger,
};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Inner join of flights to passengers on `Cve_Cliente = ID_Pasajero`.
///
/// Emits one row per matching (flight, passenger) pair in flight order.
/// Flights without a passenger and passengers without a flight are dropped.
pub fn inner_join(flights: &[Flight], passengers: &[Passenger]) -> Vec<JoinedRecord> {
    let mut by_id: HashMap<&str, Vec<&Passenger>> = HashMap::new();
    for passenger in passengers {
        by_id.entry(passenger.id.as_str()).or_default().push(passenger);
    }

    let mut joined = Vec::with_capacity(flights.len());
    let mut unmatched_flights = 0usize;

    for flight in flights {
        match by_id.get(flight.client_id.as_str()) {
            Some(matches) => {
                for passenger in matches {
                    joined.push(JoinedRecord {
                        flight: flight.clone(),
                        passenger: (*passenger).clone(),
                    });
                }
            }
            None => {
                unmatched_flights += 1;
                debug!(client_id = %flight.client_id, "Flight has no matching passenger");
            }
        }
    }

    info!(
        flights = flights.len(),
        passengers = passengers.len(),
        joined = joined.len(),
        unmatched_flights,
        "Flights joined to passengers"
    );

    joined
}

/// Builds the code lookup for the airline reference table.
///
/// # Errors
///
/// Returns [`PipelineError::DuplicateAirlineCode`] if a code appears twice.
pub fn index_airlines(airlines: &[Airline]) -> Result<HashMap<&str, &Airline>> {
    let mut index = HashMap::with_capacity(airlines.len());
    for airline in airlines {
        if index.insert(airline.code.as_str(), airline).is_some() {
            return Err(PipelineError::DuplicateAirlineCode(airline.code.clone()));
        }
    }
    Ok(index)
}

/// Left join of the joined rows to the airline table on `Cve_LA = Code`.
///
/// Every input row is kept. Rows whose code is unknown, or whose airline has
/// an empty name, get `sentinel` as the airline name.
pub fn left_join_airlines(
    rows: Vec<JoinedRecord>,
    airlines: &[Airline],
    sentinel: &str,
) -> Result<Vec<EnrichedRecord>> {
    let index = index_airlines(airlines)?;
    let mut unmatched_codes = BTreeSet::new();

    let enriched: Vec<EnrichedRecord> = rows
        .into_iter()
        .map(|joined| {
            let name = index
                .get(joined.flight.airline_code.as_str())
                .and_then(|airline| airline.name.as_deref())
                .filter(|name| !name.is_empty());

            match name {
                Some(name) => EnrichedRecord {
                    airline: name.to_string(),
                    matched: true,
                    joined,
                },
                None => {
                    unmatched_codes.insert(joined.flight.airline_code.clone());
                    EnrichedRecord {
                        airline: sentinel.to_string(),
                        matched: false,
                        joined,
                    }
                }
            }
        })
        .collect();

    let unmatched_rows = enriched.iter().filter(|r| !r.matched).count();
    if unmatched_rows > 0 {
        warn!(
            unmatched_rows,
            codes = ?unmatched_codes,
            sentinel,
            "Airline codes without a reference name"
        );
    }
    info!(rows = enriched.len(), unmatched_rows, "Airline names attached");

    Ok(enriched)
}

/// Keeps only the reporting columns.
pub fn project(rows: Vec<EnrichedRecord>) -> Vec<ConsolidatedRecord> {
    rows.into_iter()
        .map(|row| {
            let EnrichedRecord {
                joined: JoinedRecord { flight, passenger },
                airline,
                ..
            } = row;
            ConsolidatedRecord {
                trip_date: flight.trip_date,
                class: flight.class,
                price: flight.price,
                route: flight.route,
                age: passenger.age,
                airline,
            }
        })
        .collect()
}
