use crate::dispatcher::ObjectDispatcher;
use crate::errors::ResetError;
use crate::metrics_defs::GRID_RESET_CELLS;
use crate::pacing::run_paced;
use crate::types::{ObjectType, Position, RunSummary};
use shared::counter;
use tokio::time::Duration;

pub const DEFAULT_GRID_SIZE: u32 = 11;
/// Largest accepted side length. A reset cannot be cancelled once started.
pub const MAX_GRID_SIZE: u32 = 100;

pub fn is_valid_grid_size(size: u32) -> bool {
    (1..=MAX_GRID_SIZE).contains(&size)
}

/// Every cell of a `size`×`size` grid in row-major order.
pub fn row_major(size: u32) -> impl Iterator<Item = Position> + Clone {
    (0..size).flat_map(move |row| (0..size).map(move |column| Position::new(row, column)))
}

/// Clears the grid by deleting a Polyanet at every cell, one cell at a time.
///
/// Cells are never deleted concurrently: the map API rate limits aggressively,
/// so each delete is awaited and followed by `delay` before the next one.
pub async fn reset_grid(
    dispatcher: &ObjectDispatcher,
    grid_size: u32,
    delay: Duration,
) -> Result<RunSummary, ResetError> {
    if !is_valid_grid_size(grid_size) {
        return Err(ResetError::InvalidGridSize {
            size: grid_size,
            max: MAX_GRID_SIZE,
        });
    }

    tracing::info!(grid_size, delay_ms = delay.as_millis() as u64, "Resetting grid");

    let result = run_paced(row_major(grid_size), delay, move |position| {
        dispatcher.delete(ObjectType::Polyanet, position)
    })
    .await;

    match result {
        Ok(applied) => {
            counter!(GRID_RESET_CELLS, "outcome" => "ok").increment(applied as u64);
            tracing::info!(cells = applied, "Grid reset complete");
            Ok(RunSummary {
                applied,
                skipped: 0,
            })
        }
        Err(failure) => {
            counter!(GRID_RESET_CELLS, "outcome" => "ok").increment(failure.completed as u64);
            counter!(GRID_RESET_CELLS, "outcome" => "failed").increment(1);
            tracing::error!(
                position = %failure.item,
                completed = failure.completed,
                error = %failure.error,
                "Grid reset halted"
            );
            Err(ResetError::Halted {
                position: failure.item,
                completed: failure.completed,
                source: failure.error,
            })
        }
    }
}
