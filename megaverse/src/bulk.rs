use crate::dispatcher::ObjectDispatcher;
use crate::errors::{BulkError, DispatchError};
use crate::metrics_defs::BULK_OPERATIONS;
use crate::pacing::run_paced;
use crate::types::{Attributes, BulkOperation, ObjectType, Position, RunSummary};
use serde::{Deserialize, Serialize};
use shared::counter;
use tokio::time::Duration;

pub const SPACE_LABEL: &str = "SPACE";

/// Row-major matrix of cell labels such as `"POLYANET"`, `"RED_SOLOON"`,
/// `"UP_COMETH"` or `"SPACE"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridPlan(pub Vec<Vec<String>>);

impl GridPlan {
    /// Decodes every cell into a create operation, skipping empty space.
    ///
    /// The whole plan is decoded before anything runs so that a bad label
    /// never leaves a half-applied plan behind.
    pub fn decode(&self) -> Result<(Vec<BulkOperation>, usize), BulkError> {
        let mut operations = Vec::new();
        let mut skipped = 0;

        for (row, cells) in self.0.iter().enumerate() {
            for (column, label) in cells.iter().enumerate() {
                let position = Position::new(row as u32, column as u32);
                match decode_label(label) {
                    Ok(Some((object_type, attributes))) => {
                        operations.push(BulkOperation::create(object_type, position, attributes))
                    }
                    Ok(None) => skipped += 1,
                    Err(source) => {
                        return Err(BulkError::InvalidLabel {
                            position,
                            label: label.clone(),
                            source,
                        });
                    }
                }
            }
        }

        Ok((operations, skipped))
    }
}

/// Decodes a single plan label. Labels are case-insensitive.
///
/// `SPACE` yields `None`. Otherwise the label is split on its first
/// underscore into `<ATTR>_<TYPE>`; the type is lower-cased and pluralized to
/// find the object type, and the attribute becomes the Soloon color or
/// Cometh direction. A label without an underscore names the type alone.
pub fn decode_label(label: &str) -> Result<Option<(ObjectType, Attributes)>, DispatchError> {
    if label.eq_ignore_ascii_case(SPACE_LABEL) {
        return Ok(None);
    }

    let (attribute, type_name) = match label.split_once('_') {
        Some((attribute, type_name)) => (Some(attribute.to_ascii_lowercase()), type_name),
        None => (None, label),
    };

    let object_type: ObjectType = format!("{}s", type_name.to_ascii_lowercase()).parse()?;

    let attributes = match (object_type, attribute) {
        (ObjectType::Polyanet, None) => Attributes::default(),
        (ObjectType::Soloon, Some(color)) => Attributes::color(color.parse()?),
        (ObjectType::Cometh, Some(direction)) => Attributes::direction(direction.parse()?),
        (ObjectType::Polyanet, Some(attribute)) => {
            return Err(DispatchError::InvalidAttribute {
                attribute: "polyanet attribute",
                value: attribute,
            });
        }
        (ObjectType::Soloon, None) => {
            return Err(DispatchError::MissingAttribute {
                object_type,
                attribute: "color",
            });
        }
        (ObjectType::Cometh, None) => {
            return Err(DispatchError::MissingAttribute {
                object_type,
                attribute: "direction",
            });
        }
    };

    Ok(Some((object_type, attributes)))
}

/// Executes `operations` strictly in order, pausing `delay` between them.
///
/// Every operation is validated up front; the run then stops at the first
/// upstream failure. Already applied operations are not rolled back.
pub async fn run_bulk(
    dispatcher: &ObjectDispatcher,
    operations: &[BulkOperation],
    delay: Duration,
) -> Result<RunSummary, BulkError> {
    let applied = run_operations(dispatcher, operations, delay, "bulk").await?;
    Ok(RunSummary {
        applied,
        skipped: 0,
    })
}

/// Applies a grid plan cell by cell through the create path.
///
/// `SPACE` cells issue no call and consume no delay.
pub async fn run_plan(
    dispatcher: &ObjectDispatcher,
    plan: &GridPlan,
    delay: Duration,
) -> Result<RunSummary, BulkError> {
    let (operations, skipped) = plan.decode()?;
    tracing::info!(
        operations = operations.len(),
        skipped,
        "Decoded grid plan"
    );

    let applied = run_operations(dispatcher, &operations, delay, "plan").await?;
    Ok(RunSummary { applied, skipped })
}

async fn run_operations(
    dispatcher: &ObjectDispatcher,
    operations: &[BulkOperation],
    delay: Duration,
    kind: &'static str,
) -> Result<usize, BulkError> {
    for (index, operation) in operations.iter().enumerate() {
        if let Err(source) = dispatcher.prepare(operation) {
            return Err(BulkError::OperationFailed {
                index,
                operation: *operation,
                completed: 0,
                source,
            });
        }
    }

    let result = run_paced(operations.iter().copied(), delay, move |operation| {
        dispatcher.execute(operation)
    })
    .await;

    match result {
        Ok(applied) => {
            counter!(BULK_OPERATIONS, "source" => kind, "outcome" => "ok")
                .increment(applied as u64);
            tracing::info!(source = kind, applied, "Bulk run complete");
            Ok(applied)
        }
        Err(failure) => {
            counter!(BULK_OPERATIONS, "source" => kind, "outcome" => "ok")
                .increment(failure.completed as u64);
            counter!(BULK_OPERATIONS, "source" => kind, "outcome" => "failed").increment(1);
            tracing::error!(
                source = kind,
                index = failure.index,
                position = %failure.item.position,
                error = %failure.error,
                "Bulk run halted"
            );
            Err(BulkError::OperationFailed {
                index: failure.index,
                operation: failure.item,
                completed: failure.completed,
                source: failure.error,
            })
        }
    }
}
