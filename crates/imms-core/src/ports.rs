//! Collaborator interfaces the pipeline is built against.
//!
//! The pipeline receives its permission lookup and outcome sink as
//! arguments; concrete implementations live in [`crate::lookup`],
//! [`crate::sinks`] and [`crate::ack`].

use std::sync::Arc;
use std::time::Duration;

use imms_model::OutcomeRecord;

use crate::error::{LookupError, SinkError};

/// Source of supplier permission strings.
///
/// May be shared between concurrently running batches.
pub trait PermissionLookup: Send + Sync {
    /// Permission strings granted to `supplier`.
    ///
    /// Implementations that do I/O should give up after `timeout` and
    /// return [`LookupError::Timeout`].
    fn lookup_permissions(
        &self,
        supplier: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, LookupError>;
}

impl<T: PermissionLookup + ?Sized> PermissionLookup for Arc<T> {
    fn lookup_permissions(
        &self,
        supplier: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, LookupError> {
        (**self).lookup_permissions(supplier, timeout)
    }
}

/// Destination for per-row outcome records.
///
/// Records arrive in input row order and must be kept in that order.
pub trait OutcomeSink {
    fn publish(&mut self, record: &OutcomeRecord) -> Result<(), SinkError>;

    /// Publish several records, in order.
    fn publish_all(&mut self, records: &[OutcomeRecord]) -> Result<(), SinkError> {
        records.iter().try_for_each(|record| self.publish(record))
    }

    /// Flush buffered output. Called once after the last row.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: OutcomeSink + ?Sized> OutcomeSink for &mut S {
    fn publish(&mut self, record: &OutcomeRecord) -> Result<(), SinkError> {
        (**self).publish(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

impl<S: OutcomeSink + ?Sized> OutcomeSink for Box<S> {
    fn publish(&mut self, record: &OutcomeRecord) -> Result<(), SinkError> {
        (**self).publish(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}
