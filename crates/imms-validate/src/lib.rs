//! Validation rules for immunisation batch records.
//!
//! - [`snomed`]: SNOMED CT concept id checks (Verhoeff checksum, partition)
//! - [`nhs`]: NHS number modulus 11 check
//! - [`dates`]: batch date formats and FHIR conversion
//! - [`procedure`]: vaccination procedure code table
//! - [`record`]: the row-level [`RecordValidator`]

pub mod dates;
pub mod nhs;
pub mod procedure;
pub mod record;
pub mod snomed;

pub use dates::{to_fhir_date, to_fhir_date_time};
pub use nhs::is_valid_nhs_number;
pub use procedure::ProcedureCodeTable;
pub use record::{RecordCheck, RecordValidator};
pub use snomed::{is_valid_optional_snomed, is_valid_simple_snomed, verhoeff_is_valid};
