//! The three report variants built on top of the pipeline stages:
//!
//! - [`attendance`]: per-reservation ticket/attendance summary plus
//!   directory-enriched attendee and non-attendee lists.
//! - [`payments`]: status/method/date-filtered per-identifier payment totals.
//! - [`installments`]: block split of installment rows by external reference.
//!
//! Each report is a pure function from loaded table(s) and a
//! [`ReportColumns`](crate::config::ReportColumns) mapping to a structured
//! result, with an XLSX rendering on the side.

pub mod attendance;
pub mod installments;
pub mod payments;
