//! Configured CSV header names.
//!
//! The pipeline never hardcodes the column headers of a ticketing export;
//! they vary between installations and are supplied by the caller. The
//! defaults here match the standard Roboticket export layout. Matching is
//! whitespace- and case-insensitive (see [`crate::table::Table::find_column`]),
//! so small header variations do not require reconfiguration.

use serde::{Deserialize, Serialize};

/// Header names of the columns the reports read from an uploaded export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportColumns {
    /// CRM identifier of the ticket holder.
    pub identifier: String,
    /// Given name (attendance exports split the name in two).
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Combined fan/company display name (payment exports carry it whole).
    pub fan_company: String,
    /// Reservation (community allocation) name; the grouping key.
    pub reservation: String,
    /// Attendance marker column ("Yes" when the holder showed up).
    pub attendance: String,
    /// Ticket status column.
    pub status: String,
    /// Payment method column.
    pub payment_method: String,
    /// Transaction date column.
    pub date: String,
    /// Ticket price column.
    pub price: String,
    /// Installment external-reference column; the block key for splitting.
    pub ext_ref: String,
}

impl Default for ReportColumns {
    fn default() -> Self {
        Self {
            identifier: "User Id".into(),
            first_name: "First name".into(),
            last_name: "Last name".into(),
            fan_company: "Fan / Company".into(),
            reservation: "CloseLink reservation name".into(),
            attendance: "Attendance".into(),
            status: "Status".into(),
            payment_method: "Payment method".into(),
            date: "Date.1".into(),
            price: "Price".into(),
            ext_ref: "InstallmentPaymentExtRef".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_roboticket_layout() {
        let columns = ReportColumns::default();
        assert_eq!(columns.identifier, "User Id");
        assert_eq!(columns.reservation, "CloseLink reservation name");
        assert_eq!(columns.ext_ref, "InstallmentPaymentExtRef");
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let columns: ReportColumns =
            serde_json::from_str(r#"{"identifier": "Member Id"}"#).unwrap();
        assert_eq!(columns.identifier, "Member Id");
        assert_eq!(columns.attendance, "Attendance");
        assert_eq!(columns.price, "Price");
    }
}
