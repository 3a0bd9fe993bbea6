//! # Table Schema Registry
//!
//! Every table the portal reads or writes is declared here once. A table is a
//! zero-sized marker type implementing [`Table`], which ties together:
//!
//! - the wire name of the table on the hosted service
//! - its column list (used to reject unknown filter and order columns)
//! - the `Row` shape returned by reads
//! - the `Insert` shape (row minus the generated `id`)
//! - the `Patch` shape (every insert field optional, omitted fields unsent)

mod tables;

use std::fmt::{self, Debug};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use tables::{
    AuditLogInsert, AuditLogPatch, AuditLogRow, AuditLogs, DailySalesReportInsert,
    DailySalesReportPatch, DailySalesReportRow, DailySalesReports, DeliveryRecordInsert,
    DeliveryRecordPatch, DeliveryRecordRow, DeliveryRecords, EmployeeInsert, EmployeePatch,
    EmployeeRow, Employees, ProductInsert, ProductPatch, ProductRow, Products, StationInsert,
    StationPatch, StationRow, Stations, UserProfileInsert, UserProfilePatch, UserProfileRow,
    UserProfiles,
};

/// Name of the generated identifier column shared by every table
pub const ID_COLUMN: &str = "id";

/// A statically declared table
pub trait Table: Send + Sync + 'static {
    /// Table name on the hosted service
    const NAME: &'static str;

    /// All columns, `id` first
    const COLUMNS: &'static [&'static str];

    type Row: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;
    type Insert: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;
    type Patch: Serialize
        + DeserializeOwned
        + Clone
        + Debug
        + Default
        + Send
        + Sync
        + From<Self::Insert>
        + 'static;

    /// Check whether `column` belongs to this table
    fn has_column(column: &str) -> bool {
        Self::COLUMNS.contains(&column)
    }
}

/// Runtime table selector, for callers that pick a table by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    DeliveryRecords,
    Stations,
    Products,
    Employees,
    DailySalesReports,
    AuditLogs,
    UserProfiles,
}

impl TableName {
    pub const ALL: [TableName; 7] = [
        TableName::DeliveryRecords,
        TableName::Stations,
        TableName::Products,
        TableName::Employees,
        TableName::DailySalesReports,
        TableName::AuditLogs,
        TableName::UserProfiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::DeliveryRecords => DeliveryRecords::NAME,
            TableName::Stations => Stations::NAME,
            TableName::Products => Products::NAME,
            TableName::Employees => Employees::NAME,
            TableName::DailySalesReports => DailySalesReports::NAME,
            TableName::AuditLogs => AuditLogs::NAME,
            TableName::UserProfiles => UserProfiles::NAME,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableName::DeliveryRecords => DeliveryRecords::COLUMNS,
            TableName::Stations => Stations::COLUMNS,
            TableName::Products => Products::COLUMNS,
            TableName::Employees => Employees::COLUMNS,
            TableName::DailySalesReports => DailySalesReports::COLUMNS,
            TableName::AuditLogs => AuditLogs::COLUMNS,
            TableName::UserProfiles => UserProfiles::COLUMNS,
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown table: {}", s))
    }
}
