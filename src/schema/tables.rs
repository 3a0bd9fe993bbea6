//! # Table Declarations

use serde::{Deserialize, Serialize};

use super::Table;

/// Declares a table marker plus its row, insert and patch shapes.
///
/// Rows decode with per-field defaults so a narrowed `select` still decodes;
/// inserts do too, so partial JSON input fills the remaining columns with zero values.
macro_rules! define_table {
    (
        $(#[$meta:meta])*
        $table:ident => $name:literal {
            row: $row:ident,
            insert: $insert:ident,
            patch: $patch:ident,
            fields: { $( $field:ident : $ty:ty ),+ $(,)? }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $table;

        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $row {
            pub id: i64,
            $( pub $field: $ty, )+
        }

        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $insert {
            $( pub $field: $ty, )+
        }

        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $patch {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )+
        }

        impl From<$insert> for $patch {
            fn from(row: $insert) -> Self {
                Self {
                    $( $field: Some(row.$field), )+
                }
            }
        }

        impl From<$row> for $insert {
            fn from(row: $row) -> Self {
                Self {
                    $( $field: row.$field, )+
                }
            }
        }

        impl Table for $table {
            const NAME: &'static str = $name;
            const COLUMNS: &'static [&'static str] = &["id", $( stringify!($field) ),+];

            type Row = $row;
            type Insert = $insert;
            type Patch = $patch;
        }
    };
}

define_table! {
    /// Fuel deliveries received by a station, with tank levels before delivery.
    DeliveryRecords => "delivery_records" {
        row: DeliveryRecordRow,
        insert: DeliveryRecordInsert,
        patch: DeliveryRecordPatch,
        fields: {
            delivery_date: String,
            station: String,
            regular_tank_volume: f64,
            plus_tank_volume: f64,
            super_tank_volume: f64,
            regular_delivered: f64,
            plus_delivered: f64,
            super_delivered: f64,
            delivery_notes: String,
            created_by: i64,
            bol_number: String,
        }
    }
}

define_table! {
    /// Gas stations operated through the portal.
    Stations => "stations" {
        row: StationRow,
        insert: StationInsert,
        patch: StationPatch,
        fields: {
            station_name: String,
            address: String,
            phone: String,
            operating_hours: String,
            manager_name: String,
            status: String,
            last_updated: String,
            created_by: i64,
        }
    }
}

define_table! {
    /// Store inventory.
    Products => "products" {
        row: ProductRow,
        insert: ProductInsert,
        patch: ProductPatch,
        fields: {
            product_name: String,
            product_code: String,
            category: String,
            price: f64,
            quantity_in_stock: i64,
            minimum_stock: i64,
            supplier: String,
            description: String,
            created_by: i64,
            updated_at: String,
            serial_number: i64,
            weight: f64,
            weight_unit: String,
            department: String,
            merchant_id: i64,
            bar_code_case: String,
            bar_code_unit: String,
            last_updated_date: String,
            last_shopping_date: String,
            case_price: f64,
            unit_per_case: i64,
            unit_price: f64,
            retail_price: f64,
            overdue: bool,
        }
    }
}

define_table! {
    /// Station staff.
    Employees => "employees" {
        row: EmployeeRow,
        insert: EmployeeInsert,
        patch: EmployeePatch,
        fields: {
            employee_id: String,
            first_name: String,
            last_name: String,
            email: String,
            phone: String,
            position: String,
            station: String,
            hire_date: String,
            salary: f64,
            is_active: bool,
            created_by: i64,
            date_of_birth: String,
            current_address: String,
            mailing_address: String,
            reference_name: String,
            id_document_type: String,
            id_document_file_id: i64,
        }
    }
}

define_table! {
    /// End-of-shift sales report for one station.
    DailySalesReports => "daily_sales_reports_enhanced" {
        row: DailySalesReportRow,
        insert: DailySalesReportInsert,
        patch: DailySalesReportPatch,
        fields: {
            report_date: String,
            station: String,
            employee_name: String,
            cash_collection_on_hand: f64,
            total_short_over: f64,
            credit_card_amount: f64,
            debit_card_amount: f64,
            mobile_amount: f64,
            cash_amount: f64,
            grocery_sales: f64,
            ebt_sales: f64,
            grocery_cash_sales: f64,
            grocery_credit_debit_sales: f64,
            lottery_net_sales: f64,
            scratch_off_sales: f64,
            lottery_total_cash: f64,
            regular_gallons: f64,
            super_gallons: f64,
            diesel_gallons: f64,
            total_gallons: f64,
            expenses_data: String,
            day_report_file_id: i64,
            veeder_root_file_id: i64,
            lotto_report_file_id: i64,
            scratch_off_report_file_id: i64,
            total_sales: f64,
            notes: String,
            created_by: i64,
            employee_id: String,
            shift: String,
        }
    }
}

define_table! {
    /// Security-relevant user actions.
    AuditLogs => "audit_logs" {
        row: AuditLogRow,
        insert: AuditLogInsert,
        patch: AuditLogPatch,
        fields: {
            event_type: String,
            user_id: i64,
            username: String,
            ip_address: String,
            user_agent: String,
            event_timestamp: String,
            event_status: String,
            resource_accessed: String,
            action_performed: String,
            failure_reason: String,
            session_id: String,
            risk_level: String,
            additional_data: String,
            station: String,
            geo_location: String,
        }
    }
}

define_table! {
    /// Portal role and station assignment for an authenticated account.
    UserProfiles => "user_profiles" {
        row: UserProfileRow,
        insert: UserProfileInsert,
        patch: UserProfilePatch,
        fields: {
            user_id: String,
            role: String,
            station: String,
            employee_id: String,
            phone: String,
            hire_date: String,
            is_active: bool,
            detailed_permissions: String,
        }
    }
}
