//! Extracted invoice record and its typed partial update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "USD";

/// Structured data pulled from one PDF. `filename` is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub filename: String,

    // Invoice/order
    pub invoice_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub order_date: Option<String>,
    pub due_date: Option<String>,

    // Financial
    pub total_amount: Option<f64>,
    pub tax_amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,

    // Product/service
    pub items_description: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,

    // Addresses
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,

    pub vendor_name: Option<String>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,

    pub content_preview: String,
    #[serde(default)]
    pub full_text: String,
    pub extracted_at: DateTime<Utc>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl ExtractedRecord {
    /// A record with only the system fields set.
    pub fn empty(
        filename: impl Into<String>,
        content_preview: impl Into<String>,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            filename: filename.into(),
            invoice_number: None,
            customer_name: None,
            customer_email: None,
            order_date: None,
            due_date: None,
            total_amount: None,
            tax_amount: None,
            currency: default_currency(),
            items_description: None,
            quantity: None,
            unit_price: None,
            billing_address: None,
            shipping_address: None,
            vendor_name: None,
            payment_terms: None,
            notes: None,
            content_preview: content_preview.into(),
            full_text: String::new(),
            extracted_at,
        }
    }
}

/// Partial update of the editable fields of an [`ExtractedRecord`].
///
/// Absent and `null` fields leave the target untouched. Unknown keys are a
/// deserialization error, so a typo in a client payload is rejected instead
/// of silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordUpdate {
    pub invoice_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub order_date: Option<String>,
    pub due_date: Option<String>,
    pub total_amount: Option<f64>,
    pub tax_amount: Option<f64>,
    pub currency: Option<String>,
    pub items_description: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
    pub vendor_name: Option<String>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
}

macro_rules! merge_fields {
    ($update:expr, $record:expr, [$($opt:ident),* $(,)?], [$($req:ident),* $(,)?]) => {{
        $(
            if let Some(value) = &$update.$opt {
                $record.$opt = Some(value.clone());
            }
        )*
        $(
            if let Some(value) = &$update.$req {
                $record.$req = value.clone();
            }
        )*
    }};
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrites every field of `record` that is set in this update.
    pub fn apply_to(&self, record: &mut ExtractedRecord) {
        merge_fields!(
            self,
            record,
            [
                invoice_number,
                customer_name,
                customer_email,
                order_date,
                due_date,
                total_amount,
                tax_amount,
                items_description,
                quantity,
                unit_price,
                billing_address,
                shipping_address,
                vendor_name,
                payment_terms,
                notes,
            ],
            [currency]
        );
    }
}

/// Describes one editable field, for clients that build forms dynamically.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldInfo {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    pub required: bool,
    pub display_name: &'static str,
}

const fn field(
    name: &'static str,
    field_type: &'static str,
    description: &'static str,
    display_name: &'static str,
) -> FieldInfo {
    FieldInfo {
        name,
        field_type,
        description,
        default: None,
        required: false,
        display_name,
    }
}

/// The fields a [`RecordUpdate`] can touch, in display order.
pub const EDITABLE_FIELDS: &[FieldInfo] = &[
    field("invoice_number", "string", "Invoice or order number", "Invoice Number"),
    field("customer_name", "string", "Customer name", "Customer Name"),
    field("customer_email", "string", "Customer email", "Customer Email"),
    field("order_date", "string", "Order date", "Order Date"),
    field("due_date", "string", "Due date", "Due Date"),
    field("total_amount", "number", "Total amount", "Total Amount"),
    field("tax_amount", "number", "Tax amount", "Tax Amount"),
    FieldInfo {
        default: Some(DEFAULT_CURRENCY),
        ..field("currency", "string", "Currency code", "Currency")
    },
    field(
        "items_description",
        "string",
        "Items or services description",
        "Items Description",
    ),
    field("quantity", "integer", "Quantity of items", "Quantity"),
    field("unit_price", "number", "Unit price", "Unit Price"),
    field("billing_address", "string", "Billing address", "Billing Address"),
    field("shipping_address", "string", "Shipping address", "Shipping Address"),
    field("vendor_name", "string", "Vendor or supplier name", "Vendor Name"),
    field("payment_terms", "string", "Payment terms", "Payment Terms"),
    field("notes", "string", "Additional notes", "Notes"),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractedRecord {
        let mut record = ExtractedRecord::empty("a.pdf", "preview", Utc::now());
        record.invoice_number = Some("INV-1".to_string());
        record.total_amount = Some(10.0);
        record
    }

    #[test]
    fn test_empty_record_defaults() {
        let record = ExtractedRecord::empty("x.pdf", "nothing", Utc::now());
        assert_eq!(record.currency, "USD");
        assert!(record.full_text.is_empty());
        assert!(record.invoice_number.is_none());
    }

    #[test]
    fn test_apply_overwrites_only_set_fields() {
        let mut record = sample();
        let update = RecordUpdate {
            customer_name: Some("Jane Doe".to_string()),
            total_amount: Some(99.5),
            ..Default::default()
        };
        update.apply_to(&mut record);

        assert_eq!(record.customer_name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.total_amount, Some(99.5));
        assert_eq!(record.invoice_number.as_deref(), Some("INV-1"));
        assert_eq!(record.currency, "USD");
    }

    #[test]
    fn test_null_fields_leave_record_untouched() {
        let mut record = sample();
        let update: RecordUpdate =
            serde_json::from_str(r#"{"invoice_number": null, "currency": "EUR"}"#).unwrap();
        update.apply_to(&mut record);

        assert_eq!(record.invoice_number.as_deref(), Some("INV-1"));
        assert_eq!(record.currency, "EUR");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: Result<RecordUpdate, _> =
            serde_json::from_str(r#"{"invoice_numbr": "INV-2"}"#);
        assert!(result.is_err());

        let result: Result<RecordUpdate, _> = serde_json::from_str(r#"{"filename": "b.pdf"}"#);
        assert!(result.is_err(), "filename is not editable");
    }

    #[test]
    fn test_is_empty() {
        assert!(RecordUpdate::default().is_empty());
        let update = RecordUpdate {
            notes: Some("n".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_snapshot_json_round_trip_keeps_full_text() {
        let mut record = sample();
        record.full_text = "Invoice #INV-1\nTotal: 10".to_string();
        let json = serde_json::to_string(&record).unwrap();
        let back: ExtractedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_editable_fields_match_update_struct() {
        let update = serde_json::to_value(RecordUpdate::default()).unwrap();
        let keys = update.as_object().unwrap();
        assert_eq!(keys.len(), EDITABLE_FIELDS.len());
        for field in EDITABLE_FIELDS {
            assert!(keys.contains_key(field.name), "missing {}", field.name);
        }
    }
}
