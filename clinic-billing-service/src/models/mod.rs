//! Domain models for clinic-billing-service.

mod invoice;
mod invoice_item;
mod payment;
mod summary;

pub use invoice::{
    Invoice, InvoiceListEntry, InvoiceStatus, InvoiceStatusError, ListInvoicesFilter, NewInvoice,
    NewInvoiceItem, StatusChange, StatusTransition,
};
pub use invoice_item::InvoiceItem;
pub use payment::{Payment, DEFAULT_PAYMENT_METHOD};
pub use summary::{AccountingSummary, InvoiceBalance};
