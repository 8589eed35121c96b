//! Request and response bodies for the JSON API.

pub mod accounting;
pub mod invoices;

pub use accounting::AccountingSummaryResponse;
pub use invoices::{
    CreateInvoiceRequest, CreateInvoiceResponse, InvoiceDetailResponse, InvoiceItemRequest,
    InvoiceListItem, ListInvoicesQuery, ListInvoicesResponse, OkResponse,
    UpdateInvoiceStatusRequest,
};
