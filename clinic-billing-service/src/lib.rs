//! Clinic Billing Service - invoices, payments and receivables for clinics.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
