//! Access policy for invoicing operations.
//!
//! A single decision function maps a caller and the action it attempts to
//! allow/deny, instead of comparing role strings at each call site.

use std::fmt;
use std::str::FromStr;

/// Clinic staff roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    Accountant,
    Receptionist,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Accountant => "accountant",
            Role::Receptionist => "receptionist",
            Role::Doctor => "doctor",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "accountant" => Ok(Role::Accountant),
            "receptionist" => Ok(Role::Receptionist),
            "doctor" => Ok(Role::Doctor),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller, as asserted by the upstream gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// `None` when no role was supplied.
    pub role: Option<Role>,
    pub user_id: Option<String>,
    pub clinic_id: Option<String>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            role: None,
            user_id: None,
            clinic_id: None,
        }
    }

    pub fn with_role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Self::anonymous()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewInvoices,
    CreateInvoice,
    UpdateInvoiceStatus,
    ViewSummary,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewInvoices => "view_invoices",
            Action::CreateInvoice => "create_invoice",
            Action::UpdateInvoiceStatus => "update_invoice_status",
            Action::ViewSummary => "view_summary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No recognizable role was presented.
    Unauthenticated,
    Deny,
}

/// Decide whether `principal` may perform `action`.
pub fn authorize(principal: &Principal, action: Action) -> Decision {
    let Some(role) = principal.role else {
        return Decision::Unauthenticated;
    };

    let allowed = match role {
        Role::Owner | Role::Admin | Role::Accountant => true,
        Role::Receptionist => matches!(
            action,
            Action::ViewInvoices | Action::CreateInvoice | Action::UpdateInvoiceStatus
        ),
        Role::Doctor => matches!(action, Action::ViewInvoices),
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}
