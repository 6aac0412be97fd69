//! Authentication context and page-level access control
//!
//! Identity is resolved by an [`AuthProvider`] into an [`AuthContext`]. Access
//! to a group of routes is decided by a [`PagePolicy`]: a principal may open a
//! page if its role grants that page or its own page-access list names it.

use anyhow::Result;
use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Page names known to the CRM
pub mod pages {
    pub const DASHBOARD: &str = "Dashboard";
    pub const CALL_LOG: &str = "CallLog";
    pub const LEADS: &str = "Leads";
    pub const ORDERS: &str = "Orders";
    pub const MASTER_DATA: &str = "MasterData";
}

/// Role that is granted every page by default
pub const ADMIN_ROLE: &str = "Admin";

/// Wildcard entry granting every page
pub const ALL_PAGES: &str = "*";

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub email: Option<String>,
    pub role: String,
    #[serde(default)]
    pub page_access: Vec<String>,
}

/// Authorization context extracted from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    User(Principal),

    /// No authentication
    Anonymous,
}

impl AuthContext {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthContext::User(principal) => Some(principal),
            AuthContext::Anonymous => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.principal().is_some_and(|p| p.role == ADMIN_ROLE)
    }
}

/// Resolves the caller of a request
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn extract_context(&self, headers: &HeaderMap) -> Result<AuthContext>;
}

/// Trusts identity headers set by an upstream gateway
///
/// Reads `x-user-id`, `x-user-email`, `x-user-role` and `x-page-access`
/// (comma-separated). A request without `x-user-id` or `x-user-role` is
/// anonymous.
#[derive(Debug, Clone, Default)]
pub struct TrustedHeaderAuthProvider;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const PAGE_ACCESS_HEADER: &str = "x-page-access";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| anyhow::anyhow!("header {} is not valid ASCII", name))?
                .trim();
            Ok((!value.is_empty()).then_some(value))
        }
    }
}

#[async_trait]
impl AuthProvider for TrustedHeaderAuthProvider {
    async fn extract_context(&self, headers: &HeaderMap) -> Result<AuthContext> {
        let (Some(id), Some(role)) = (
            header(headers, USER_ID_HEADER)?,
            header(headers, USER_ROLE_HEADER)?,
        ) else {
            return Ok(AuthContext::Anonymous);
        };

        let page_access = header(headers, PAGE_ACCESS_HEADER)?
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|page| !page.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(AuthContext::User(Principal {
            id: id.to_string(),
            email: header(headers, USER_EMAIL_HEADER)?.map(String::from),
            role: role.to_string(),
            page_access,
        }))
    }
}

/// Role to page table
///
/// Deserializes from a map such as `{ Admin: ["*"], Sales: [Leads, Orders] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PagePolicy {
    roles: BTreeMap<String, Vec<String>>,
}

impl Default for PagePolicy {
    fn default() -> Self {
        Self::empty().grant(ADMIN_ROLE, [ALL_PAGES])
    }
}

impl PagePolicy {
    /// A policy that grants nothing by role
    pub fn empty() -> Self {
        Self {
            roles: BTreeMap::new(),
        }
    }

    pub fn grant<I, S>(mut self, role: &str, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .entry(role.to_string())
            .or_default()
            .extend(pages.into_iter().map(Into::into));
        self
    }

    /// Pages granted to a role
    pub fn pages_for(&self, role: &str) -> &[String] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn allows(&self, principal: &Principal, page: &str) -> bool {
        let by_role = self
            .pages_for(&principal.role)
            .iter()
            .any(|p| p == ALL_PAGES || p == page);
        by_role || principal.page_access.iter().any(|p| p == page)
    }
}
