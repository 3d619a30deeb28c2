//! Sticky sort preferences.
//!
//! The sort criterion and order are each chosen from the query string,
//! then the client's cookie, then the built-in default. A recognized query
//! value is written back as the new cookie value; an unrecognized one is
//! used for this request only.

use std::str::FromStr;

use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::sort::{SortBy, SortOrder};

pub const SORT_COOKIE: &str = "sort";
pub const ORDER_COOKIE: &str = "order";

/// Effective choice for one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    /// Set only when the value came from the request and is recognized.
    pub persist: bool,
}

/// Resolves one axis. Empty query values count as absent.
pub fn choose<T: FromStr>(param: Option<&str>, sticky: Option<&str>, default: &str) -> Choice {
    match param.filter(|p| !p.is_empty()) {
        Some(value) => Choice {
            value: value.to_string(),
            persist: value.parse::<T>().is_ok(),
        },
        None => Choice {
            value: sticky.unwrap_or(default).to_string(),
            persist: false,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub sort: Choice,
    pub order: Choice,
}

impl Preferences {
    pub fn resolve(
        sort_param: Option<&str>,
        order_param: Option<&str>,
        sticky_sort: Option<&str>,
        sticky_order: Option<&str>,
    ) -> Self {
        Self {
            sort: choose::<SortBy>(sort_param, sticky_sort, SortBy::DEFAULT.as_str()),
            order: choose::<SortOrder>(order_param, sticky_order, SortOrder::DEFAULT.as_str()),
        }
    }

    /// Resolves against the cookies the client sent.
    pub fn from_jar(sort_param: Option<&str>, order_param: Option<&str>, jar: &CookieJar) -> Self {
        Self::resolve(
            sort_param,
            order_param,
            jar.get(SORT_COOKIE).map(Cookie::value),
            jar.get(ORDER_COOKIE).map(Cookie::value),
        )
    }

    /// Adds a cookie for every axis that should be persisted.
    pub fn persist(&self, mut jar: CookieJar, path: &str, secure: bool) -> CookieJar {
        for (name, choice) in [(SORT_COOKIE, &self.sort), (ORDER_COOKIE, &self.order)] {
            if choice.persist {
                let cookie = Cookie::build((name, choice.value.clone()))
                    .path(path.to_string())
                    .secure(secure)
                    .build();
                jar = jar.add(cookie);
            }
        }
        jar
    }
}
