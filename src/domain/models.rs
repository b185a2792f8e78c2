//! Payloads exchanged with the user management service

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Address {
    pub country: String,
    pub city: String,
    pub street: String,
    pub flat_house: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CreditCard {
    pub num: String,
    pub cvv: String,
    pub exp_date: String,
}

/// Body of `POST /v1/users`. Absent optionals are sent as `null`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserCreate {
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub salary: Option<f64>,
    pub about_me: String,
    #[serde(default)]
    pub credit_card: Option<CreditCard>,
}

/// Body of `PUT /v1/users/{id}`; only the fields present are changed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_card: Option<CreditCard>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserSearchRequest {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
}

impl UserSearchRequest {
    /// Non-blank filters as query pairs, in a fixed order.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("name", self.name.as_deref()),
            ("surname", self.surname.as_deref()),
            ("email", self.email.as_deref()),
            ("gender", self.gender.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| (key, value))
        })
        .collect()
    }
}
