use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownField;

/// Prefix the presentation layer adds when rendering a stored photo.
pub const PHOTO_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Numeric form input. Keeps the JSON shape it arrived in so a record fetched
/// from the API serializes back unchanged, while typed input stays text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormNumber {
    Number(serde_json::Number),
    Text(String),
}

impl FormNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl Default for FormNumber {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for FormNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for FormNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FormNumber {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Identity,
    Fullname,
    Salary,
    Iban,
    BirthYear,
    Department,
    Photo,
    Fulltime,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Identity,
        Field::Fullname,
        Field::Salary,
        Field::Iban,
        Field::BirthYear,
        Field::Department,
        Field::Photo,
        Field::Fulltime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Identity => "identity",
            Field::Fullname => "fullname",
            Field::Salary => "salary",
            Field::Iban => "iban",
            Field::BirthYear => "birth_year",
            Field::Department => "department",
            Field::Photo => "photo",
            Field::Fulltime => "fulltime",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "full_time" => Ok(Field::Fulltime),
            _ => Field::ALL
                .into_iter()
                .find(|field| field.as_str() == name)
                .ok_or_else(|| UnknownField(name.to_string())),
        }
    }
}

/// The employee currently shown in the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "EmployeeRecordWire")]
pub struct EmployeeRecord {
    pub identity: String,
    pub fullname: String,
    pub salary: FormNumber,
    pub iban: String,
    pub birth_year: FormNumber,
    pub department: String,
    pub photo: String,
    pub fulltime: bool,
}

/// Decoding shape of [`EmployeeRecord`]. Missing and `null` fields fall back
/// to defaults. Records written through both the hire and the update models
/// carry `full_time` and `fulltime` together; `fulltime` wins.
#[derive(Deserialize)]
struct EmployeeRecordWire {
    identity: Option<String>,
    fullname: Option<String>,
    salary: Option<FormNumber>,
    iban: Option<String>,
    birth_year: Option<FormNumber>,
    department: Option<String>,
    photo: Option<String>,
    fulltime: Option<bool>,
    full_time: Option<bool>,
}

impl From<EmployeeRecordWire> for EmployeeRecord {
    fn from(wire: EmployeeRecordWire) -> Self {
        Self {
            identity: wire.identity.unwrap_or_default(),
            fullname: wire.fullname.unwrap_or_default(),
            salary: wire.salary.unwrap_or_default(),
            iban: wire.iban.unwrap_or_default(),
            birth_year: wire.birth_year.unwrap_or_default(),
            department: wire.department.unwrap_or_default(),
            photo: wire.photo.unwrap_or_default(),
            fulltime: wire.fulltime.or(wire.full_time).unwrap_or_default(),
        }
    }
}

impl EmployeeRecord {
    /// Copy of `self` with one field replaced by raw form input.
    pub fn with_field(&self, field: Field, value: &str) -> Self {
        let mut next = self.clone();
        match field {
            Field::Identity => next.identity = value.to_string(),
            Field::Fullname => next.fullname = value.to_string(),
            Field::Salary => next.salary = FormNumber::from(value),
            Field::Iban => next.iban = value.to_string(),
            Field::BirthYear => next.birth_year = FormNumber::from(value),
            Field::Department => next.department = value.to_string(),
            Field::Photo => next.photo = strip_data_uri(value).to_string(),
            Field::Fulltime => next.fulltime = parse_flag(value),
        }
        next
    }

    pub fn field_text(&self, field: Field) -> String {
        match field {
            Field::Identity => self.identity.clone(),
            Field::Fullname => self.fullname.clone(),
            Field::Salary => self.salary.to_string(),
            Field::Iban => self.iban.clone(),
            Field::BirthYear => self.birth_year.to_string(),
            Field::Department => self.department.clone(),
            Field::Photo => self.photo.clone(),
            Field::Fulltime => self.fulltime.to_string(),
        }
    }

    pub fn photo_data_uri(&self) -> String {
        format!("{PHOTO_DATA_URI_PREFIX}{}", self.photo)
    }
}

/// Drops a `data:<mime>;base64,` prefix, leaving bare base64 untouched.
pub fn strip_data_uri(value: &str) -> &str {
    if !value.starts_with("data:") {
        return value;
    }
    match value.find(";base64,") {
        Some(idx) => &value[idx + ";base64,".len()..],
        None => value,
    }
}

/// Checkbox-style coercion of form text to a boolean.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}
