//! Department Model

use serde::{Deserialize, Serialize};

/// Department catalog entry (`GET users/departments/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(deserialize_with = "crate::serde_helpers::i64_flexible")]
    pub id: i64,
    pub name: String,
}
