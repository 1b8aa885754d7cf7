use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Account role. Stored and serialized as its upper-case name.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Role {
    Employee,
    Manager,
}

impl Role {
    pub fn is_manager(self) -> bool {
        self == Role::Manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_stored_names() {
        assert_eq!(Role::from_str("EMPLOYEE").unwrap(), Role::Employee);
        assert_eq!(Role::from_str("manager").unwrap(), Role::Manager);
        assert!(Role::from_str("ADMIN").is_err());
        assert_eq!(Role::Manager.as_ref(), "MANAGER");
    }
}
