//! Closed value sets stored as text columns.
//!
//! Every enum serializes in SCREAMING_SNAKE_CASE and round-trips through
//! `as_str` / `FromStr`, which is how the Postgres backend stores them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Unknown {} value: {}", stringify!($name), other)),
                }
            }
        }
    };
}

text_enum!(
    /// Role a member holds on a project team.
    ProfessionalRole {
        Accountant => "ACCOUNTANT",
        DocumentController => "DOCUMENT_CONTROLLER",
        Foreman => "FOREMAN",
        ProjectEngineer => "PROJECT_ENGINEER",
        ProjectMember => "PROJECT_MEMBER",
        ProjectManager => "PROJECT_MANAGER",
        ProjectDirector => "PROJECT_DIRECTOR",
        QuantitySurveyor => "QUANTITY_SURVEYOR",
        SiteSupervisor => "SITE_SUPERVISOR",
        SiteEngineer => "SITE_ENGINEER",
        SiteAdmin => "SITE_ADMIN",
    }
);

text_enum!(
    TaskStatus {
        NotStarted => "NOT_STARTED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
    }
);

text_enum!(
    /// Unit of measure for delivered materials.
    MaterialUnit {
        M => "M",
        M2 => "M2",
        M3 => "M3",
        Kg => "KG",
        Tonnes => "TONNES",
        Nr => "NR",
        Litres => "LITRES",
        Bags => "BAGS",
    }
);

text_enum!(
    WeatherCondition {
        Sunny => "SUNNY",
        Cloudy => "CLOUDY",
        Rainy => "RAINY",
    }
);

text_enum!(
    /// Which field a task search term is matched against.
    TaskSearchCategory {
        Description => "DESCRIPTION",
        AssignedTo => "ASSIGNED_TO",
        AssignedBy => "ASSIGNED_BY",
    }
);

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::NotStarted
    }
}

impl Default for ProfessionalRole {
    fn default() -> Self {
        ProfessionalRole::ProjectMember
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_round_trip() {
        for role in ProfessionalRole::ALL {
            assert_eq!(role.as_str().parse::<ProfessionalRole>().unwrap(), *role);
        }
        for unit in MaterialUnit::ALL {
            assert_eq!(unit.as_str().parse::<MaterialUnit>().unwrap(), *unit);
        }
    }

    #[test]
    fn test_enum_wire_format() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let parsed: ProfessionalRole = serde_json::from_str("\"QUANTITY_SURVEYOR\"").unwrap();
        assert_eq!(parsed, ProfessionalRole::QuantitySurveyor);
    }

    #[test]
    fn test_unknown_value_rejected() {
        assert!("FOGGY".parse::<WeatherCondition>().is_err());
        assert_eq!(TaskStatus::default(), TaskStatus::NotStarted);
    }
}
