use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $s)]
                $variant
            ),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Currency {
    Usd => "USD",
    Mxn => "MXN",
});

str_enum!(InvoiceStatus {
    Pending => "pending",
    Paid => "paid",
    Cancelled => "cancelled",
});

str_enum!(ExpenseStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

str_enum!(CustomsStatus {
    InProcess => "in_process",
    Cleared => "cleared",
    Held => "held",
});

str_enum!(MatchConfidence {
    Exact => "exact",
    Likely => "likely",
    NoMatch => "no_match",
});

str_enum!(ExtractionConfidence {
    High => "high",
    Medium => "medium",
    Low => "low",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn currency_round_trips_through_str() {
        assert_eq!(Currency::from_str("USD").unwrap(), Currency::Usd);
        assert_eq!(Currency::from_str("MXN").unwrap(), Currency::Mxn);
        assert_eq!(Currency::Usd.as_str(), "USD");
    }

    #[test]
    fn unknown_value_is_rejected() {
        assert!(Currency::from_str("EUR").is_err());
        assert!(InvoiceStatus::from_str("overdue").is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&MatchConfidence::NoMatch).unwrap();
        assert_eq!(json, "\"no_match\"");
        let back: MatchConfidence = serde_json::from_str("\"exact\"").unwrap();
        assert_eq!(back, MatchConfidence::Exact);
    }
}
