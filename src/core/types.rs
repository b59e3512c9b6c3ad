use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Implements Display and rusqlite text (de)serialization for enums that
/// already provide `as_str` and `FromStr<Err = String>`.
macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl rusqlite::types::FromSql for $ty {
            fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
                let s = value.as_str()?;
                <$ty>::from_str(s).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(std::io::Error::other(e))))
            }
        }

        impl rusqlite::types::ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::Borrowed(rusqlite::types::ValueRef::Text(
                    self.as_str().as_bytes(),
                )))
            }
        }
    };
}

/// Gender of the person named in a generated video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Gender::Male => "Мужской",
            Gender::Female => "Женский",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }
}

text_enum_sql!(Gender);

/// Lifecycle of a generation request. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    Pending,
    Done,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Done => "done",
            GenerationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Done | GenerationStatus::Failed)
    }

    /// Whether a record in `self` may move to `next`. Terminal states never change.
    pub fn can_transition_to(&self, next: GenerationStatus) -> bool {
        match self {
            GenerationStatus::Pending => true,
            terminal => *terminal == next,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "⏳",
            GenerationStatus::Done => "✅",
            GenerationStatus::Failed => "❌",
        }
    }
}

impl FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" | "processing" | "queued" => Ok(GenerationStatus::Pending),
            "done" | "completed" => Ok(GenerationStatus::Done),
            "failed" | "error" => Ok(GenerationStatus::Failed),
            _ => Err(format!("Unknown generation status: {}", s)),
        }
    }
}

text_enum_sql!(GenerationStatus);

/// What free-text input the conversation expects next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingFor {
    CustomPrompt,
    FreePrompt,
    Name,
    Gender,
    Email,
}

impl WaitingFor {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitingFor::CustomPrompt => "custom_prompt",
            WaitingFor::FreePrompt => "free_prompt",
            WaitingFor::Name => "name",
            WaitingFor::Gender => "gender",
            WaitingFor::Email => "email",
        }
    }
}

impl FromStr for WaitingFor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "custom_prompt" => Ok(WaitingFor::CustomPrompt),
            "free_prompt" => Ok(WaitingFor::FreePrompt),
            "name" => Ok(WaitingFor::Name),
            "gender" => Ok(WaitingFor::Gender),
            "email" => Ok(WaitingFor::Email),
            _ => Err(format!("Unknown waiting state: {}", s)),
        }
    }
}

text_enum_sql!(WaitingFor);

/// Channel membership as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Creator => "creator",
            MembershipStatus::Administrator => "administrator",
            MembershipStatus::Member => "member",
            MembershipStatus::Restricted => "restricted",
            MembershipStatus::Left => "left",
            MembershipStatus::Kicked => "kicked",
        }
    }

    /// Restricted users are still in the channel, so they count as subscribed.
    pub fn is_subscribed(&self) -> bool {
        matches!(
            self,
            MembershipStatus::Creator
                | MembershipStatus::Administrator
                | MembershipStatus::Member
                | MembershipStatus::Restricted
        )
    }
}

impl FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creator" | "owner" => Ok(MembershipStatus::Creator),
            "administrator" => Ok(MembershipStatus::Administrator),
            "member" => Ok(MembershipStatus::Member),
            "restricted" => Ok(MembershipStatus::Restricted),
            "left" => Ok(MembershipStatus::Left),
            "kicked" | "banned" => Ok(MembershipStatus::Kicked),
            _ => Err(format!("Unknown membership status: {}", s)),
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an order is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Card,
    Crypto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Crypto => "crypto",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "crypto" => Ok(PaymentMethod::Crypto),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

text_enum_sql!(PaymentMethod);

/// Order state as known locally. `Paid` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" | "waiting" | "created" => Ok(OrderStatus::Pending),
            "paid" | "succeeded" | "success" | "confirmed" => Ok(OrderStatus::Paid),
            "failed" | "canceled" | "cancelled" | "expired" => Ok(OrderStatus::Failed),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

text_enum_sql!(OrderStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waiting_for_rejects_unknown() {
        assert_eq!(WaitingFor::from_str("name").unwrap(), WaitingFor::Name);
        assert_eq!(WaitingFor::from_str("custom_prompt").unwrap(), WaitingFor::CustomPrompt);
        assert!(WaitingFor::from_str("nickname").is_err());
        assert!(WaitingFor::from_str("").is_err());
    }

    #[test]
    fn test_waiting_for_serde_is_strict() {
        let parsed: WaitingFor = serde_json::from_str("\"free_prompt\"").unwrap();
        assert_eq!(parsed, WaitingFor::FreePrompt);
        assert!(serde_json::from_str::<WaitingFor>("\"whatever\"").is_err());
    }

    #[test]
    fn test_generation_status_terminal_is_sticky() {
        assert!(GenerationStatus::Pending.can_transition_to(GenerationStatus::Done));
        assert!(GenerationStatus::Pending.can_transition_to(GenerationStatus::Failed));
        assert!(!GenerationStatus::Done.can_transition_to(GenerationStatus::Failed));
        assert!(!GenerationStatus::Failed.can_transition_to(GenerationStatus::Pending));
        assert!(GenerationStatus::Done.can_transition_to(GenerationStatus::Done));
    }

    #[test]
    fn test_generation_status_accepts_backend_aliases() {
        assert_eq!(GenerationStatus::from_str("completed").unwrap(), GenerationStatus::Done);
        assert_eq!(GenerationStatus::from_str("processing").unwrap(), GenerationStatus::Pending);
        assert!(GenerationStatus::from_str("???").is_err());
    }

    #[test]
    fn test_membership_subscribed() {
        assert!(MembershipStatus::Member.is_subscribed());
        assert!(MembershipStatus::Restricted.is_subscribed());
        assert!(MembershipStatus::Creator.is_subscribed());
        assert!(!MembershipStatus::Left.is_subscribed());
        assert!(!MembershipStatus::Kicked.is_subscribed());
    }

    #[test]
    fn test_gender_display() {
        assert_eq!(Gender::Female.to_string(), "female");
        assert_eq!(Gender::Male.display_name(), "Мужской");
    }
}
