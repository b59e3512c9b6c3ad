//! Inline button payloads.
//!
//! Every button the bots send is built from a [`CallbackAction`] and every
//! callback query is decoded back into one. Decoding is total: anything not
//! recognized becomes [`CallbackAction::Unknown`].

use crate::core::types::Gender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    CreateVideo,
    Catalog,
    CatalogPage(usize),
    Meme(String),
    Gender(Gender),
    ConfirmGeneration,
    CustomPrompt,
    StartCustomPrompt,
    ShowFullGuide,
    PromptGuide,
    UseFreeGeneration,
    CheckSubscription,
    Buy,
    SelectPackage(String),
    PayCard(String),
    PayCrypto(String),
    PayStars(String),
    Crypto { symbol: String, package: String },
    Chain { symbol: String, chain: String, package: String },
    CheckPayment(String),
    About,
    Profile,
    ProfileHistory(usize),
    Referral,
    RefUser,
    RefExpert,
    /// Lead bot: the proposed name is right
    ConfirmYes,
    /// Lead bot: the proposed name is wrong
    ConfirmNo,
    Unknown(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        let exact = match data {
            "main_menu" => Some(Self::MainMenu),
            "create_video" => Some(Self::CreateVideo),
            "catalog" => Some(Self::Catalog),
            "gender_male" => Some(Self::Gender(Gender::Male)),
            "gender_female" => Some(Self::Gender(Gender::Female)),
            "confirm_gen" => Some(Self::ConfirmGeneration),
            "custom_prompt" => Some(Self::CustomPrompt),
            "start_custom_prompt" => Some(Self::StartCustomPrompt),
            "show_full_guide" => Some(Self::ShowFullGuide),
            "prompt_guide" => Some(Self::PromptGuide),
            "use_free_generation" => Some(Self::UseFreeGeneration),
            "check_subscription" => Some(Self::CheckSubscription),
            "buy" => Some(Self::Buy),
            "about" => Some(Self::About),
            "profile" => Some(Self::Profile),
            "profile_history" => Some(Self::ProfileHistory(0)),
            "referral" => Some(Self::Referral),
            "ref_user" => Some(Self::RefUser),
            "ref_expert" => Some(Self::RefExpert),
            "confirm_yes" => Some(Self::ConfirmYes),
            "confirm_no" => Some(Self::ConfirmNo),
            _ => None,
        };
        if let Some(action) = exact {
            return action;
        }

        Self::parse_prefixed(data).unwrap_or_else(|| Self::Unknown(data.to_string()))
    }

    fn parse_prefixed(data: &str) -> Option<Self> {
        if let Some(page) = data.strip_prefix("catalog_page_") {
            return page.parse().ok().map(Self::CatalogPage);
        }
        if let Some(page) = data.strip_prefix("profile_history:") {
            return page.parse().ok().map(Self::ProfileHistory);
        }
        if let Some(id) = non_empty(data.strip_prefix("meme_")) {
            return Some(Self::Meme(id.to_string()));
        }
        if let Some(key) = non_empty(data.strip_prefix("select_package_")) {
            return Some(Self::SelectPackage(key.to_string()));
        }
        if let Some(key) = non_empty(data.strip_prefix("pay_card_")) {
            return Some(Self::PayCard(key.to_string()));
        }
        if let Some(key) = non_empty(data.strip_prefix("pay_crypto_")) {
            return Some(Self::PayCrypto(key.to_string()));
        }
        if let Some(key) = non_empty(data.strip_prefix("pay_stars_")) {
            return Some(Self::PayStars(key.to_string()));
        }
        if let Some(order_id) = non_empty(data.strip_prefix("check_payment_")) {
            return Some(Self::CheckPayment(order_id.to_string()));
        }
        if let Some(rest) = data.strip_prefix("crypto_") {
            let (symbol, package) = rest.split_once('_')?;
            if symbol.is_empty() || package.is_empty() {
                return None;
            }
            return Some(Self::Crypto {
                symbol: symbol.to_string(),
                package: package.to_string(),
            });
        }
        if let Some(rest) = data.strip_prefix("chain_") {
            let mut parts = rest.splitn(3, ':');
            let (symbol, chain, package) = (parts.next()?, parts.next()?, parts.next()?);
            if symbol.is_empty() || chain.is_empty() || package.is_empty() {
                return None;
            }
            return Some(Self::Chain {
                symbol: symbol.to_string(),
                chain: chain.to_string(),
                package: package.to_string(),
            });
        }
        None
    }

    /// Payload for `InlineKeyboardButton::callback`
    pub fn to_data(&self) -> String {
        match self {
            Self::MainMenu => "main_menu".to_string(),
            Self::CreateVideo => "create_video".to_string(),
            Self::Catalog => "catalog".to_string(),
            Self::CatalogPage(page) => format!("catalog_page_{}", page),
            Self::Meme(id) => format!("meme_{}", id),
            Self::Gender(gender) => format!("gender_{}", gender.as_str()),
            Self::ConfirmGeneration => "confirm_gen".to_string(),
            Self::CustomPrompt => "custom_prompt".to_string(),
            Self::StartCustomPrompt => "start_custom_prompt".to_string(),
            Self::ShowFullGuide => "show_full_guide".to_string(),
            Self::PromptGuide => "prompt_guide".to_string(),
            Self::UseFreeGeneration => "use_free_generation".to_string(),
            Self::CheckSubscription => "check_subscription".to_string(),
            Self::Buy => "buy".to_string(),
            Self::SelectPackage(key) => format!("select_package_{}", key),
            Self::PayCard(key) => format!("pay_card_{}", key),
            Self::PayCrypto(key) => format!("pay_crypto_{}", key),
            Self::PayStars(key) => format!("pay_stars_{}", key),
            Self::Crypto { symbol, package } => format!("crypto_{}_{}", symbol, package),
            Self::Chain { symbol, chain, package } => format!("chain_{}:{}:{}", symbol, chain, package),
            Self::CheckPayment(order_id) => format!("check_payment_{}", order_id),
            Self::About => "about".to_string(),
            Self::Profile => "profile".to_string(),
            Self::ProfileHistory(0) => "profile_history".to_string(),
            Self::ProfileHistory(page) => format!("profile_history:{}", page),
            Self::Referral => "referral".to_string(),
            Self::RefUser => "ref_user".to_string(),
            Self::RefExpert => "ref_expert".to_string(),
            Self::ConfirmYes => "confirm_yes".to_string(),
            Self::ConfirmNo => "confirm_no".to_string(),
            Self::Unknown(data) => data.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_exact_identifiers() {
        assert_eq!(CallbackAction::parse("confirm_gen"), CallbackAction::ConfirmGeneration);
        assert_eq!(CallbackAction::parse("gender_female"), CallbackAction::Gender(Gender::Female));
        assert_eq!(CallbackAction::parse("profile_history"), CallbackAction::ProfileHistory(0));
    }

    #[test]
    fn test_parse_parameterized_identifiers() {
        assert_eq!(CallbackAction::parse("catalog_page_2"), CallbackAction::CatalogPage(2));
        assert_eq!(
            CallbackAction::parse("meme_birthday_dance"),
            CallbackAction::Meme("birthday_dance".to_string())
        );
        assert_eq!(CallbackAction::parse("pay_card_10"), CallbackAction::PayCard("10".to_string()));
        assert_eq!(
            CallbackAction::parse("crypto_USDT_pack"),
            CallbackAction::Crypto {
                symbol: "USDT".to_string(),
                package: "pack".to_string()
            }
        );
    }

    #[test]
    fn test_chain_payload_keeps_underscores_in_package() {
        let action = CallbackAction::Chain {
            symbol: "USDT".to_string(),
            chain: "TRC20".to_string(),
            package: "promo_TON".to_string(),
        };
        assert_eq!(action.to_data(), "chain_USDT:TRC20:promo_TON");
        assert_eq!(CallbackAction::parse(&action.to_data()), action);
    }

    #[test]
    fn test_malformed_data_is_unknown() {
        for data in ["", "catalog_page_x", "chain_USDT:TRC20", "crypto_USDT", "meme_", "something"] {
            assert_eq!(CallbackAction::parse(data), CallbackAction::Unknown(data.to_string()));
        }
    }

    #[test]
    fn test_payloads_fit_telegram_limit() {
        let order_id = uuid::Uuid::new_v4().simple().to_string();
        assert!(CallbackAction::CheckPayment(order_id).to_data().len() <= 64);
    }
}
