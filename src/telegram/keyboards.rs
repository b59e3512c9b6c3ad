//! Inline and reply keyboards

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use url::Url;

use super::callback::CallbackAction;
use super::texts;
use crate::catalog::CatalogPage;
use crate::core::types::Gender;
use crate::payments::{find_crypto, Package, PACKAGES, SUPPORTED_CRYPTO};

fn button(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_data())
}

/// URL button, skipped when the link does not parse
fn link(text: impl Into<String>, url: &str) -> Option<InlineKeyboardButton> {
    match Url::parse(url) {
        Ok(url) => Some(InlineKeyboardButton::url(text, url)),
        Err(e) => {
            log::warn!("Skipping button with invalid URL '{}': {}", url, e);
            None
        }
    }
}

fn back_to_menu() -> Vec<InlineKeyboardButton> {
    vec![button("🏠 Главное меню", CallbackAction::MainMenu)]
}

/// One-time reply keyboard with the START button
pub fn start_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(texts::START_BUTTON)]])
        .resize_keyboard()
        .one_time_keyboard()
}

pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("🎬 Создать видео", CallbackAction::CreateVideo)],
        vec![button("✍️ Свой сценарий", CallbackAction::CustomPrompt)],
        vec![
            button("👤 Профиль", CallbackAction::Profile),
            button("💎 Купить", CallbackAction::Buy),
        ],
        vec![
            button("🤝 Рефералы", CallbackAction::Referral),
            button("ℹ️ О проекте", CallbackAction::About),
        ],
    ])
}

pub fn catalog(page: &CatalogPage<'_>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = page
        .items
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|meme| {
                    let label = if meme.is_available() {
                        meme.name.clone()
                    } else {
                        format!("{} ⏳", meme.name)
                    };
                    button(label, CallbackAction::Meme(meme.id.clone()))
                })
                .collect()
        })
        .collect();

    let mut nav = Vec::new();
    if page.has_prev() {
        nav.push(button("⬅️", CallbackAction::CatalogPage(page.page - 1)));
    }
    if page.total_pages > 1 {
        nav.push(button(
            format!("{}/{}", page.page + 1, page.total_pages),
            CallbackAction::CatalogPage(page.page),
        ));
    }
    if page.has_next() {
        nav.push(button("➡️", CallbackAction::CatalogPage(page.page + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}

pub fn gender() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("👨 Мужской", CallbackAction::Gender(Gender::Male)),
        button("👩 Женский", CallbackAction::Gender(Gender::Female)),
    ]])
}

pub fn confirm_generation() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("🚀 Запустить", CallbackAction::ConfirmGeneration)],
        vec![
            button("👨 Мужской", CallbackAction::Gender(Gender::Male)),
            button("👩 Женский", CallbackAction::Gender(Gender::Female)),
        ],
        vec![button("📚 Другой шаблон", CallbackAction::Catalog)],
    ])
}

pub fn custom_prompt_menu(has_quota: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![button("✍️ Написать сценарий", CallbackAction::StartCustomPrompt)]];
    if has_quota {
        rows.push(vec![button("🎁 Бесплатная генерация", CallbackAction::UseFreeGeneration)]);
    }
    rows.push(vec![
        button("📖 Как писать", CallbackAction::PromptGuide),
        button("📘 Подробно", CallbackAction::ShowFullGuide),
    ]);
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}

pub fn guide() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("✍️ Написать сценарий", CallbackAction::StartCustomPrompt)],
        back_to_menu(),
    ])
}

/// Shown under a delivered video
pub fn generation_result(generation_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::switch_inline_query(
            "📤 Поделиться",
            generation_id.to_string(),
        )],
        vec![button("🎬 Создать ещё", CallbackAction::CreateVideo)],
        back_to_menu(),
    ])
}

pub fn retry_generation() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("🔄 Попробовать снова", CallbackAction::CreateVideo)],
        back_to_menu(),
    ])
}

pub fn no_quota() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("💎 Купить генерации", CallbackAction::Buy)], back_to_menu()])
}

pub fn subscribe(channel_url: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(subscribe) = channel_url.and_then(|url| link(texts::SUBSCRIBE_BUTTON, url)) {
        rows.push(vec![subscribe]);
    }
    rows.push(vec![button(texts::SUBSCRIBE_CHECK_BUTTON, CallbackAction::CheckSubscription)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn packages() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = PACKAGES
        .iter()
        .map(|p| vec![button(texts::package_button(p), CallbackAction::SelectPackage(p.key.to_string()))])
        .collect();
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}

pub fn payment_methods(package: &Package) -> InlineKeyboardMarkup {
    let key = package.key.to_string();
    InlineKeyboardMarkup::new(vec![
        vec![button("💳 Картой", CallbackAction::PayCard(key.clone()))],
        vec![button("🪙 Криптой", CallbackAction::PayCrypto(key.clone()))],
        vec![button("⭐ Звёздами", CallbackAction::PayStars(key))],
        vec![button("⬅️ Пакеты", CallbackAction::Buy)],
    ])
}

pub fn crypto_assets(package_key: &str) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = SUPPORTED_CRYPTO
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|asset| {
                    button(
                        asset.symbol,
                        CallbackAction::Crypto {
                            symbol: asset.symbol.to_string(),
                            package: package_key.to_string(),
                        },
                    )
                })
                .collect()
        })
        .collect();
    rows.push(vec![button("⬅️ Назад", CallbackAction::SelectPackage(package_key.to_string()))]);
    InlineKeyboardMarkup::new(rows)
}

pub fn crypto_chains(symbol: &str, package_key: &str) -> InlineKeyboardMarkup {
    let chains = find_crypto(symbol).map(|asset| asset.chains).unwrap_or(&[]);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = chains
        .iter()
        .map(|chain| {
            vec![button(
                *chain,
                CallbackAction::Chain {
                    symbol: symbol.to_string(),
                    chain: chain.to_string(),
                    package: package_key.to_string(),
                },
            )]
        })
        .collect();
    rows.push(vec![button("⬅️ Назад", CallbackAction::PayCrypto(package_key.to_string()))]);
    InlineKeyboardMarkup::new(rows)
}

/// Pay link, legal links for card payments, and the status check
pub fn payment_link(payment_url: &str, order_id: &str, legal: &[(&str, &str)]) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(pay) = link("💳 Оплатить", payment_url) {
        rows.push(vec![pay]);
    }
    rows.push(vec![button(
        "🔄 Проверить оплату",
        CallbackAction::CheckPayment(order_id.to_string()),
    )]);
    for (title, url) in legal {
        if let Some(button) = link(*title, url) {
            rows.push(vec![button]);
        }
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn profile() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📜 История", CallbackAction::ProfileHistory(0))],
        vec![button("💎 Купить", CallbackAction::Buy)],
        back_to_menu(),
    ])
}

pub fn history(page: usize, total_pages: usize) -> InlineKeyboardMarkup {
    let mut nav = Vec::new();
    if page > 0 {
        nav.push(button("⬅️", CallbackAction::ProfileHistory(page - 1)));
    }
    if page + 1 < total_pages {
        nav.push(button("➡️", CallbackAction::ProfileHistory(page + 1)));
    }
    let mut rows = Vec::new();
    if !nav.is_empty() {
        rows.push(nav);
    }
    rows.push(vec![button("👤 Профиль", CallbackAction::Profile)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn referral() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("🔗 Ссылка для друзей", CallbackAction::RefUser)],
        vec![button("💼 Ссылка эксперта", CallbackAction::RefExpert)],
        back_to_menu(),
    ])
}

pub fn menu_only() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![back_to_menu()])
}

pub fn support(support_username: &str) -> InlineKeyboardMarkup {
    let url = format!("https://t.me/{}", support_username.trim_start_matches('@'));
    let mut rows = Vec::new();
    if let Some(support) = link("💬 Менеджер", &url) {
        rows.push(vec![support]);
    }
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}

/// Lead bot: yes/no under the proposed name
pub fn lead_confirm() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("Да", CallbackAction::ConfirmYes),
        button("Нет", CallbackAction::ConfirmNo),
    ]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_every_button_decodes() {
        let memes = Catalog::load().unwrap();
        let markups = [
            main_menu(),
            catalog(&memes.page(0, 6)),
            confirm_generation(),
            custom_prompt_menu(true),
            packages(),
            payment_methods(&PACKAGES[0]),
            crypto_assets("pack"),
            crypto_chains("USDT", "pack"),
            profile(),
            history(1, 3),
            referral(),
            lead_confirm(),
        ];
        for markup in markups.iter() {
            for data in callback_data(markup) {
                assert!(
                    !matches!(CallbackAction::parse(&data), CallbackAction::Unknown(_)),
                    "undecodable button {}",
                    data
                );
            }
        }
    }

    #[test]
    fn test_invalid_payment_url_keeps_check_button() {
        let markup = payment_link("not a url", "order1", &[]);
        assert_eq!(callback_data(&markup), vec!["check_payment_order1".to_string()]);
    }
}
