//! User-facing texts (plain text, no parse mode)

use crate::core::config;
use crate::core::types::Gender;
use crate::core::utils::pluralize_generations;
use crate::core::validation::{ValidationError, CUSTOM_PROMPT_MAX_CHARS, FREE_PROMPT_MAX_CHARS, NAME_MAX_CHARS};
use crate::payments::{Package, StartedPayment};
use crate::storage::db::User;
use crate::storage::generations::Generation;
use crate::storage::leads::{DateCount, Lead};

pub const WELCOME: &str = "👋 Привет! Я MeeMee — делаю смешные персональные видео-мемы.\n\n\
Выбери шаблон, напиши имя, и через пару минут получишь ролик, которым не стыдно поделиться.\n\n\
Нажми START, чтобы начать.";

pub const START_BUTTON: &str = "START";

pub const MAIN_MENU: &str = "🎬 Главное меню\n\nЧто будем делать?";

pub const CATALOG_HEADER: &str = "📚 Каталог мемов\n\nВыбери шаблон:";

pub const ASK_GENDER: &str = "Кто герой видео?";

pub const EXPECTING_BUTTON: &str = "👆 Выбери вариант кнопкой выше.";

pub const IDLE_HINT: &str = "Не совсем понял 🤔 Открой меню, чтобы создать видео.";

pub const NO_QUOTA: &str = "😔 Генерации закончились.\n\nКупи пакет, чтобы создать ещё видео.";

pub const MEME_SOON: &str = "⏳ Этот шаблон скоро появится!";

pub const MEME_NOT_FOUND: &str = "Шаблон не найден. Открой каталог ещё раз.";

pub const MISSING_DATA: &str = "Данные для генерации потерялись. Выбери шаблон заново.";

pub const CREATION_FAILED: &str = "❌ Не удалось запустить генерацию. Генерация возвращена на баланс, попробуй ещё раз.";

pub const GENERATION_STARTED: &str = "🎬 Генерация запущена! Обычно это занимает 1–2 минуты. Пришлю видео, как только оно будет готово.";

pub const GENERATION_FAILED: &str = "😔 Не получилось создать видео. Генерация возвращена на баланс.";

pub const STILL_PROCESSING: &str = "⏳ Видео ещё готовится. Пришлю его автоматически, как только оно будет готово.";

pub const CUSTOM_PROMPT_MENU: &str = "✍️ Свой сценарий\n\n\
Опиши видео своими словами: кто в кадре, что происходит, какое настроение. \
Чем подробнее, тем лучше результат.";

pub const PROMPT_GUIDE: &str = "📖 Как написать хороший промпт\n\n\
1. Герой: кто в кадре и как выглядит.\n\
2. Действие: что он делает.\n\
3. Место: где всё происходит.\n\
4. Стиль: мультфильм, кино, новости, клип.\n\n\
Пример: «Кот в костюме ведущего читает срочные новости о том, что Маша лучшая подруга».";

pub const FULL_GUIDE: &str = "📖 Полная инструкция\n\n\
• Пиши по-русски или по-английски, как удобнее.\n\
• Не используй грубые слова: такие запросы отклоняются.\n\
• Длина: от 10 символов.\n\
• Имена пиши так, как их нужно произнести.\n\
• Если результат не понравился, попробуй переформулировать сценарий.";

pub fn ask_custom_prompt() -> String {
    format!(
        "✍️ Напиши сценарий одним сообщением (10–{} символов).",
        CUSTOM_PROMPT_MAX_CHARS
    )
}

pub fn ask_free_prompt() -> String {
    format!(
        "🎁 Бесплатная генерация!\n\nОпиши видео одним сообщением (10–{} символов).",
        FREE_PROMPT_MAX_CHARS
    )
}

pub const PROMPT_ACCEPTED: &str = "✅ Сценарий принят! Видео придёт сюда, как только будет готово.";

pub fn meme_selected(meme_name: &str) -> String {
    format!(
        "Отличный выбор: {}\n\n✏️ Напиши имя, которое прозвучит в видео (2–{} символов).",
        meme_name, NAME_MAX_CHARS
    )
}

pub fn confirm_generation(meme_name: &str, name: &str, gender: Gender) -> String {
    format!(
        "Проверь данные:\n\n🎬 Шаблон: {}\n✏️ Имя: {}\n👤 Пол: {}\n\nЗапускаем?",
        meme_name,
        name,
        gender.display_name()
    )
}

pub fn validation_error(error: &ValidationError) -> String {
    match error {
        ValidationError::TooShort { min, .. } => format!("Слишком коротко: нужно хотя бы {} символа.", min),
        ValidationError::TooLong { max, .. } => format!("Слишком длинно: максимум {} символов.", max),
        ValidationError::BlockedTerm => "🚫 Текст содержит недопустимые слова. Попробуй иначе.".to_string(),
        ValidationError::InvalidEmail(_) => EMAIL_INVALID.to_string(),
    }
}

pub fn video_caption(generation: &Generation) -> String {
    format!("🎉 Готово! {}\n\nПоделись видео с друзьями 👇", generation.title())
}

pub fn video_link_fallback(generation: &Generation, url: &str) -> String {
    format!("🎉 Готово! {}\n\nСмотреть видео: {}", generation.title(), url)
}

pub const INLINE_CREATE_BUTTON: &str = "🎬 Создать своё видео";

pub fn incident(incident_id: &str) -> String {
    format!(
        "❌ Произошла ошибка номер {}. Обратитесь к менеджеру @{}",
        incident_id,
        config::SUPPORT_USERNAME.as_str()
    )
}

pub const IN_DEVELOPMENT: &str = "🛠 Функция в разработке";

pub fn subscribe_required(channel: &str) -> String {
    format!(
        "📢 Чтобы пользоваться ботом, подпишись на канал {}.\n\nПосле подписки нажми «Проверить подписку».",
        channel
    )
}

pub const SUBSCRIBE_BUTTON: &str = "📢 Подписаться";

pub const SUBSCRIBE_CHECK_BUTTON: &str = "✅ Проверить подписку";

pub const SUBSCRIBE_OK: &str = "✅ Подписка подтверждена!";

pub const SUBSCRIBE_FAIL: &str = "Подписка не найдена. Подпишись и нажми кнопку ещё раз.";

// Payments

pub fn packages_screen(quota: i64) -> String {
    format!(
        "💎 Пакеты генераций\n\nСейчас на балансе: {} {}.\n\nВыбери пакет:",
        quota,
        pluralize_generations(quota)
    )
}

pub fn package_button(package: &Package) -> String {
    format!("{} — {} ₽", package.title, package.rub)
}

pub fn payment_methods(package: &Package) -> String {
    format!(
        "Пакет «{}»: {} {}\n\n💳 Карта: {} ₽\n🪙 Крипта: ${}\n⭐ Stars: {}\n\nВыбери способ оплаты:",
        package.title,
        package.generations,
        pluralize_generations(package.generations),
        package.rub,
        package.usd,
        package.stars
    )
}

pub const ASK_EMAIL: &str = "📧 Введи e-mail для чека об оплате:";

pub const EMAIL_INVALID: &str = "Похоже, это не e-mail. Введи адрес в формате name@example.com";

pub const PAYMENT_FAILED: &str = "❌ Не удалось создать платёж. Попробуй позже или напиши менеджеру.";

pub const STARS_SOON: &str = "⭐ Оплата звёздами скоро появится!";

pub const CHOOSE_CRYPTO: &str = "🪙 Выбери криптовалюту:";

pub fn choose_chain(symbol: &str) -> String {
    format!("Выбери сеть для {}:", symbol)
}

pub fn card_payment_created(payment: &StartedPayment) -> String {
    format!(
        "💳 Счёт создан\n\nПакет: {}\nСумма: {} ₽\n\nНажми «Оплатить», а после оплаты «Проверить оплату».",
        payment.package.title, payment.amount
    )
}

pub fn crypto_invoice_created(payment: &StartedPayment, chain: &str) -> String {
    format!(
        "🪙 Счёт создан\n\nПакет: {}\nСумма: ${} в {} ({})\n\nНажми «Оплатить», а после оплаты «Проверить оплату».",
        payment.package.title, payment.amount, payment.currency, chain
    )
}

pub const PAYMENT_PENDING: &str = "⏳ Оплата ещё не поступила";

pub const PAYMENT_NOT_FOUND: &str = "Заказ не найден";

pub const PAYMENT_DECLINED: &str = "❌ Оплата не прошла. Попробуй ещё раз.";

pub fn payment_credited(generations: i64) -> String {
    format!(
        "✅ Оплата получена! Начислено {} {}.",
        generations,
        pluralize_generations(generations)
    )
}

pub const PAYMENT_ALREADY_CREDITED: &str = "✅ Этот заказ уже оплачен и зачислен.";

// Profile and referral

pub fn profile(user: &User) -> String {
    let mut text = format!(
        "👤 Профиль\n\n{}\nID: {}\n\n💎 Баланс: {} {}\n✅ Успешных видео: {}\n❌ Неудачных: {}",
        user.display_name(),
        user.telegram_id,
        user.quota,
        pluralize_generations(user.quota),
        user.successful_generations,
        user.failed_generations
    );
    if user.expert_balance > 0 {
        text.push_str(&format!("\n💰 Баланс эксперта: {} ₽", user.expert_balance));
    }
    text
}

pub fn history_header(total: i64, page: usize, total_pages: usize) -> String {
    if total == 0 {
        return "📜 История пуста. Самое время создать первое видео!".to_string();
    }
    format!("📜 История генераций ({}), страница {}/{}", total, page + 1, total_pages)
}

pub fn history_line(generation: &Generation) -> String {
    format!(
        "{} {} · {}",
        generation.status.emoji(),
        generation.title(),
        generation.created_at
    )
}

pub const ABOUT: &str = "ℹ️ О проекте\n\n\
MeeMee превращает имя друга в смешное видео за пару минут. \
Выбирай шаблон из каталога или пиши свой сценарий.";

pub fn referral_menu(bonus: i64) -> String {
    format!(
        "🤝 Реферальная программа\n\nПриглашай друзей: ты и друг получите по {} {}.\n\
Эксперты получают процент с покупок своих клиентов.",
        bonus,
        pluralize_generations(bonus)
    )
}

pub fn referral_link(link: &str, invited: i64) -> String {
    format!(
        "🔗 Твоя ссылка для друзей:\n{}\n\nПриглашено: {}",
        link, invited
    )
}

pub fn expert_link(link: &str, clients: i64, balance: i64) -> String {
    format!(
        "💼 Ссылка эксперта:\n{}\n\nКлиентов: {}\nЗаработано: {} ₽ ({}% с каждой покупки)",
        link,
        clients,
        balance,
        *config::referral::EXPERT_CASHBACK_PERCENT
    )
}

pub fn referral_bonus_received(bonus: i64) -> String {
    format!(
        "🎁 Ты пришёл по приглашению! Начислено {} {}.",
        bonus,
        pluralize_generations(bonus)
    )
}

pub fn referral_bonus_for_inviter(bonus: i64) -> String {
    format!(
        "🎉 По твоей ссылке пришёл друг! Начислено {} {}.",
        bonus,
        pluralize_generations(bonus)
    )
}

pub const EXPERT_LINKED: &str = "💼 Ты подключён к эксперту. Приятного творчества!";

pub const EXPERT_NEW_CLIENT: &str = "💼 У тебя новый клиент!";

// Lead bot

pub const LEAD_WELCOME: &str = "👋 Привет! Напиши имя, которое прозвучит в твоём персональном видео.";

pub fn lead_confirm_name(name: &str) -> String {
    format!("Имя для видео: {}\n\nВсё верно?", name)
}

pub const LEAD_RETYPE: &str = "Напишите имя ещё раз.";

pub const LEAD_ACCEPTED: &str = "✅ Имя принято! Скоро пришлём видео.";

pub const LEAD_ALREADY_USED: &str = "Вы уже использовали свою попытку.";

pub const LEAD_NO_PENDING: &str = "Пожалуйста, напишите своё имя ещё раз.";

pub const LEAD_ERROR: &str = "❌ Что-то пошло не так. Попробуй ещё раз позже.";

// Admin bot

pub const ADMIN_DENIED: &str = "⛔ Доступ только для администраторов.";

pub const ADMIN_HELP: &str = "Команды:\n\
/stats — заявки по дням\n\
/today — заявки за сегодня\n\
/export [ГГГГ-ММ-ДД] — CSV за дату или за всё время";

pub const ADMIN_BAD_DATE: &str = "Дата должна быть в формате ГГГГ-ММ-ДД.";

pub fn admin_stats(days: &[DateCount]) -> String {
    if days.is_empty() {
        return "📊 Заявок пока нет.".to_string();
    }
    let total: i64 = days.iter().map(|d| d.count).sum();
    let mut text = format!("📊 Всего заявок: {}\n", total);
    for day in days {
        text.push_str(&format!("\n{}: {}", day.date, day.count));
    }
    text
}

pub fn admin_today(date: &str, leads: &[Lead]) -> String {
    let mut text = format!("📅 {}: {} заяв.", date, leads.len());
    for lead in leads {
        text.push_str(&format!(
            "\n{} — {} ({})",
            lead.username, lead.video_generate_name, lead.utm_source
        ));
    }
    text
}

pub fn admin_export_empty(date: Option<&str>) -> String {
    match date {
        Some(date) => format!("За {} заявок нет.", date),
        None => "Заявок пока нет.".to_string(),
    }
}

pub fn admin_export_caption(count: usize, date: Option<&str>) -> String {
    format!("📎 {} заяв. ({})", count, date.unwrap_or("всё время"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_text_mentions_id_and_support() {
        let text = incident("AB12CD34");
        assert!(text.contains("AB12CD34"));
        assert!(text.contains('@'));
    }

    #[test]
    fn test_validation_error_texts_hide_details() {
        let text = validation_error(&ValidationError::InvalidEmail("a@b".to_string()));
        assert!(!text.contains("a@b"));
        assert!(validation_error(&ValidationError::TooLong { max: 30, actual: 31 }).contains("30"));
    }

    #[test]
    fn test_admin_stats_sums_days() {
        let days = vec![
            DateCount {
                date: "2024-05-01".to_string(),
                count: 3,
            },
            DateCount {
                date: "2024-05-02".to_string(),
                count: 2,
            },
        ];
        let text = admin_stats(&days);
        assert!(text.contains("Всего заявок: 5"));
        assert!(text.contains("2024-05-02: 2"));
        assert_eq!(admin_stats(&[]), "📊 Заявок пока нет.");
    }
}
