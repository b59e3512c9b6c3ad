//! Inline sharing of finished videos

use teloxide::prelude::*;
use teloxide::types::{
    FileId, InlineQueryResult, InlineQueryResultCachedVideo, InlineQueryResultVideo, InlineQueryResultsButton,
    InlineQueryResultsButtonKind,
};
use url::Url;

use super::types::{HandlerDeps, HandlerError};
use crate::storage::generations::{self, Generation};
use crate::storage::get_connection;
use crate::telegram::texts;

/// Answers an inline query with the user's video.
///
/// The query text may carry a generation id; otherwise the latest finished
/// video is offered. Without any video the user gets a button to create one.
pub(super) async fn handle_inline_query(bot: &Bot, q: &InlineQuery, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Ok(user_id) = i64::try_from(q.from.id.0) else {
        return Ok(());
    };
    let requested = q.query.trim();
    let generation = {
        let conn = get_connection(&deps.db_pool)?;
        generations::find_shareable(&conn, user_id, Some(requested))?
    };

    let results: Vec<InlineQueryResult> = generation
        .as_ref()
        .and_then(|g| share_result(deps, g))
        .into_iter()
        .collect();
    log::debug!(
        "Inline query {:?} from {}: {} result(s)",
        requested,
        user_id,
        results.len()
    );

    let empty = results.is_empty();
    let mut req = bot
        .answer_inline_query(q.id.clone(), results)
        .cache_time(0)
        .is_personal(true);
    if empty {
        req = req.button(InlineQueryResultsButton {
            text: texts::INLINE_CREATE_BUTTON.to_string(),
            kind: InlineQueryResultsButtonKind::StartParameter("create".to_string()),
        });
    }
    req.await?;
    Ok(())
}

/// `video/mp4`; the mime crate ships no constant for it
fn mp4_mime() -> Option<mime::Mime> {
    match "video/mp4".parse() {
        Ok(mime) => Some(mime),
        Err(e) => {
            log::error!("Invalid video mime type: {}", e);
            None
        }
    }
}

fn share_result(deps: &HandlerDeps, generation: &Generation) -> Option<InlineQueryResult> {
    let title = generation.title().to_string();

    if let Some(file_id) = generation.telegram_file_id.as_deref() {
        let mut result = InlineQueryResultCachedVideo::new(generation.id.clone(), FileId(file_id.to_string()), title);
        result.caption = Some(texts::video_caption(generation));
        return Some(InlineQueryResult::CachedVideo(result));
    }

    let video_url = generation.video_url.as_deref().and_then(|u| Url::parse(u).ok())?;
    let thumb_url = generation
        .meme_id
        .as_deref()
        .and_then(|id| deps.engine.catalog().get(id))
        .and_then(|meme| meme.preview_url.as_deref())
        .and_then(|u| Url::parse(u).ok())
        .unwrap_or_else(|| video_url.clone());

    let mut result = InlineQueryResultVideo::new(generation.id.clone(), video_url, mp4_mime()?, thumb_url, title);
    result.caption = Some(texts::video_caption(generation));
    Some(InlineQueryResult::Video(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mp4_mime() {
        let mime = mp4_mime().unwrap();
        assert_eq!(mime.essence_str(), "video/mp4");
    }
}
