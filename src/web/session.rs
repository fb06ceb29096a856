use tower_sessions::Session;

use crate::constants::SUGGESTION_SESSION_KEY;
use crate::error::CampaignError;
use crate::pipeline::SuggestionState;

/// Loads the browser session's suggestion state, empty for a new session.
pub(crate) async fn load_state(session: &Session) -> Result<SuggestionState, CampaignError> {
    Ok(session
        .get::<SuggestionState>(SUGGESTION_SESSION_KEY)
        .await?
        .unwrap_or_default())
}

/// Writes the state back, skipping the store when nothing changed.
pub(crate) async fn save_state(
    session: &Session,
    before: &SuggestionState,
    after: &SuggestionState,
) -> Result<(), CampaignError> {
    if before == after {
        return Ok(());
    }
    session.insert(SUGGESTION_SESSION_KEY, after).await?;
    Ok(())
}
