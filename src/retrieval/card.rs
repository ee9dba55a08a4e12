//! Profile card

use crate::{BucklerClient, Error, Result, session::CallContext, types::ProfileCard};

impl BucklerClient {
    /// Fetch a player's profile card. Any status other than 200 is an error.
    pub async fn fetch_profile_card(&self, ctx: &CallContext, sid: &str) -> Result<ProfileCard> {
        let sid = sid.trim();
        if sid.is_empty() {
            return Err(Error::invalid_input("sid required"));
        }

        self.ensure_login(ctx).await?;

        let session = self.session();
        let url = session.portal_url(&format!("api/{}/card/{}", self.settings().lang(), sid));
        let response = session.get(ctx, &url).await?;
        if response.status != reqwest::StatusCode::OK {
            return Err(Error::upstream_status(response.status.as_u16(), url));
        }
        response.json("profile card")
    }
}
