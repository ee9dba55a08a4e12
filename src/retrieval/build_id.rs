//! Build identifier lookup

use crate::{
    BucklerClient, Error, Result,
    session::{CallContext, extract_build_id, redirect::resolve_url},
};

impl BucklerClient {
    /// Current build identifier, from the cache or scraped from a portal page.
    ///
    /// With an empty `sid` the top page is used, otherwise that player's
    /// battlelog page. A page without the identifier is given one chance: if
    /// it carries a `Location`, that target is fetched and searched too.
    pub async fn fetch_build_id(&self, ctx: &CallContext, sid: &str) -> Result<String> {
        if let Some(build_id) = self.build_ids.read().await.get() {
            return Ok(build_id);
        }

        let session = self.session();
        let lang = self.settings().lang();
        let page = if sid.is_empty() {
            session.portal_url(lang)
        } else {
            session.portal_url(&format!("{}/profile/{}/battlelog", lang, sid))
        };

        let response = session.get(ctx, &page).await?;
        let mut found = extract_build_id(&response.body);
        if found.is_none()
            && let Some(location) = response.location.as_deref()
        {
            let next = resolve_url(&response.url, location)?;
            tracing::debug!("No build id on {}, trying {}", page, next);
            found = extract_build_id(&session.get(ctx, next.as_str()).await?.body);
        }

        let build_id = found.ok_or_else(|| Error::build_id_not_found(&page))?;
        self.build_ids.write().await.set(build_id.clone());
        session.report("build_id", build_id.clone());
        Ok(build_id)
    }

    /// Forget the cached build identifier
    pub async fn invalidate_build_id(&self) {
        self.build_ids.write().await.invalidate();
    }
}
