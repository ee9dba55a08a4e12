//! Battlelog pages

use crate::{
    BucklerClient, Error, Result,
    session::CallContext,
    types::{BattlelogPage, BattlelogResponse},
};

/// Data path of one custom-room battlelog page, relative to the portal base
pub fn battlelog_path(build_id: &str, lang: &str, sid: &str, page: u32) -> String {
    format!(
        "_next/data/{build_id}/{lang}/profile/{sid}/battlelog/custom.json?sid={sid}&page={page}"
    )
}

fn is_stale(status: u16) -> bool {
    matches!(status, 404 | 410)
}

impl BucklerClient {
    /// Fetch one page of a player's custom-room battlelog.
    ///
    /// Pages below 1 are read as page 1. A 404 or 410 means the build
    /// identifier went stale: it is re-scraped and the request is retried
    /// exactly once.
    pub async fn fetch_match_page(
        &self,
        ctx: &CallContext,
        sid: &str,
        page: i64,
    ) -> Result<BattlelogPage> {
        let sid = sid.trim();
        if sid.is_empty() {
            return Err(Error::invalid_input("sid required"));
        }
        let page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);

        self.ensure_login(ctx).await?;

        let session = self.session();
        let lang = self.settings().lang();
        let build_id = self.fetch_build_id(ctx, sid).await?;
        let mut url = session.portal_url(&battlelog_path(&build_id, lang, sid, page));
        let mut response = session.get(ctx, &url).await?;

        if is_stale(response.status.as_u16()) {
            session.report(
                "build_id_stale",
                format!("{} returned {}", url, response.status.as_u16()),
            );
            self.invalidate_build_id().await;
            let build_id = self.fetch_build_id(ctx, sid).await?;
            url = session.portal_url(&battlelog_path(&build_id, lang, sid, page));
            response = session.get(ctx, &url).await?;
        }

        if !response.is_success() {
            return Err(Error::upstream_status(response.status.as_u16(), url));
        }
        let battlelog: BattlelogResponse = response.json("battlelog")?;
        tracing::debug!(
            "Battlelog {} page {}/{}: {} matches",
            sid,
            battlelog.page_props.current_page,
            battlelog.page_props.total_page,
            battlelog.page_props.replay_list.len()
        );
        Ok(battlelog.page_props)
    }
}
